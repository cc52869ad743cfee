use clustermon_core::Node;

/// Whether the reported leader differs from the one cached by the previous pass.
///
/// A result without a leader always counts as a change, even when the previous
/// pass had none either: while an election runs the connected node's own
/// status is re-fetched on every pass.
pub fn is_leader_changed(current: Option<&Node>, new_leader: Option<&Node>) -> bool {
    match (current, new_leader) {
        (_, None) => true,
        (None, Some(_)) => true,
        (Some(current), Some(new_leader)) => current.address != new_leader.address,
    }
}
