use chrono::{DateTime, Utc};
use clustermon_core::{ClusterConfig, ClusterModel, Node};
use serde::Serialize;

/// Read-only view of the reconciled cluster state handed to renderers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    pub model: ClusterModel,
    pub configuration: Option<ClusterConfig>,
    /// Node this client is connected to, matched by address across passes
    pub current_node: Option<Node>,
    pub current_leader: Option<Node>,
    pub leader_changed: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ClusterSnapshot {
    pub fn leader(&self) -> Option<&Node> {
        self.model.leader()
    }

    pub fn is_current_node_leader(&self) -> bool {
        self.current_node.as_ref().is_some_and(Node::is_leader)
    }
}

/// Render hook invoked once at the end of every reconciliation pass.
pub trait Redraw: Send + Sync {
    fn redraw(&self, snapshot: &ClusterSnapshot);
}

impl<T> Redraw for T
where
    T: Fn(&ClusterSnapshot) + Send + Sync,
{
    fn redraw(&self, snapshot: &ClusterSnapshot) {
        self(snapshot)
    }
}
