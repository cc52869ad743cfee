use tokio::sync::mpsc;

/// Signals raised outside the reconciler that should drive a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterEvent {
    /// Cluster changed (node added/removed/replaced, configuration edited).
    Updated { force: bool },
    /// Delete the cluster, then refresh.
    Deleted { force: bool },
}

/// Typed sender half handed to whoever raises cluster events.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ClusterEvent>,
}

pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<ClusterEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

impl EventSender {
    /// Returns false once the receiving poller has stopped.
    pub fn send(&self, event: ClusterEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn request_update(&self, force: bool) -> bool {
        self.send(ClusterEvent::Updated { force })
    }

    pub fn request_delete(&self, force: bool) -> bool {
        self.send(ClusterEvent::Deleted { force })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
