#![allow(dead_code)]

use async_trait::async_trait;
use clustermon_core::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
pub struct Calls {
    pub node: AtomicUsize,
    pub config: AtomicUsize,
    pub status: AtomicUsize,
    pub locations: AtomicUsize,
    pub deletes: AtomicUsize,
    pub mutations: AtomicUsize,
}

impl Calls {
    pub fn node(&self) -> usize {
        self.node.load(Ordering::SeqCst)
    }
    pub fn config(&self) -> usize {
        self.config.load(Ordering::SeqCst)
    }
    pub fn status(&self) -> usize {
        self.status.load(Ordering::SeqCst)
    }
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

/// In-memory cluster whose responses are swapped between passes.
pub struct FakeCluster {
    node: Mutex<Result<Node>>,
    config: Mutex<Result<ClusterConfig>>,
    status: Mutex<Result<Vec<Node>>>,
    locations: Mutex<Result<Vec<Location>>>,
    outcomes: Mutex<Result<NodeOutcomes>>,
    status_gate: Mutex<Option<Arc<Notify>>>,
    pub calls: Calls,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            node: Mutex::new(Err(not_found())),
            config: Mutex::new(Err(not_found())),
            status: Mutex::new(Err(not_found())),
            locations: Mutex::new(Ok(Vec::new())),
            outcomes: Mutex::new(Ok(NodeOutcomes::new())),
            status_gate: Mutex::new(None),
            calls: Calls::default(),
        })
    }

    /// Three members with `n1` leading; `n2` in sync, `n3` unreachable.
    pub fn three_nodes() -> Arc<Self> {
        let cluster = Self::new();
        cluster.set_status(Ok(vec![
            Node::new("n1", NodeState::Leader)
                .with_peer("n2", LinkState::InSync)
                .with_peer("n3", LinkState::NoConnection)
                .with_endpoint("http://n1:7200"),
            Node::new("n2", NodeState::Follower).with_endpoint("http://n2:7200"),
            Node::new("n3", NodeState::Follower).with_endpoint("http://n3:7200"),
        ]));
        cluster.set_node(Ok(Node::new("n2", NodeState::Follower).with_endpoint("http://n2:7200")));
        cluster.set_config(Ok(ClusterConfig::with_nodes(vec![
            "n1".into(),
            "n2".into(),
            "n3".into(),
        ])));
        cluster
    }

    pub fn set_node(&self, response: Result<Node>) {
        *self.node.lock() = response;
    }

    pub fn set_config(&self, response: Result<ClusterConfig>) {
        *self.config.lock() = response;
    }

    pub fn set_status(&self, response: Result<Vec<Node>>) {
        *self.status.lock() = response;
    }

    pub fn set_locations(&self, response: Result<Vec<Location>>) {
        *self.locations.lock() = response;
    }

    pub fn set_outcomes(&self, response: Result<NodeOutcomes>) {
        *self.outcomes.lock() = response;
    }

    /// Makes every cluster status fetch wait until the returned gate is notified.
    pub fn hold_status(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.status_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn release_status(&self) {
        if let Some(gate) = self.status_gate.lock().take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }
}

pub fn not_found() -> ClusterError {
    ClusterError::NotFound { payload: None }
}

pub fn transport(message: &str) -> ClusterError {
    ClusterError::Transport(message.to_string())
}

#[async_trait]
impl StatusFetcher for FakeCluster {
    async fn fetch_node_status(&self) -> Result<Node> {
        self.calls.node.fetch_add(1, Ordering::SeqCst);
        self.node.lock().clone()
    }

    async fn fetch_cluster_config(&self) -> Result<ClusterConfig> {
        self.calls.config.fetch_add(1, Ordering::SeqCst);
        self.config.lock().clone()
    }

    async fn fetch_cluster_status(&self) -> Result<Vec<Node>> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        let gate = self.status_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.status.lock().clone()
    }

    async fn fetch_locations(&self) -> Result<Vec<Location>> {
        self.calls.locations.fetch_add(1, Ordering::SeqCst);
        self.locations.lock().clone()
    }
}

#[async_trait]
impl ClusterAdmin for FakeCluster {
    async fn create_cluster(&self, config: &ClusterConfig) -> Result<ClusterConfig> {
        self.calls.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(config.clone())
    }

    async fn update_cluster_config(&self, _patch: &ClusterConfigPatch) -> Result<ClusterConfig> {
        self.calls.mutations.fetch_add(1, Ordering::SeqCst);
        self.config.lock().clone()
    }

    async fn delete_cluster(&self, _force: bool) -> Result<NodeOutcomes> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        self.outcomes.lock().clone()
    }

    async fn add_nodes(&self, _nodes: &[String]) -> Result<NodeOutcomes> {
        self.calls.mutations.fetch_add(1, Ordering::SeqCst);
        self.outcomes.lock().clone()
    }

    async fn remove_nodes(&self, _nodes: &[String]) -> Result<NodeOutcomes> {
        self.calls.mutations.fetch_add(1, Ordering::SeqCst);
        self.outcomes.lock().clone()
    }

    async fn replace_nodes(&self, _add: &[String], _remove: &[String]) -> Result<NodeOutcomes> {
        self.calls.mutations.fetch_add(1, Ordering::SeqCst);
        self.outcomes.lock().clone()
    }
}
