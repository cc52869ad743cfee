use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raft role of a node as reported by the cluster endpoints.
///
/// Unknown wire values are preserved in `Other` so newer servers do not break
/// status decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeState {
    Leader,
    Follower,
    Candidate,
    OutOfSync,
    NoConnection,
    ReadOnly,
    Restricted,
    NoCluster,
    Other(String),
}

impl NodeState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Leader => "LEADER",
            Self::Follower => "FOLLOWER",
            Self::Candidate => "CANDIDATE",
            Self::OutOfSync => "OUT_OF_SYNC",
            Self::NoConnection => "NO_CONNECTION",
            Self::ReadOnly => "READ_ONLY",
            Self::Restricted => "RESTRICTED",
            Self::NoCluster => "NO_CLUSTER",
            Self::Other(raw) => raw,
        }
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::NoCluster
    }
}

impl From<String> for NodeState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "LEADER" => Self::Leader,
            "FOLLOWER" => Self::Follower,
            "CANDIDATE" => Self::Candidate,
            "OUT_OF_SYNC" => Self::OutOfSync,
            "NO_CONNECTION" => Self::NoConnection,
            "READ_ONLY" => Self::ReadOnly,
            "RESTRICTED" => Self::Restricted,
            "NO_CLUSTER" => Self::NoCluster,
            _ => Self::Other(raw),
        }
    }
}

impl From<NodeState> for String {
    fn from(state: NodeState) -> Self {
        match state {
            NodeState::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replication connectivity from the leader to one peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkState {
    InSync,
    Syncing,
    OutOfSync,
    NoConnection,
    Other(String),
}

impl LinkState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InSync => "IN_SYNC",
            Self::Syncing => "SYNCING",
            Self::OutOfSync => "OUT_OF_SYNC",
            Self::NoConnection => "NO_CONNECTION",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::NoConnection)
    }
}

impl From<String> for LinkState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "IN_SYNC" => Self::InSync,
            "SYNCING" => Self::Syncing,
            "OUT_OF_SYNC" => Self::OutOfSync,
            "NO_CONNECTION" => Self::NoConnection,
            _ => Self::Other(raw),
        }
    }
}

impl From<LinkState> for String {
    fn from(state: LinkState) -> Self {
        match state {
            LinkState::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub affected_nodes: Vec<String>,
}

/// Status descriptor of one cluster member. `address` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub node_state: NodeState,
    #[serde(default)]
    pub term: u64,
    #[serde(default)]
    pub sync_status: BTreeMap<String, LinkState>,
    #[serde(default)]
    pub last_log_term: u64,
    #[serde(default)]
    pub last_log_index: u64,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_status: Option<RecoveryStatus>,
}

impl Node {
    pub fn new(address: impl Into<String>, node_state: NodeState) -> Self {
        Self {
            address: address.into(),
            node_state,
            ..Default::default()
        }
    }

    pub fn with_peer(mut self, peer: impl Into<String>, state: LinkState) -> Self {
        self.sync_status.insert(peer.into(), state);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_leader(&self) -> bool {
        self.node_state == NodeState::Leader
    }

    /// Links to every peer this node reports as connected.
    pub fn links(&self) -> Vec<Link> {
        self.sync_status
            .iter()
            .filter(|(_, state)| state.is_connected())
            .map(|(peer, state)| Link::new(&self.address, peer, state.clone()))
            .collect()
    }
}

/// Directed replication edge from the leader to a follower. Derived only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub source: String,
    pub target: String,
    pub status: LinkState,
}

impl Link {
    pub fn new(source: &str, target: &str, status: LinkState) -> Self {
        Self {
            id: format!("{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
            status,
        }
    }
}

/// A remote location attached to the workbench. The local one mirrors the
/// node this console is connected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub endpoint: String,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_address: Option<String>,
}

/// Copies the current node's endpoint and RPC address onto the local location.
pub fn patch_local_location(locations: &mut [Location], node: &Node) {
    if let Some(local) = locations.iter_mut().find(|location| location.is_local) {
        local.endpoint = node.endpoint.clone();
        local.rpc_address = Some(node.address.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    pub election_min_timeout: u64,
    pub election_range_timeout: u64,
    pub heartbeat_interval: u64,
    #[serde(rename = "messageSizeKB")]
    pub message_size_kb: u64,
    pub verification_timeout: u64,
    #[serde(rename = "transactionLogMaximumSizeGB")]
    pub transaction_log_maximum_size_gb: f64,
    pub nodes: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            election_min_timeout: 8000,
            election_range_timeout: 6000,
            heartbeat_interval: 2000,
            message_size_kb: 64,
            verification_timeout: 1500,
            transaction_log_maximum_size_gb: 50.0,
            nodes: Vec::new(),
        }
    }
}

impl ClusterConfig {
    pub fn with_nodes(nodes: Vec<String>) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }
}

/// Partial update of the cluster properties. Membership changes go through
/// the node add/remove/replace operations instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_min_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_range_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<u64>,
    #[serde(rename = "messageSizeKB", skip_serializing_if = "Option::is_none")]
    pub message_size_kb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_timeout: Option<u64>,
    #[serde(
        rename = "transactionLogMaximumSizeGB",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_log_maximum_size_gb: Option<f64>,
}

impl ClusterConfigPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// View model of the topology page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterModel {
    pub has_cluster: bool,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub locations: Vec<Location>,
}

impl ClusterModel {
    pub fn leader(&self) -> Option<&Node> {
        self.nodes.iter().find(|node| node.is_leader())
    }

    /// Replaces nodes wholesale and rebuilds links from the new leader only.
    pub fn apply_status(&mut self, nodes: Vec<Node>) {
        self.links = nodes
            .iter()
            .find(|node| node.is_leader())
            .map(Node::links)
            .unwrap_or_default();
        self.nodes = nodes;
        self.has_cluster = true;
    }

    /// The "no cluster" steady state. Locations are left alone.
    pub fn clear(&mut self) {
        self.has_cluster = false;
        self.nodes.clear();
        self.links.clear();
    }

    pub fn node(&self, address: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.address == address)
    }
}
