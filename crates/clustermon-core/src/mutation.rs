use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Per-node result messages returned by multi-node mutations, keyed by address.
pub type NodeOutcomes = BTreeMap<String, String>;

pub const NODE_ADDED_MESSAGE: &str = "Node was successfully added in the cluster.";
pub const NODE_REMOVED_MESSAGE: &str = "Node was successfully removed from the cluster.";
pub const DELETED_ON_NODE_MESSAGE: &str = "Cluster was deleted on this node.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    AddNodes,
    RemoveNodes,
    ReplaceNodes,
    DeleteCluster,
}

impl MutationKind {
    /// Messages a node reports when its part of the mutation went through.
    pub fn accepted_messages(self) -> &'static [&'static str] {
        match self {
            Self::AddNodes => &[NODE_ADDED_MESSAGE],
            Self::RemoveNodes => &[NODE_REMOVED_MESSAGE, DELETED_ON_NODE_MESSAGE],
            Self::ReplaceNodes => &[
                NODE_ADDED_MESSAGE,
                NODE_REMOVED_MESSAGE,
                DELETED_ON_NODE_MESSAGE,
            ],
            Self::DeleteCluster => &[DELETED_ON_NODE_MESSAGE],
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::AddNodes => "add nodes",
            Self::RemoveNodes => "remove nodes",
            Self::ReplaceNodes => "replace nodes",
            Self::DeleteCluster => "delete cluster",
        }
    }

    pub fn classify(self, outcomes: NodeOutcomes) -> MutationReport {
        let accepted = self.accepted_messages();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (address, message) in outcomes {
            if accepted.contains(&message.as_str()) {
                succeeded.push(address);
            } else {
                failed.push(NodeFailure { address, message });
            }
        }

        if failed.is_empty() {
            MutationReport::Success { nodes: succeeded }
        } else {
            MutationReport::PartialFailure { succeeded, failed }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub address: String,
    pub message: String,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.address, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MutationReport {
    Success {
        nodes: Vec<String>,
    },
    PartialFailure {
        succeeded: Vec<String>,
        failed: Vec<NodeFailure>,
    },
}

impl MutationReport {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failed(&self) -> &[NodeFailure] {
        match self {
            Self::Success { .. } => &[],
            Self::PartialFailure { failed, .. } => failed,
        }
    }
}

/// Human-readable body of a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDetail {
    Message(String),
    /// Validation failures (HTTP 400 with a JSON array).
    Messages(Vec<String>),
    /// Precondition failures reported per node (HTTP 412 with a JSON object).
    PerNode(BTreeMap<String, String>),
}

impl ErrorDetail {
    pub fn from_response(status: u16, payload: Option<&Value>, raw: &str) -> Self {
        match (status, payload) {
            (400, Some(Value::Array(items))) => {
                Self::Messages(items.iter().map(value_text).collect())
            }
            (412, Some(Value::Object(map))) => Self::PerNode(
                map.iter()
                    .map(|(node, message)| (node.clone(), value_text(message)))
                    .collect(),
            ),
            (_, Some(Value::Object(map))) if map.get("message").is_some_and(Value::is_string) => {
                Self::Message(value_text(&map["message"]))
            }
            (_, Some(Value::String(message))) => Self::Message(message.clone()),
            _ if raw.trim().is_empty() => Self::Message(format!("HTTP {status}")),
            _ => Self::Message(raw.trim().to_string()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Message(message) => vec![message.clone()],
            Self::Messages(messages) => messages.clone(),
            Self::PerNode(nodes) => nodes
                .iter()
                .map(|(node, message)| format!("{node} - {message}"))
                .collect(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("; "))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
