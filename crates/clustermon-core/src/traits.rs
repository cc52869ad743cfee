use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::mutation::NodeOutcomes;
use crate::types::{ClusterConfig, ClusterConfigPatch, Location, Node};

/// Read side of the cluster REST surface. Each call is independent and fallible;
/// a missing cluster surfaces as [`ClusterError::NotFound`](crate::ClusterError::NotFound).
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Status of the node this client is connected to.
    async fn fetch_node_status(&self) -> Result<Node>;

    async fn fetch_cluster_config(&self) -> Result<ClusterConfig>;

    /// Status of every cluster member, as seen by the connected node.
    async fn fetch_cluster_status(&self) -> Result<Vec<Node>>;

    async fn fetch_locations(&self) -> Result<Vec<Location>>;
}

/// Cluster lifecycle mutations.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    async fn create_cluster(&self, config: &ClusterConfig) -> Result<ClusterConfig>;

    async fn update_cluster_config(&self, patch: &ClusterConfigPatch) -> Result<ClusterConfig>;

    async fn delete_cluster(&self, force: bool) -> Result<NodeOutcomes>;

    async fn add_nodes(&self, nodes: &[String]) -> Result<NodeOutcomes>;

    async fn remove_nodes(&self, nodes: &[String]) -> Result<NodeOutcomes>;

    async fn replace_nodes(&self, add: &[String], remove: &[String]) -> Result<NodeOutcomes>;
}

#[async_trait]
impl<T: StatusFetcher + ?Sized> StatusFetcher for Arc<T> {
    async fn fetch_node_status(&self) -> Result<Node> {
        (**self).fetch_node_status().await
    }

    async fn fetch_cluster_config(&self) -> Result<ClusterConfig> {
        (**self).fetch_cluster_config().await
    }

    async fn fetch_cluster_status(&self) -> Result<Vec<Node>> {
        (**self).fetch_cluster_status().await
    }

    async fn fetch_locations(&self) -> Result<Vec<Location>> {
        (**self).fetch_locations().await
    }
}
