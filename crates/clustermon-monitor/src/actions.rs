use std::sync::Arc;

use clustermon_core::{
    ClusterAdmin, ClusterConfig, ClusterConfigPatch, ClusterError, MutationKind, MutationReport,
    NodeOutcomes, Result,
};
use tracing::{info, warn};

use crate::events::EventSender;

/// Cluster lifecycle operations invoked by the hosting view.
///
/// Every operation that reaches the server requests a forced refresh
/// afterwards, whether it succeeded or not.
pub struct ClusterActions {
    admin: Arc<dyn ClusterAdmin>,
    events: Option<EventSender>,
}

impl ClusterActions {
    pub fn new(admin: Arc<dyn ClusterAdmin>) -> Self {
        Self {
            admin,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn create_cluster(&self, config: &ClusterConfig) -> Result<ClusterConfig> {
        if config.nodes.is_empty() {
            return Err(ClusterError::InvalidRequest(
                "a cluster needs at least one node".into(),
            ));
        }
        let result = self.admin.create_cluster(config).await;
        match &result {
            Ok(created) => info!(
                target: "clustermon::actions",
                nodes = created.nodes.len(),
                "Cluster created"
            ),
            Err(e) => warn!(target: "clustermon::actions", error = %e, "Cluster creation failed"),
        }
        self.request_refresh();
        result
    }

    pub async fn edit_cluster(&self, patch: &ClusterConfigPatch) -> Result<ClusterConfig> {
        if patch.is_empty() {
            return Err(ClusterError::InvalidRequest(
                "no cluster property to change".into(),
            ));
        }
        let result = self.admin.update_cluster_config(patch).await;
        if let Err(e) = &result {
            warn!(target: "clustermon::actions", error = %e, "Cluster update failed");
        }
        self.request_refresh();
        result
    }

    pub async fn add_nodes(&self, nodes: &[String]) -> Result<MutationReport> {
        require_nodes(nodes)?;
        let outcomes = self.admin.add_nodes(nodes).await;
        self.finish(MutationKind::AddNodes, outcomes)
    }

    pub async fn remove_nodes(&self, nodes: &[String]) -> Result<MutationReport> {
        require_nodes(nodes)?;
        let outcomes = self.admin.remove_nodes(nodes).await;
        self.finish(MutationKind::RemoveNodes, outcomes)
    }

    pub async fn replace_nodes(&self, add: &[String], remove: &[String]) -> Result<MutationReport> {
        if add.is_empty() && remove.is_empty() {
            return Err(ClusterError::InvalidRequest(
                "nothing to replace: no nodes to add or remove".into(),
            ));
        }
        let outcomes = self.admin.replace_nodes(add, remove).await;
        self.finish(MutationKind::ReplaceNodes, outcomes)
    }

    pub async fn delete_cluster(&self, force: bool) -> Result<MutationReport> {
        let result = delete_cluster(self.admin.as_ref(), force).await;
        self.request_refresh();
        result
    }

    fn finish(
        &self,
        kind: MutationKind,
        outcomes: Result<NodeOutcomes>,
    ) -> Result<MutationReport> {
        let result = outcomes.map(|outcomes| classify(kind, outcomes));
        if let Err(e) = &result {
            warn!(
                target: "clustermon::actions",
                operation = kind.describe(),
                error = %e,
                "Cluster operation rejected"
            );
        }
        self.request_refresh();
        result
    }

    fn request_refresh(&self) {
        if let Some(events) = &self.events {
            if !events.request_update(true) {
                warn!(target: "clustermon::actions", "Cluster poller is gone, refresh not requested");
            }
        }
    }
}

pub(crate) async fn delete_cluster(admin: &dyn ClusterAdmin, force: bool) -> Result<MutationReport> {
    match admin.delete_cluster(force).await {
        Ok(outcomes) => Ok(classify(MutationKind::DeleteCluster, outcomes)),
        Err(e) => {
            warn!(
                target: "clustermon::actions",
                force,
                error = %e,
                "Cluster deletion failed"
            );
            Err(e)
        }
    }
}

fn classify(kind: MutationKind, outcomes: NodeOutcomes) -> MutationReport {
    let report = kind.classify(outcomes);
    match &report {
        MutationReport::Success { nodes } => info!(
            target: "clustermon::actions",
            operation = kind.describe(),
            nodes = nodes.len(),
            "Cluster operation succeeded"
        ),
        MutationReport::PartialFailure { failed, .. } => {
            for failure in failed {
                warn!(
                    target: "clustermon::actions",
                    operation = kind.describe(),
                    address = %failure.address,
                    "{}",
                    failure.message
                );
            }
        }
    }
    report
}

fn require_nodes(nodes: &[String]) -> Result<()> {
    if nodes.is_empty() {
        return Err(ClusterError::InvalidRequest("no nodes selected".into()));
    }
    Ok(())
}
