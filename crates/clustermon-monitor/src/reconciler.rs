use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use clustermon_core::{patch_local_location, ClusterError, Node, StatusFetcher};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::leadership::is_leader_changed;
use crate::snapshot::{ClusterSnapshot, Redraw};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// Leadership moved (or no leader is elected) during this pass
    pub leader_changed: bool,
    /// Failures other than "no cluster", for user-facing notification
    pub errors: Vec<ClusterError>,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Another pass was in flight; nothing was fetched.
    Skipped,
    Completed(RefreshReport),
}

impl RefreshOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn report(&self) -> Option<&RefreshReport> {
        match self {
            Self::Skipped => None,
            Self::Completed(report) => Some(report),
        }
    }
}

/// Merges node, configuration and cluster status into one view model.
///
/// At most one pass runs at a time; a request arriving while a pass is in
/// flight is dropped, not queued. A dropped forced request still makes the
/// next pass re-fetch the configuration. State is only touched between
/// fetches and no lock is held across an await.
pub struct Reconciler<F> {
    fetcher: F,
    state: RwLock<ClusterSnapshot>,
    in_flight: AtomicBool,
    force_pending: AtomicBool,
    redraw: Arc<dyn Redraw>,
    updates: watch::Sender<Arc<ClusterSnapshot>>,
}

/// Held for the duration of a pass. Dropping it publishes the snapshot, calls
/// the redraw hook and releases the in-flight flag, also when the pass future
/// is cancelled.
struct PassGuard<'a, F> {
    reconciler: &'a Reconciler<F>,
}

impl<F> Drop for PassGuard<'_, F> {
    fn drop(&mut self) {
        self.reconciler.finish_pass();
    }
}

impl<F> Reconciler<F> {
    pub fn snapshot(&self) -> ClusterSnapshot {
        self.state.read().clone()
    }

    /// Receives the snapshot published at the end of every pass.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ClusterSnapshot>> {
        self.updates.subscribe()
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight.load(Ordering::Acquire) {
            Phase::Polling
        } else {
            Phase::Idle
        }
    }

    fn try_begin(&self) -> Option<PassGuard<'_, F>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(PassGuard { reconciler: self })
    }

    fn finish_pass(&self) {
        let snapshot = {
            let mut state = self.state.write();
            state.refreshed_at = Some(Utc::now());
            Arc::new(state.clone())
        };
        self.in_flight.store(false, Ordering::Release);
        self.updates.send_replace(Arc::clone(&snapshot));
        self.redraw.redraw(&snapshot);
    }
}

impl<F: StatusFetcher> Reconciler<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_redraw(fetcher, |_: &ClusterSnapshot| {})
    }

    pub fn with_redraw(fetcher: F, redraw: impl Redraw + 'static) -> Self {
        let (updates, _) = watch::channel(Arc::new(ClusterSnapshot::default()));
        Self {
            fetcher,
            state: RwLock::new(ClusterSnapshot::default()),
            in_flight: AtomicBool::new(false),
            force_pending: AtomicBool::new(false),
            redraw: Arc::new(redraw),
            updates,
        }
    }

    /// One reconciliation pass: cluster status, then configuration when forced
    /// or not cached, then this node's status when unknown or leadership moved.
    ///
    /// A 404 on cluster status clears the model but the later stages still run.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let Some(_pass) = self.try_begin() else {
            if force {
                self.force_pending.store(true, Ordering::Release);
            }
            debug!(force, "cluster refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };
        let force = self.force_pending.swap(false, Ordering::AcqRel) || force;

        let mut report = RefreshReport::default();
        self.sync_cluster_status(&mut report).await;

        let needs_config = force || self.state.read().configuration.is_none();
        if needs_config {
            self.sync_configuration(&mut report).await;
        }

        let needs_current_node = {
            let state = self.state.read();
            state.current_node.is_none() || state.leader_changed
        };
        if needs_current_node {
            self.sync_current_node(&mut report).await;
        }

        RefreshOutcome::Completed(report)
    }

    /// First load of the view: this node, configuration, then cluster status.
    pub async fn load_initial(&self) -> RefreshOutcome {
        let Some(_pass) = self.try_begin() else {
            debug!("cluster refresh already in flight, skipping initial load");
            return RefreshOutcome::Skipped;
        };

        let mut report = RefreshReport::default();
        self.sync_current_node(&mut report).await;
        self.sync_configuration(&mut report).await;
        self.sync_cluster_status(&mut report).await;

        RefreshOutcome::Completed(report)
    }

    async fn sync_cluster_status(&self, report: &mut RefreshReport) {
        match self.fetcher.fetch_cluster_status().await {
            Ok(nodes) => {
                let mut state = self.state.write();
                let leader = nodes.iter().find(|node| node.is_leader()).cloned();

                if is_leader_changed(state.current_leader.as_ref(), leader.as_ref()) {
                    match &leader {
                        Some(leader) => info!(
                            target: "clustermon::reconciler",
                            leader = %leader.address,
                            term = leader.term,
                            "Cluster leader changed"
                        ),
                        None => debug!(
                            target: "clustermon::reconciler",
                            "No cluster leader elected"
                        ),
                    }
                    state.current_leader = leader;
                    state.leader_changed = true;
                    report.leader_changed = true;
                }

                let current = state
                    .current_node
                    .as_ref()
                    .and_then(|current| nodes.iter().find(|node| node.address == current.address))
                    .cloned();
                state.current_node = current;
                state.model.apply_status(nodes);
            }
            Err(ClusterError::NotFound { .. }) => {
                let mut state = self.state.write();
                if state.model.has_cluster {
                    info!(target: "clustermon::reconciler", "Cluster is no longer configured");
                }
                state.model.clear();
                state.configuration = None;
            }
            Err(e) => {
                warn!(
                    target: "clustermon::reconciler",
                    error = %e,
                    "Failed to fetch cluster status"
                );
                report.errors.push(e);
            }
        }
    }

    async fn sync_configuration(&self, report: &mut RefreshReport) {
        match self.fetcher.fetch_cluster_config().await {
            Ok(configuration) => {
                let needs_current_node = {
                    let mut state = self.state.write();
                    state.configuration = Some(configuration);
                    state.current_node.is_none()
                };
                if needs_current_node {
                    self.sync_current_node(report).await;
                }
            }
            Err(e) => {
                self.state.write().configuration = None;
                if !e.is_not_found() {
                    warn!(
                        target: "clustermon::reconciler",
                        error = %e,
                        "Failed to fetch cluster configuration"
                    );
                    report.errors.push(e);
                }
            }
        }
    }

    /// Best effort: on failure the error body, when it decodes as a node, stands
    /// in for this node's status and the model is marked as having no cluster.
    async fn sync_current_node(&self, report: &mut RefreshReport) {
        match self.fetcher.fetch_node_status().await {
            Ok(node) => {
                let mut state = self.state.write();
                state.leader_changed = false;
                state.current_node = Some(node);
            }
            Err(e) => {
                let fallback = e
                    .payload()
                    .and_then(|payload| serde_json::from_value::<Node>(payload.clone()).ok());
                {
                    let mut state = self.state.write();
                    state.current_node = fallback;
                    state.model.has_cluster = false;
                }
                if !e.is_not_found() {
                    warn!(
                        target: "clustermon::reconciler",
                        error = %e,
                        "Failed to fetch node status"
                    );
                    report.errors.push(e);
                }
            }
        }

        self.sync_locations(report).await;
    }

    async fn sync_locations(&self, report: &mut RefreshReport) {
        match self.fetcher.fetch_locations().await {
            Ok(mut locations) => {
                let mut state = self.state.write();
                if let Some(node) = &state.current_node {
                    patch_local_location(&mut locations, node);
                }
                state.model.locations = locations;
            }
            Err(e) => {
                warn!(
                    target: "clustermon::reconciler",
                    error = %e,
                    "Failed to fetch locations"
                );
                report.errors.push(e);
            }
        }
    }
}
