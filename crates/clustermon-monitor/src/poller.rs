use std::sync::Arc;
use std::time::Duration;

use clustermon_core::{ClusterAdmin, MonitorSettings, StatusFetcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actions::delete_cluster;
use crate::events::{event_channel, ClusterEvent, EventSender};
use crate::reconciler::{Reconciler, RefreshOutcome};

/// Drives the reconciler on a fixed period and on explicit events.
pub struct Poller<F> {
    reconciler: Arc<Reconciler<F>>,
    interval: Duration,
    shutdown_timeout: Duration,
    admin: Option<Arc<dyn ClusterAdmin>>,
}

impl<F> Poller<F>
where
    F: StatusFetcher + 'static,
{
    pub fn new(reconciler: Arc<Reconciler<F>>, settings: &MonitorSettings) -> Self {
        Self {
            reconciler,
            interval: settings.poll_interval(),
            shutdown_timeout: settings.shutdown_timeout(),
            admin: None,
        }
    }

    /// Admin client used to carry out `ClusterEvent::Deleted`.
    pub fn with_admin(mut self, admin: Arc<dyn ClusterAdmin>) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Runs the initial load, then starts the timer. Returns immediately.
    pub fn spawn(self) -> PollerHandle {
        let (events, events_rx) = event_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let shutdown_timeout = self.shutdown_timeout;

        let task = tokio::spawn(self.run(events_rx, shutdown_rx));
        info!(target: "clustermon::poller", "Cluster poller started");

        PollerHandle {
            events,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            shutdown_timeout,
        }
    }

    async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<ClusterEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                info!(target: "clustermon::poller", "Shutdown during initial load");
                return;
            }
            outcome = self.reconciler.load_initial() => log_outcome("initial load", &outcome),
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Each pass runs as its own task so a hung request never holds up the
        // timer; the reconciler's in-flight flag drops the overlap.
        let mut passes = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                Some(event) = events.recv() => self.dispatch(&mut passes, event),
                _ = ticker.tick() => self.spawn_refresh(&mut passes, false),
                Some(joined) = passes.join_next(), if !passes.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!(target: "clustermon::poller", error = %e, "Refresh task panicked");
                        }
                    }
                }
            }
        }

        passes.abort_all();
        info!(target: "clustermon::poller", "Cluster poller stopped");
    }

    fn dispatch(&self, passes: &mut JoinSet<()>, event: ClusterEvent) {
        debug!(target: "clustermon::poller", ?event, "Cluster event received");
        match event {
            ClusterEvent::Updated { force } => self.spawn_refresh(passes, force),
            ClusterEvent::Deleted { force } => {
                let reconciler = Arc::clone(&self.reconciler);
                let admin = self.admin.clone();
                passes.spawn(async move {
                    match admin {
                        Some(admin) => {
                            if let Ok(report) = delete_cluster(admin.as_ref(), force).await {
                                info!(
                                    target: "clustermon::poller",
                                    success = report.is_success(),
                                    "Cluster delete finished"
                                );
                            }
                        }
                        None => warn!(
                            target: "clustermon::poller",
                            "Cluster delete requested without an admin client"
                        ),
                    }
                    let outcome = reconciler.refresh(true).await;
                    log_outcome("refresh after delete", &outcome);
                });
            }
        }
    }

    fn spawn_refresh(&self, passes: &mut JoinSet<()>, force: bool) {
        let reconciler = Arc::clone(&self.reconciler);
        passes.spawn(async move {
            let outcome = reconciler.refresh(force).await;
            log_outcome(if force { "forced refresh" } else { "refresh" }, &outcome);
        });
    }
}

fn log_outcome(pass: &str, outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Skipped => debug!(target: "clustermon::poller", pass, "Pass skipped"),
        RefreshOutcome::Completed(report) => {
            for error in &report.errors {
                warn!(target: "clustermon::poller", pass, error = %error, "Cluster status degraded");
            }
        }
    }
}

/// Owner of a running poller. Dropping it stops the poller.
pub struct PollerHandle {
    events: EventSender,
    shutdown_tx: Option<broadcast::Sender<()>>,
    task: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl PollerHandle {
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn request_update(&self, force: bool) -> bool {
        self.events.request_update(force)
    }

    pub fn request_delete(&self, force: bool) -> bool {
        self.events.request_delete(force)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the timer, cancels outstanding passes and waits for the loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            match tokio::time::timeout(self.shutdown_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_error)) => warn!(
                    target: "clustermon::poller",
                    error = %join_error,
                    "Cluster poller task failed"
                ),
                Err(_) => {
                    warn!(
                        target: "clustermon::poller",
                        "Cluster poller shutdown timed out after {:?}",
                        self.shutdown_timeout
                    );
                    abort.abort();
                }
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
