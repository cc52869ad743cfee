//! ClusterMon monitor
//!
//! Provides:
//! - `Reconciler`: merges node, configuration and cluster status into a view model,
//!   detects leader changes and derives leader-to-follower links
//! - `Poller`: fixed-period and event-driven refresh with graceful teardown
//! - `ClusterActions`: create/edit/delete cluster and add/remove/replace nodes
//!   with per-node outcome reporting
//! - Snapshot subscription and redraw hook for renderers

pub mod actions;
pub mod events;
pub mod leadership;
pub mod poller;
pub mod reconciler;
pub mod snapshot;

pub use actions::*;
pub use events::*;
pub use leadership::*;
pub use poller::*;
pub use reconciler::*;
pub use snapshot::*;
