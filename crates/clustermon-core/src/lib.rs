//! ClusterMon core
//!
//! Shared vocabulary for the cluster status subsystem:
//! - Topology types (nodes, leader links, locations, cluster configuration)
//! - Error taxonomy distinguishing "no cluster" from transport failures
//! - Per-node mutation outcome classification
//! - Monitor settings loading
//! - `StatusFetcher` / `ClusterAdmin` seams implemented by the HTTP client

pub mod error;
pub mod mutation;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::*;
pub use mutation::*;
pub use settings::*;
pub use traits::*;
pub use types::*;
