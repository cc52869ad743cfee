//! ClusterMon HTTP client
//!
//! `reqwest` implementation of the `StatusFetcher` and `ClusterAdmin` seams
//! against the workbench cluster endpoints (`/rest/cluster/...`).

pub mod http;

pub use http::*;
