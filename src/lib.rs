//! Local multi-master cluster for integration tests.
//!
//! Brings up N master replicas that elect a leader through an ephemeral
//! coordination service, plus one worker addressed at the full master quorum,
//! each on its own isolated directory tree and deterministic ports. Tears all of
//! it down again, closing every client handed out in between.
//!
//! ```no_run
//! use minicluster::{ClusterConfig, LocalCluster};
//!
//! # async fn run() -> minicluster::Result<()> {
//! let mut cluster = LocalCluster::new(ClusterConfig::with_ports(19990, 29990, 100, 3))?;
//! cluster.start().await?;
//! assert_eq!(cluster.master_ports(), &[19990, 20000, 20010]);
//!
//! let report = cluster.stop().await?;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

mod client;
mod cluster;
mod config;
mod coordination;
mod errors;
mod master;
mod metrics;
mod network;
mod topology;
mod worker;
pub mod constants;
pub mod utils;

pub use client::*;
pub use cluster::*;
pub use config::*;
pub use coordination::*;
pub use errors::*;
pub use master::*;
pub use metrics::*;
pub use network::*;
pub use topology::*;
pub use worker::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
