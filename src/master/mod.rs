//! Master replicas.
//!
//! A [`Master`] is one metadata-service replica taking part in leader election
//! through the coordination service. [`MasterReplicaSet`] provisions N of them, each
//! running on its own task, and stops all of them regardless of which one holds
//! leadership.

mod in_process;
mod replica_set;

pub use in_process::*;
pub use replica_set::*;


use std::path::PathBuf;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use tokio::sync::watch;
use tonic::async_trait;

use crate::utils::net::host_port;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MasterRole {
    Standby,
    Leader,
}

/// Everything a replica is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterSpec {
    pub index: usize,
    pub hostname: String,
    pub port: u16,
    pub web_port: u16,
    /// Shared by every replica of the cluster
    pub coordination_address: String,
    /// Replica specific
    pub journal_dir: PathBuf,
    pub block_size_bytes: u64,
    pub heartbeat_interval: Duration,
}

impl MasterSpec {
    pub fn address(&self) -> String {
        host_port(&self.hostname, self.port)
    }
}

/// White-box view of a replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterInfo {
    pub index: usize,
    pub address: String,
    pub port: u16,
    pub web_port: u16,
    pub role: MasterRole,
    pub journal_dir: PathBuf,
    /// Number of times this replica gained leadership
    pub leader_terms: u64,
}

impl MasterInfo {
    pub fn is_leader(&self) -> bool {
        self.role == MasterRole::Leader
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Master: Send + Sync + 'static {
    /// Runs the replica until `shutdown` fires.
    async fn serve(
        &self,
        shutdown: watch::Receiver<()>,
    ) -> Result<()>;

    fn info(&self) -> MasterInfo;
}
