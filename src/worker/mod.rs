//! The storage worker.
//!
//! One worker per cluster. It is handed the full [`QuorumAddress`] of the masters,
//! never a single master, and registers with whichever replica currently leads.

mod in_process;
mod process;

pub use in_process::*;
pub use process::*;


use std::path::PathBuf;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use tokio::sync::watch;
use tonic::async_trait;

use crate::utils::net::host_port;
use crate::QuorumAddress;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub hostname: String,
    pub port: u16,
    pub data_port: u16,
    pub quorum: QuorumAddress,
    pub data_folder: PathBuf,
    pub capacity_bytes: u64,
    pub block_size_bytes: u64,
    pub heartbeat_interval: Duration,
}

impl WorkerSpec {
    pub fn address(&self) -> String {
        host_port(&self.hostname, self.port)
    }
}

/// White-box view of the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerInfo {
    pub address: String,
    pub port: u16,
    pub data_port: u16,
    pub data_folder: PathBuf,
    pub capacity_bytes: u64,
    /// Leader the last heartbeat reached, if any
    pub registered_master: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Runs the worker until `shutdown` fires.
    async fn serve(
        &self,
        shutdown: watch::Receiver<()>,
    ) -> Result<()>;

    fn info(&self) -> WorkerInfo;
}
