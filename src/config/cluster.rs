use std::path::Path;
use std::time::Duration;

use config::Config;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_MASTER_PORT;
use crate::constants::DEFAULT_WORKER_PORT;
use crate::constants::LOCAL_CLUSTER_PORT_OFFSET;
use crate::constants::MASTER_PORT_STRIDE;
use crate::Error;
use crate::Result;

/// Immutable description of a local multi-master cluster.
///
/// Captured once when the cluster is constructed and never mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Port of the first master replica; replica `i` binds `master_base_port + i * 10`
    #[serde(default = "default_master_base_port")]
    pub master_base_port: u16,

    /// Worker RPC port; the worker data port is the next one
    #[serde(default = "default_worker_base_port")]
    pub worker_base_port: u16,

    #[serde(default = "default_worker_capacity_bytes")]
    pub worker_capacity_bytes: u64,

    /// Number of master replicas taking part in leader election
    #[serde(default = "default_masters")]
    pub masters: usize,

    /// Resolved to the canonical address at start
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Fixed wait between launching masters and launching the worker.
    /// Best-effort ordering only; see `readiness_timeout_ms`.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound for the master port probe run after the settle delay.
    /// `None` disables the probe.
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: Option<u64>,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Passed through to masters and the worker
    #[serde(default = "default_block_size_bytes")]
    pub block_size_bytes: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            master_base_port: default_master_base_port(),
            worker_base_port: default_worker_base_port(),
            worker_capacity_bytes: default_worker_capacity_bytes(),
            masters: default_masters(),
            hostname: default_hostname(),
            settle_delay_ms: default_settle_delay_ms(),
            readiness_timeout_ms: default_readiness_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            block_size_bytes: default_block_size_bytes(),
        }
    }
}

impl ClusterConfig {
    /// Cluster on the default local ports.
    pub fn new(
        worker_capacity_bytes: u64,
        masters: usize,
    ) -> Self {
        Self {
            worker_capacity_bytes,
            masters,
            ..Default::default()
        }
    }

    pub fn with_ports(
        master_base_port: u16,
        worker_base_port: u16,
        worker_capacity_bytes: u64,
        masters: usize,
    ) -> Self {
        Self {
            master_base_port,
            worker_base_port,
            worker_capacity_bytes,
            masters,
            ..Default::default()
        }
    }

    /// Loads a TOML file; missing fields fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cluster configuration consistency
    /// # Errors
    /// Returns `Error::InvalidConfig` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        if self.masters == 0 {
            return Err(Error::InvalidConfig(
                "masters must be at least 1".into(),
            ));
        }

        if self.worker_capacity_bytes == 0 {
            return Err(Error::InvalidConfig(
                "worker_capacity_bytes must be greater than 0".into(),
            ));
        }

        if self.master_base_port == 0 || self.worker_base_port == 0 {
            return Err(Error::InvalidConfig(
                "base ports must be non-zero".into(),
            ));
        }

        // Highest master port plus its web port must stay addressable
        let highest = (self.masters as u64 - 1) * MASTER_PORT_STRIDE as u64
            + self.master_base_port as u64
            + 1;
        if highest > u16::MAX as u64 {
            return Err(Error::InvalidConfig(format!(
                "{} masters starting at port {} exceed the port range",
                self.masters, self.master_base_port
            )));
        }

        if self.worker_base_port == u16::MAX {
            return Err(Error::InvalidConfig(
                "worker_base_port leaves no room for the data port".into(),
            ));
        }

        // Master rpc and web ports must not collide with the worker pair
        let worker_ports = [self.worker_base_port as u64, self.worker_base_port as u64 + 1];
        let clash = (0..self.masters as u64)
            .map(|i| self.master_base_port as u64 + i * MASTER_PORT_STRIDE as u64)
            .find(|port| worker_ports.iter().any(|w| *w == *port || *w == *port + 1));
        if let Some(port) = clash {
            return Err(Error::InvalidConfig(format!(
                "worker ports {}-{} overlap master ports {}-{}",
                self.worker_base_port,
                self.worker_base_port as u64 + 1,
                port,
                port + 1
            )));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "heartbeat_interval_ms must be at least 1ms".into(),
            ));
        }

        if self.hostname.is_empty() {
            return Err(Error::InvalidConfig("hostname cannot be empty".into()));
        }

        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.readiness_timeout_ms.map(Duration::from_millis)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

fn default_master_base_port() -> u16 {
    DEFAULT_MASTER_PORT - LOCAL_CLUSTER_PORT_OFFSET
}
fn default_worker_base_port() -> u16 {
    DEFAULT_WORKER_PORT - LOCAL_CLUSTER_PORT_OFFSET
}
fn default_worker_capacity_bytes() -> u64 {
    // 100MB
    100 * 1024 * 1024
}
fn default_masters() -> usize {
    3
}
fn default_hostname() -> String {
    "localhost".to_string()
}
fn default_settle_delay_ms() -> u64 {
    10
}
fn default_readiness_timeout_ms() -> Option<u64> {
    Some(5000)
}
fn default_heartbeat_interval_ms() -> u64 {
    100
}
fn default_block_size_bytes() -> u64 {
    // 1MB
    1024 * 1024
}
