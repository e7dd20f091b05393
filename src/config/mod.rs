//! Configuration for the local cluster.
//!
//! Two layers live here:
//! 1. [`ClusterConfig`] - the immutable, explicitly passed description of a cluster
//! 2. [`Settings`] - the process-wide surface published by [`ConfigurationInjector`] as
//!    `MINICLUSTER__*` environment variables, read back through the `config` crate by
//!    components that are constructed without a configuration argument
//!

mod cluster;
mod injector;
pub use cluster::*;
pub use injector::*;

#[cfg(test)]
mod config_test;

//---
use std::path::PathBuf;

use config::Config;
use config::Environment;
use serde::Deserialize;

use crate::constants::DEFAULT_MASTER_PORT;
use crate::constants::DEFAULT_WORKER_PORT;
use crate::constants::UNDERFS_DATA_DIR;
use crate::constants::UNDERFS_WORKERS_DIR;
use crate::Result;

pub(crate) const ENV_PREFIX: &str = "MINICLUSTER";
pub(crate) const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root for all relative paths
    #[serde(default = "default_home")]
    pub home: PathBuf,

    #[serde(default)]
    pub underfs: UnderfsSettings,

    #[serde(default)]
    pub master: MasterSettings,

    #[serde(default)]
    pub worker: WorkerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            home: default_home(),
            underfs: UnderfsSettings::default(),
            master: MasterSettings::default(),
            worker: WorkerSettings::default(),
        }
    }
}

impl Settings {
    /// Reads the process-wide surface. Unset keys keep their defaults.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UnderfsSettings {
    /// Backing store root
    #[serde(default = "default_underfs_address")]
    pub address: PathBuf,
}

impl Default for UnderfsSettings {
    fn default() -> Self {
        Self {
            address: default_underfs_address(),
        }
    }
}

impl UnderfsSettings {
    pub fn data_folder(&self) -> PathBuf {
        self.address.join(UNDERFS_DATA_DIR)
    }

    pub fn workers_folder(&self) -> PathBuf {
        self.address.join(UNDERFS_WORKERS_DIR)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MasterSettings {
    #[serde(default = "default_master_hostname")]
    pub hostname: String,

    #[serde(default = "default_master_port")]
    pub port: u16,

    #[serde(default = "default_master_web_port")]
    pub web_port: u16,
}

impl Default for MasterSettings {
    fn default() -> Self {
        Self {
            hostname: default_master_hostname(),
            port: default_master_port(),
            web_port: default_master_web_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    #[serde(default = "default_worker_port")]
    pub port: u16,

    #[serde(default = "default_worker_data_port")]
    pub data_port: u16,

    #[serde(default = "default_worker_data_folder")]
    pub data_folder: PathBuf,

    /// Capacity in bytes
    #[serde(default = "default_worker_memory_size")]
    pub memory_size: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            port: default_worker_port(),
            data_port: default_worker_data_port(),
            data_folder: default_worker_data_folder(),
            memory_size: default_worker_memory_size(),
        }
    }
}

fn default_home() -> PathBuf {
    PathBuf::from("/tmp/minicluster")
}
fn default_underfs_address() -> PathBuf {
    default_home().join("underfs")
}
fn default_master_hostname() -> String {
    "localhost".to_string()
}
fn default_master_port() -> u16 {
    DEFAULT_MASTER_PORT
}
fn default_master_web_port() -> u16 {
    DEFAULT_MASTER_PORT + 1
}
fn default_worker_port() -> u16 {
    DEFAULT_WORKER_PORT
}
fn default_worker_data_port() -> u16 {
    DEFAULT_WORKER_PORT + 1
}
fn default_worker_data_folder() -> PathBuf {
    PathBuf::from("/mnt/ramdisk")
}
fn default_worker_memory_size() -> u64 {
    // 128MB
    128 * 1024 * 1024
}
