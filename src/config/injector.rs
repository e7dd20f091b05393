use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tracing::debug;

use super::ENV_PREFIX;
use super::ENV_SEPARATOR;
use crate::FilesystemLayout;
use crate::ResolvedTopology;

/// The keys published on the process-wide configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Home,
    UnderfsAddress,
    MasterHostname,
    MasterPort,
    MasterWebPort,
    WorkerPort,
    WorkerDataPort,
    WorkerDataFolder,
    WorkerMemorySize,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 9] = [
        ConfigKey::Home,
        ConfigKey::UnderfsAddress,
        ConfigKey::MasterHostname,
        ConfigKey::MasterPort,
        ConfigKey::MasterWebPort,
        ConfigKey::WorkerPort,
        ConfigKey::WorkerDataPort,
        ConfigKey::WorkerDataFolder,
        ConfigKey::WorkerMemorySize,
    ];

    /// Dotted path as seen by [`crate::Settings`]
    pub fn path(&self) -> &'static str {
        match self {
            ConfigKey::Home => "home",
            ConfigKey::UnderfsAddress => "underfs.address",
            ConfigKey::MasterHostname => "master.hostname",
            ConfigKey::MasterPort => "master.port",
            ConfigKey::MasterWebPort => "master.web_port",
            ConfigKey::WorkerPort => "worker.port",
            ConfigKey::WorkerDataPort => "worker.data_port",
            ConfigKey::WorkerDataFolder => "worker.data_folder",
            ConfigKey::WorkerMemorySize => "worker.memory_size",
        }
    }

    /// e.g. `MINICLUSTER__MASTER__WEB_PORT`
    pub fn env_var(&self) -> String {
        let segments: Vec<String> = self
            .path()
            .split('.')
            .map(|s| s.to_ascii_uppercase())
            .collect();
        format!("{}{}{}", ENV_PREFIX, ENV_SEPARATOR, segments.join(ENV_SEPARATOR))
    }
}

/// Publishes resolved addresses, paths and capacity before any master or worker is
/// constructed, and removes them after the last one has stopped.
///
/// The surface is global to the process, so only one cluster may be running at a
/// time. Writes happen on the lifecycle thread before any reader is started.
#[derive(Debug, Default)]
pub struct ConfigurationInjector {
    injected: AtomicBool,
}

impl ConfigurationInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key/value pairs that [`inject`](Self::inject) would publish.
    pub fn entries(
        topology: &ResolvedTopology,
        layout: &FilesystemLayout,
        worker_capacity_bytes: u64,
    ) -> Vec<(ConfigKey, String)> {
        vec![
            (ConfigKey::Home, layout.home().display().to_string()),
            (ConfigKey::UnderfsAddress, layout.underfs().display().to_string()),
            (ConfigKey::MasterHostname, topology.hostname().to_string()),
            (ConfigKey::MasterPort, topology.master_ports()[0].to_string()),
            (ConfigKey::MasterWebPort, topology.master_web_ports()[0].to_string()),
            (ConfigKey::WorkerPort, topology.worker_port().to_string()),
            (ConfigKey::WorkerDataPort, topology.worker_data_port().to_string()),
            (ConfigKey::WorkerDataFolder, layout.ramdisk().display().to_string()),
            (ConfigKey::WorkerMemorySize, worker_capacity_bytes.to_string()),
        ]
    }

    pub fn inject(
        &self,
        topology: &ResolvedTopology,
        layout: &FilesystemLayout,
        worker_capacity_bytes: u64,
    ) {
        for (key, value) in Self::entries(topology, layout, worker_capacity_bytes) {
            debug!(key = %key.env_var(), %value, "inject");
            env::set_var(key.env_var(), value);
        }
        self.injected.store(true, Ordering::SeqCst);
    }

    /// Removes every key. Clearing an already clear surface is a no-op.
    pub fn clear(&self) {
        for key in ConfigKey::ALL {
            env::remove_var(key.env_var());
        }
        if self.injected.swap(false, Ordering::SeqCst) {
            debug!("configuration surface cleared");
        }
    }

    pub fn is_injected(&self) -> bool {
        self.injected.load(Ordering::Acquire)
    }

    /// Current value of one key, `None` when unset.
    pub fn lookup(key: ConfigKey) -> Option<String> {
        env::var(key.env_var()).ok()
    }
}
