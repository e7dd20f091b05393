use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ComponentFactory;
use super::InProcessFactory;
use crate::metrics::LIFECYCLE_EVENTS;
use crate::network::wait_until_ready;
use crate::utils::net::canonical_host;
use crate::utils::net::host_port;
use crate::CleanupWarning;
use crate::ClientRegistry;
use crate::ClusterClient;
use crate::ClusterConfig;
use crate::ConfigurationInjector;
use crate::CoordinationServiceHandle;
use crate::DirectoryProvisioner;
use crate::FilesystemLayout;
use crate::Master;
use crate::MasterInfo;
use crate::MasterReplicaSet;
use crate::PortAllocator;
use crate::QuorumAddress;
use crate::ResolvedTopology;
use crate::Result;
use crate::Settings;
use crate::UsageError;
use crate::Worker;
use crate::WorkerProcess;
use crate::WorkerSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl ClusterState {
    fn as_str(&self) -> &'static str {
        match self {
            ClusterState::Created => "created",
            ClusterState::Starting => "starting",
            ClusterState::Running => "running",
            ClusterState::Stopping => "stopping",
            ClusterState::Stopped => "stopped",
        }
    }
}

/// Outcome of [`LocalCluster::stop`]. Teardown never aborts early; every step
/// that did not complete cleanly is listed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub warnings: Vec<CleanupWarning>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A disposable cluster of N master replicas and one worker.
///
/// Single use: `Created -> Starting -> Running -> Stopping -> Stopped`. Only one
/// cluster may run per process at a time because the injected configuration is
/// process-wide.
///
/// A `start()` that fails leaves the cluster in `Starting` with whatever was
/// launched still running. `stop()` is accepted from `Starting` as well as
/// `Running` so that those components can be torn down.
pub struct LocalCluster {
    config: ClusterConfig,
    factory: Arc<dyn ComponentFactory>,
    state: ClusterState,
    layout: FilesystemLayout,
    topology: Option<ResolvedTopology>,
    injector: ConfigurationInjector,
    coordination: CoordinationServiceHandle,
    masters: MasterReplicaSet,
    worker: WorkerProcess,
    clients: ClientRegistry,
}

impl LocalCluster {
    /// A cluster built from [`InProcessFactory`] components, homed in a fresh
    /// temporary directory.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        Self::with_factory(config, Arc::new(InProcessFactory::new()))
    }

    pub fn with_factory(
        config: ClusterConfig,
        factory: Arc<dyn ComponentFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let layout = FilesystemLayout::new(FilesystemLayout::unique_home(), config.masters);

        Ok(Self {
            config,
            factory,
            state: ClusterState::Created,
            layout,
            topology: None,
            injector: ConfigurationInjector::new(),
            coordination: CoordinationServiceHandle::new(),
            masters: MasterReplicaSet::new(),
            worker: WorkerProcess::new(),
            clients: ClientRegistry::new(),
        })
    }

    /// Overrides the home directory. It must not exist yet.
    pub fn with_home(
        mut self,
        home: impl Into<PathBuf>,
    ) -> Self {
        self.layout = FilesystemLayout::new(home, self.config.masters);
        self
    }

    fn transition(
        &mut self,
        next: ClusterState,
    ) {
        debug!("cluster {:?} -> {:?}", self.state, next);
        self.state = next;
        LIFECYCLE_EVENTS.with_label_values(&[next.as_str()]).inc();
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: &[ClusterState],
    ) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(UsageError::InvalidState {
                operation,
                state: self.state,
            }
            .into())
        }
    }

    /// Brings the cluster up. Returns once every component has been launched and,
    /// when a readiness timeout is configured, every master accepts connections.
    ///
    /// On error the components started so far keep running; call
    /// [`stop`](Self::stop) to release them.
    pub async fn start(&mut self) -> Result<()> {
        self.require("start", &[ClusterState::Created])?;
        self.transition(ClusterState::Starting);

        if let Err(e) = self.try_start().await {
            error!("cluster start failed: {}", e);
            return Err(e);
        }

        self.transition(ClusterState::Running);
        info!(
            "cluster running at {} with quorum {}",
            self.layout.home().display(),
            self.quorum_address().map(|q| q.to_string()).unwrap_or_default()
        );
        Ok(())
    }

    async fn try_start(&mut self) -> Result<()> {
        let hostname = canonical_host(&self.config.hostname).await?;
        let topology = PortAllocator::resolve(&self.config, hostname)?;
        self.topology = Some(topology.clone());

        DirectoryProvisioner::provision(&self.layout)?;
        self.injector
            .inject(&topology, &self.layout, self.config.worker_capacity_bytes);
        self.provision_underfs()?;

        let factory = self.factory.clone();
        let coordination_address = self.coordination.start(factory.as_ref()).await?;

        self.masters
            .start(
                factory.as_ref(),
                &self.config,
                &topology,
                &self.layout,
                &coordination_address,
            )
            .await?;

        // Best-effort bridge while leader election settles; the readiness probe
        // below is the stronger check.
        tokio::time::sleep(self.config.settle_delay()).await;
        if let Some(timeout) = self.config.readiness_timeout() {
            for (index, port) in topology.master_ports().iter().enumerate() {
                let addr = host_port(topology.hostname(), *port);
                wait_until_ready(&format!("master-{index}"), &addr, timeout).await?;
            }
        }

        let spec = WorkerSpec {
            hostname: topology.hostname().to_string(),
            port: topology.worker_port(),
            data_port: topology.worker_data_port(),
            quorum: topology.quorum_address(),
            data_folder: self.layout.ramdisk(),
            capacity_bytes: self.config.worker_capacity_bytes,
            block_size_bytes: self.config.block_size_bytes,
            heartbeat_interval: self.config.heartbeat_interval(),
        };
        self.worker.start(factory.as_ref(), spec).await
    }

    /// `<underfs>/data` and `<underfs>/workers`, located through the injected
    /// configuration.
    fn provision_underfs(&self) -> Result<()> {
        let settings = Settings::load()?;
        DirectoryProvisioner::mkdir(&settings.underfs.data_folder())?;
        DirectoryProvisioner::mkdir(&settings.underfs.workers_folder())?;
        Ok(())
    }

    /// Tears everything down in reverse order. Every step is attempted even when an
    /// earlier one fails; failures are logged and returned in the report.
    pub async fn stop(&mut self) -> Result<TeardownReport> {
        self.require("stop", &[ClusterState::Running, ClusterState::Starting])?;
        self.transition(ClusterState::Stopping);

        let mut warnings = self.clients.close_all();

        for warning in self.masters.stop().await {
            warn!("{}", warning);
            warnings.push(warning);
        }

        if let Some(warning) = self.worker.stop().await {
            warn!("{}", warning);
            warnings.push(warning);
        }

        if let Err(e) = self.coordination.stop().await {
            let warning = CleanupWarning::new("coordination", e);
            warn!("{}", warning);
            warnings.push(warning);
        }

        self.injector.clear();
        self.transition(ClusterState::Stopped);
        info!("cluster stopped with {} warning(s)", warnings.len());
        Ok(TeardownReport { warnings })
    }

    /// A new client addressed at the master quorum. Closed by [`stop`](Self::stop).
    pub fn get_client(&self) -> Result<Arc<dyn ClusterClient>> {
        self.require("get_client", &[ClusterState::Running])?;
        let quorum = self.quorum_address().ok_or(UsageError::InvalidState {
            operation: "get_client",
            state: self.state,
        })?;
        let client = self.factory.create_client(&quorum)?;
        Ok(self.clients.register(client))
    }

    /// Stops the replica currently holding leadership and returns its index.
    pub async fn kill_leader(&mut self) -> Result<usize> {
        self.require("kill_leader", &[ClusterState::Running])?;
        let index = self.leader_index().ok_or(UsageError::NoLeader)?;
        if let Some(Err(warning)) = self.masters.stop_replica(index).await {
            warn!("{}", warning);
        }
        info!("killed leader master-{}", index);
        Ok(index)
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn home(&self) -> &Path {
        self.layout.home()
    }

    /// Empty until `start()` has resolved the topology
    pub fn master_ports(&self) -> &[u16] {
        self.topology.as_ref().map(|t| t.master_ports()).unwrap_or(&[])
    }

    pub fn worker_port(&self) -> Option<u16> {
        self.topology.as_ref().map(|t| t.worker_port())
    }

    pub fn quorum_address(&self) -> Option<QuorumAddress> {
        self.topology.as_ref().map(|t| t.quorum_address())
    }

    pub fn master(
        &self,
        index: usize,
    ) -> Result<Arc<dyn Master>> {
        self.masters.get(index).map(|r| r.master()).ok_or_else(|| {
            UsageError::NoSuchMaster {
                index,
                masters: self.masters.len(),
            }
            .into()
        })
    }

    pub fn master_info(
        &self,
        index: usize,
    ) -> Result<MasterInfo> {
        self.master(index).map(|m| m.info())
    }

    /// Running replica that currently reports leadership
    pub fn leader_index(&self) -> Option<usize> {
        self.masters.leader_index()
    }

    pub fn worker_service(&self) -> Option<Arc<dyn Worker>> {
        self.worker.worker()
    }

    pub fn edit_log_path(&self) -> PathBuf {
        self.layout.edit_log_path()
    }

    pub fn image_path(&self) -> PathBuf {
        self.layout.image_path()
    }

    /// Under-storage address as published on the configuration surface
    pub fn temp_folder_in_underfs(&self) -> Result<PathBuf> {
        Ok(Settings::load()?.underfs.address)
    }
}
