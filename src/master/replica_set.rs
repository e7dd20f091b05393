use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::Master;
use super::MasterInfo;
use super::MasterSpec;
use crate::metrics::RUNNING_COMPONENTS;
use crate::ClusterConfig;
use crate::CleanupWarning;
use crate::ComponentFactory;
use crate::FilesystemLayout;
use crate::ResolvedTopology;
use crate::Result;

/// One running replica: its index, port, task and master instance.
pub struct MasterReplicaHandle {
    index: usize,
    port: u16,
    master: Arc<dyn Master>,
    shutdown_tx: Option<watch::Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl MasterReplicaHandle {
    fn launch(
        index: usize,
        port: u16,
        master: Arc<dyn Master>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let replica = master.clone();
        let handle = tokio::spawn(async move { replica.serve(shutdown_rx).await });
        RUNNING_COMPONENTS.with_label_values(&["master"]).inc();

        Self {
            index,
            port,
            master,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn master(&self) -> Arc<dyn Master> {
        self.master.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signals the replica and waits for its task. Stopping twice is a no-op.
    pub async fn stop(&mut self) -> std::result::Result<(), CleanupWarning> {
        let component = format!("master-{}", self.index);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if let Some(tx) = self.shutdown_tx.take() {
            // Receiver gone means the task already exited
            let _ = tx.send(());
        }
        RUNNING_COMPONENTS.with_label_values(&["master"]).dec();

        match handle.await {
            Ok(Ok(())) => {
                debug!("{} stopped", component);
                Ok(())
            }
            Ok(Err(e)) => Err(CleanupWarning::new(component, e)),
            Err(e) => Err(CleanupWarning::new(component, e)),
        }
    }
}

/// The N master replicas of a cluster.
#[derive(Default)]
pub struct MasterReplicaSet {
    replicas: Vec<MasterReplicaHandle>,
}

impl MasterReplicaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates every replica and launches each one on its own task.
    ///
    /// Returns once all replicas are launched, not once leadership has settled.
    /// On failure the replicas launched so far keep running until [`stop`](Self::stop).
    pub async fn start(
        &mut self,
        factory: &dyn ComponentFactory,
        config: &ClusterConfig,
        topology: &ResolvedTopology,
        layout: &FilesystemLayout,
        coordination_address: &str,
    ) -> Result<()> {
        for (index, port) in topology.master_ports().iter().copied().enumerate() {
            let spec = MasterSpec {
                index,
                hostname: topology.hostname().to_string(),
                port,
                web_port: port + 1,
                coordination_address: coordination_address.to_string(),
                journal_dir: layout.replica_journal(index),
                block_size_bytes: config.block_size_bytes,
                heartbeat_interval: config.heartbeat_interval(),
            };

            let master = factory.create_master(spec).await.map_err(|e| {
                error!("master-{} failed to start: {}", index, e);
                e
            })?;
            self.replicas.push(MasterReplicaHandle::launch(index, port, master));
            info!("master-{} launched on port {}", index, port);
        }
        Ok(())
    }

    /// Stops every replica, whichever one is leader. Failures are returned as
    /// warnings and do not keep the others running.
    pub async fn stop(&mut self) -> Vec<CleanupWarning> {
        let results = join_all(self.replicas.iter_mut().map(|r| r.stop())).await;
        results.into_iter().filter_map(|r| r.err()).collect()
    }

    /// Stops a single replica, e.g. to force a failover.
    pub async fn stop_replica(
        &mut self,
        index: usize,
    ) -> Option<std::result::Result<(), CleanupWarning>> {
        match self.replicas.get_mut(index) {
            Some(replica) => Some(replica.stop().await),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn running(&self) -> usize {
        self.replicas.iter().filter(|r| r.is_running()).count()
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<&MasterReplicaHandle> {
        self.replicas.get(index)
    }

    pub fn info(
        &self,
        index: usize,
    ) -> Option<MasterInfo> {
        self.replicas.get(index).map(|r| r.master.info())
    }

    /// Running replica that currently reports leadership
    pub fn leader_index(&self) -> Option<usize> {
        self.replicas
            .iter()
            .filter(|r| r.is_running())
            .find(|r| r.master.info().is_leader())
            .map(|r| r.index)
    }
}
