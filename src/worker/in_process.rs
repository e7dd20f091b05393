use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tonic::async_trait;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::Worker;
use super::WorkerInfo;
use super::WorkerSpec;
use crate::network::find_leader;
use crate::network::spawn_health_server;
use crate::utils::net::bind;
use crate::ComponentStartError;
use crate::Result;
use crate::Settings;

const COMPONENT: &str = "worker";

/// Worker running inside the test process.
///
/// Binds `port` for gRPC health and `port + 1` for raw data connections. Every
/// heartbeat it looks up the leader through the quorum address and records which
/// master it registered with.
pub struct InProcessWorker {
    spec: WorkerSpec,
    /// `<underfs>/workers/<port>`
    underfs_folder: PathBuf,
    registered_master: Mutex<Option<String>>,
    data_connections: AtomicU64,
    rpc_listener: Mutex<Option<TcpListener>>,
    data_listener: Mutex<Option<TcpListener>>,
}

impl InProcessWorker {
    pub async fn create(spec: WorkerSpec) -> Result<Self> {
        if !spec.data_folder.is_dir() {
            return Err(ComponentStartError::Init {
                component: COMPONENT.to_string(),
                reason: format!("data folder {} is missing", spec.data_folder.display()),
            }
            .into());
        }

        let settings = Settings::load()?;
        let underfs_folder = settings.underfs.workers_folder().join(spec.port.to_string());
        std::fs::create_dir_all(&underfs_folder).map_err(|e| ComponentStartError::Init {
            component: COMPONENT.to_string(),
            reason: format!("{}: {}", underfs_folder.display(), e),
        })?;

        let rpc_listener = bind(COMPONENT, &spec.hostname, spec.port).await?;
        let data_listener = bind(COMPONENT, &spec.hostname, spec.data_port).await?;
        debug!(
            "worker bound {}:{} and data port {}",
            spec.hostname, spec.port, spec.data_port
        );

        Ok(Self {
            spec,
            underfs_folder,
            registered_master: Mutex::new(None),
            data_connections: AtomicU64::new(0),
            rpc_listener: Mutex::new(Some(rpc_listener)),
            data_listener: Mutex::new(Some(data_listener)),
        })
    }

    pub fn underfs_folder(&self) -> &PathBuf {
        &self.underfs_folder
    }

    /// Data connections accepted so far
    pub fn data_connections(&self) -> u64 {
        self.data_connections.load(Ordering::Acquire)
    }

    async fn heartbeat(&self) {
        match find_leader(&self.spec.quorum, self.spec.heartbeat_interval).await {
            Ok(leader) => {
                let mut registered = self.registered_master.lock();
                if registered.as_deref() != Some(leader.as_str()) {
                    info!("worker registered with master {}", leader);
                    *registered = Some(leader);
                }
            }
            Err(e) => debug!("worker heartbeat found no leader: {}", e),
        }
    }

    async fn run_heartbeats(
        &self,
        mut shutdown: watch::Receiver<()>,
    ) {
        loop {
            self.heartbeat().await;
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.spec.heartbeat_interval) => {}
            }
        }
    }

    async fn accept_data(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = listener.accept() => match accepted {
                    Ok((_stream, peer)) => {
                        self.data_connections.fetch_add(1, Ordering::AcqRel);
                        debug!("worker accepted data connection from {}", peer);
                    }
                    Err(e) => warn!("worker data accept failed: {}", e),
                }
            }
        }
    }
}

#[async_trait]
impl Worker for InProcessWorker {
    async fn serve(
        &self,
        shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        let rpc_listener = self.rpc_listener.lock().take();
        let data_listener = self.data_listener.lock().take();
        let (Some(rpc_listener), Some(data_listener)) = (rpc_listener, data_listener) else {
            return Err(ComponentStartError::Init {
                component: COMPONENT.to_string(),
                reason: "worker was already served".to_string(),
            }
            .into());
        };

        let (_reporter, rpc_handle) = spawn_health_server(rpc_listener, shutdown.clone());

        tokio::join!(
            self.accept_data(data_listener, shutdown.clone()),
            self.run_heartbeats(shutdown),
        );

        match rpc_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("worker rpc server stopped with error: {}", e),
            Err(e) => warn!("worker rpc server task failed: {}", e),
        }
        debug!("worker exited");
        Ok(())
    }

    fn info(&self) -> WorkerInfo {
        WorkerInfo {
            address: self.spec.address(),
            port: self.spec.port,
            data_port: self.spec.data_port,
            data_folder: self.spec.data_folder.clone(),
            capacity_bytes: self.spec.capacity_bytes,
            registered_master: self.registered_master.lock().clone(),
        }
    }
}
