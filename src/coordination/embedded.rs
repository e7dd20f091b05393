use std::sync::Arc;

use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::async_trait;
use tracing::debug;
use tracing::warn;

use super::CoordinationService;
use super::LeaderLatch;
use crate::network::spawn_health_server;
use crate::CoordinationServiceError;
use crate::Result;

/// Latches of every running embedded coordinator, keyed by connect address.
#[derive(Debug, Clone, Default)]
pub struct LatchRegistry {
    latches: Arc<DashMap<String, Arc<LeaderLatch>>>,
}

impl LatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch served at `address`
    pub fn connect(
        &self,
        address: &str,
    ) -> Result<Arc<LeaderLatch>> {
        self.latches
            .get(address)
            .map(|latch| latch.value().clone())
            .ok_or_else(|| CoordinationServiceError::Unreachable(address.to_string()).into())
    }

    pub fn len(&self) -> usize {
        self.latches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latches.is_empty()
    }

    fn register(
        &self,
        address: String,
        latch: Arc<LeaderLatch>,
    ) {
        self.latches.insert(address, latch);
    }

    fn unregister(
        &self,
        address: &str,
    ) {
        self.latches.remove(address);
    }
}

struct RunningEnsemble {
    address: String,
    shutdown_tx: watch::Sender<()>,
    handle: JoinHandle<std::result::Result<(), tonic::transport::Error>>,
}

/// Single-node coordination service living inside the test process.
///
/// Listens on an ephemeral loopback port (gRPC health) and hosts one
/// [`LeaderLatch`] for the replicas that connect to it.
pub struct EmbeddedCoordinator {
    registry: LatchRegistry,
    running: Option<RunningEnsemble>,
}

impl EmbeddedCoordinator {
    pub fn new(registry: LatchRegistry) -> Self {
        Self {
            registry,
            running: None,
        }
    }
}

#[async_trait]
impl CoordinationService for EmbeddedCoordinator {
    async fn start(&mut self) -> Result<String> {
        if let Some(running) = &self.running {
            return Ok(running.address.clone());
        }

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|source| CoordinationServiceError::Bind { source })?;
        let address = listener
            .local_addr()
            .map_err(|source| CoordinationServiceError::Bind { source })?
            .to_string();

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let (_reporter, handle) = spawn_health_server(listener, shutdown_rx);

        self.registry
            .register(address.clone(), Arc::new(LeaderLatch::new()));
        debug!("embedded coordinator registered at {}", address);

        self.running = Some(RunningEnsemble {
            address: address.clone(),
            shutdown_tx,
            handle,
        });
        Ok(address)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        self.registry.unregister(&running.address);
        let _ = running.shutdown_tx.send(());

        if let Err(e) = running.handle.await.map_err(CoordinationServiceError::TaskFailed)? {
            warn!("coordination service at {} stopped with error: {}", running.address, e);
        }
        Ok(())
    }
}
