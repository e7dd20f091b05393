use std::sync::Arc;
use std::time::Duration;

use tonic::async_trait;

use super::ComponentFactory;
use crate::ClusterClient;
use crate::CoordinationService;
use crate::EmbeddedCoordinator;
use crate::InProcessMaster;
use crate::InProcessWorker;
use crate::LatchRegistry;
use crate::Master;
use crate::MasterSpec;
use crate::QuorumAddress;
use crate::QuorumClient;
use crate::Result;
use crate::Worker;
use crate::WorkerSpec;

const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(1);

/// Builds every component inside the current process.
///
/// Masters find their coordination service through the shared [`LatchRegistry`],
/// so a master can only be created after the coordinator it names has started.
#[derive(Debug, Clone)]
pub struct InProcessFactory {
    registry: LatchRegistry,
    client_timeout: Duration,
}

impl Default for InProcessFactory {
    fn default() -> Self {
        Self {
            registry: LatchRegistry::new(),
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

impl InProcessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe timeout of the clients this factory creates
    pub fn with_client_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.client_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &LatchRegistry {
        &self.registry
    }
}

#[async_trait]
impl ComponentFactory for InProcessFactory {
    fn create_coordination_service(&self) -> Result<Box<dyn CoordinationService>> {
        Ok(Box::new(EmbeddedCoordinator::new(self.registry.clone())))
    }

    async fn create_master(
        &self,
        spec: MasterSpec,
    ) -> Result<Arc<dyn Master>> {
        let latch = self.registry.connect(&spec.coordination_address)?;
        let master = InProcessMaster::create(spec, latch).await?;
        Ok(Arc::new(master))
    }

    async fn create_worker(
        &self,
        spec: WorkerSpec,
    ) -> Result<Arc<dyn Worker>> {
        let worker = InProcessWorker::create(spec).await?;
        Ok(Arc::new(worker))
    }

    fn create_client(
        &self,
        quorum: &QuorumAddress,
    ) -> Result<Arc<dyn ClusterClient>> {
        Ok(Arc::new(QuorumClient::new(quorum.clone(), self.client_timeout)))
    }
}
