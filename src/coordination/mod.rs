//! Ephemeral coordination service used by master replicas for leader election.
//!
//! The service must be reachable before the first master is created and stays up
//! for the whole life of the cluster.

mod embedded;
mod latch;

pub use embedded::*;
pub use latch::*;


#[cfg(test)]
use mockall::automock;
use tonic::async_trait;
use tracing::debug;
use tracing::info;

use crate::ComponentFactory;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationService: Send + Sync + 'static {
    /// Starts the ensemble and returns its connect address
    async fn start(&mut self) -> Result<String>;

    async fn stop(&mut self) -> Result<()>;
}

/// Owns the lifecycle of one coordination service instance.
#[derive(Default)]
pub struct CoordinationServiceHandle {
    service: Option<Box<dyn CoordinationService>>,
    address: Option<String>,
}

impl CoordinationServiceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and starts the service. The instance is kept even when starting
    /// it fails, so a later [`stop`](Self::stop) can release whatever it holds.
    pub async fn start(
        &mut self,
        factory: &dyn ComponentFactory,
    ) -> Result<String> {
        let mut service = factory.create_coordination_service()?;
        let result = service.start().await;
        self.service = Some(service);

        let address = result?;
        info!("coordination service listening on {}", address);
        self.address = Some(address.clone());
        Ok(address)
    }

    /// No-op unless [`start`](Self::start) was attempted.
    pub async fn stop(&mut self) -> Result<()> {
        self.address = None;
        match self.service.take() {
            Some(mut service) => {
                debug!("stopping coordination service");
                service.stop().await
            }
            None => Ok(()),
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_attempted(&self) -> bool {
        self.service.is_some()
    }
}
