//! Lifecycle of a local multi-master cluster.
//!
//! [`LocalCluster`] sequences the other components:
//!
//! ```text
//! start: provision -> inject -> coordination -> masters -> settle/ready -> worker
//! stop:  clients -> masters -> worker -> coordination -> clear injection
//! ```
//!
//! All external collaborators are created through a [`ComponentFactory`];
//! [`InProcessFactory`] is the default.

mod controller;
mod factory;

pub use controller::*;
pub use factory::*;

#[cfg(test)]
mod controller_test;

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::ClusterClient;
use crate::CoordinationService;
use crate::Master;
use crate::MasterSpec;
use crate::QuorumAddress;
use crate::Result;
use crate::Worker;
use crate::WorkerSpec;

/// Creates the collaborators of a cluster. Creating a master or worker binds its
/// listeners, so bind failures surface here.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ComponentFactory: Send + Sync + 'static {
    fn create_coordination_service(&self) -> Result<Box<dyn CoordinationService>>;

    async fn create_master(
        &self,
        spec: MasterSpec,
    ) -> Result<Arc<dyn Master>>;

    async fn create_worker(
        &self,
        spec: WorkerSpec,
    ) -> Result<Arc<dyn Worker>>;

    fn create_client(
        &self,
        quorum: &QuorumAddress,
    ) -> Result<Arc<dyn ClusterClient>>;
}
