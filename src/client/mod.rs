//! Client handles handed out to test code.
//!
//! A client is addressed at the whole master quorum and discovers the leader on
//! demand, so it keeps working across a failover. Every handle produced through
//! the cluster is tracked by a [`ClientRegistry`] and closed exactly once on
//! teardown.
//!
//! # Basic Usage
//! ```no_run
//! use minicluster::{ClusterConfig, LocalCluster};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut cluster = LocalCluster::new(ClusterConfig::new(100, 3)).unwrap();
//!     cluster.start().await.unwrap();
//!
//!     let client = cluster.get_client().unwrap();
//!     let leader = client.leader_address().await.unwrap();
//!     println!("leader is {leader}");
//!
//!     cluster.stop().await.unwrap();
//! }
//! ```

mod quorum_client;
mod registry;

pub use quorum_client::*;
pub use registry::*;

#[cfg(test)]
mod registry_test;

#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    /// Address of the replica currently holding leadership
    async fn leader_address(&self) -> Result<String>;

    /// Releases the handle. Closing twice reports [`crate::ClientError::AlreadyClosed`].
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}
