use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use tonic::async_trait;
use tracing::debug;

use super::ClusterClient;
use crate::constants::LEADER_SERVICE;
use crate::network::check_service_is_serving;
use crate::network::find_leader;
use crate::ClientError;
use crate::QuorumAddress;
use crate::Result;

/// Lazy client over a [`QuorumAddress`].
///
/// Nothing is connected at construction. The leader is discovered on first use and
/// cached; a cached leader that no longer reports leadership triggers a fresh
/// discovery.
pub struct QuorumClient {
    quorum: QuorumAddress,
    timeout: Duration,
    closed: AtomicBool,
    leader: Mutex<Option<String>>,
}

impl QuorumClient {
    pub fn new(
        quorum: QuorumAddress,
        timeout: Duration,
    ) -> Self {
        Self {
            quorum,
            timeout,
            closed: AtomicBool::new(false),
            leader: Mutex::new(None),
        }
    }

    pub fn quorum(&self) -> &QuorumAddress {
        &self.quorum
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for QuorumClient {
    async fn leader_address(&self) -> Result<String> {
        self.ensure_open()?;

        let cached = self.leader.lock().clone();
        if let Some(leader) = cached {
            if check_service_is_serving(&leader, LEADER_SERVICE, self.timeout).await.is_ok() {
                return Ok(leader);
            }
            debug!("cached leader {} is stale", leader);
        }

        let leader = find_leader(&self.quorum, self.timeout).await?;
        *self.leader.lock() = Some(leader.clone());
        Ok(leader)
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ClientError::AlreadyClosed.into());
        }
        self.leader.lock().take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
