//! Probes used to address the running components: gRPC health checks, leader
//! discovery over the quorum address, and TCP readiness polling.

mod health;

pub use health::check_service_is_serving;
pub(crate) use health::spawn_health_server;


use std::time::Duration;

use tokio::time;
use tracing::debug;

use crate::constants::LEADER_SERVICE;
use crate::utils::net::is_server_ready;
use crate::ComponentStartError;
use crate::NetworkError;
use crate::QuorumAddress;
use crate::Result;

/// Tries every replica in quorum order and returns the address of the first one
/// whose leader service reports SERVING.
pub async fn find_leader(
    quorum: &QuorumAddress,
    timeout: Duration,
) -> Result<String> {
    for addr in quorum.addresses() {
        match check_service_is_serving(&addr, LEADER_SERVICE, timeout).await {
            Ok(()) => return Ok(addr),
            Err(e) => debug!(%addr, "not leader: {}", e),
        }
    }
    Err(NetworkError::NoLeader(quorum.to_string()).into())
}

/// Polls `addr` until it accepts TCP connections or `timeout` elapses.
pub async fn wait_until_ready(
    component: &str,
    addr: &str,
    timeout: Duration,
) -> Result<()> {
    let retry_interval = Duration::from_millis(50);

    let result = time::timeout(timeout, async {
        loop {
            if is_server_ready(addr).await {
                return;
            }
            debug!("{}({}) not ready, retrying...", component, addr);
            time::sleep(retry_interval).await;
        }
    })
    .await;

    result.map_err(|_| {
        ComponentStartError::NotReady {
            component: component.to_string(),
            addr: addr.to_string(),
            timeout,
        }
        .into()
    })
}
