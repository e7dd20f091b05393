use std::net::TcpListener;
use std::time::Duration;

use minicluster::constants::MASTER_PORT_STRIDE;
use minicluster::ClusterConfig;
use minicluster::LocalCluster;
use rand::Rng;
use tokio::time;
use tracing::debug;

pub const WAIT_FOR_LEADER: Duration = Duration::from_secs(5);

fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Base ports for `masters` replicas and one worker, all free right now.
pub fn get_available_base_ports(masters: usize) -> (u16, u16) {
    let mut rng = rand::thread_rng();
    let master_base = loop {
        let base: u16 = rng.gen_range(20000..39000);
        let free = (0..masters as u16).all(|i| {
            let port = base + i * MASTER_PORT_STRIDE;
            is_port_free(port) && is_port_free(port + 1)
        });
        if free {
            break base;
        }
    };
    let worker_base = loop {
        let port: u16 = rng.gen_range(40000..60000);
        if is_port_free(port) && is_port_free(port + 1) {
            break port;
        }
    };
    (master_base, worker_base)
}

pub fn test_config(masters: usize) -> ClusterConfig {
    let (master_base, worker_base) = get_available_base_ports(masters);
    ClusterConfig {
        hostname: "127.0.0.1".to_string(),
        heartbeat_interval_ms: 50,
        ..ClusterConfig::with_ports(master_base, worker_base, 1024 * 1024, masters)
    }
}

/// Polls until some replica reports leadership.
pub async fn wait_for_leader(cluster: &LocalCluster) -> Option<usize> {
    time::timeout(WAIT_FOR_LEADER, async {
        loop {
            if let Some(leader) = cluster.leader_index() {
                return leader;
            }
            debug!("no leader yet, retrying...");
            time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .ok()
}

/// Polls until the worker has registered with `master_addr`.
pub async fn wait_for_registration(
    cluster: &LocalCluster,
    master_addr: &str,
) -> bool {
    let Some(worker) = cluster.worker_service() else {
        return false;
    };
    time::timeout(WAIT_FOR_LEADER, async {
        while worker.info().registered_master.as_deref() != Some(master_addr) {
            time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}
