use std::time::Duration;

use minicluster::LocalCluster;
use serial_test::serial;
use tracing::info;

use crate::common::test_config;
use crate::common::wait_for_leader;
use crate::common::wait_for_registration;

/// Kill the leader, check a standby takes over and that both the worker and a
/// client follow it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_3_master_failover() {
    let mut cluster = LocalCluster::new(test_config(3)).unwrap();
    cluster.start().await.unwrap();
    let client = cluster.get_client().unwrap();

    let old_leader = wait_for_leader(&cluster).await.expect("no leader elected");
    let killed = cluster.kill_leader().await.unwrap();
    assert_eq!(killed, old_leader);
    info!("killed master-{}", killed);

    let new_leader = wait_for_leader(&cluster).await.expect("no new leader elected");
    assert_ne!(new_leader, old_leader);

    let new_info = cluster.master_info(new_leader).unwrap();
    assert_eq!(new_info.leader_terms, 1);
    assert!(wait_for_registration(&cluster, &new_info.address).await);

    let leader_address = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(addr) = client.leader_address().await {
                if addr == new_info.address {
                    return addr;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(leader_address, new_info.address);

    let report = cluster.stop().await.unwrap();
    assert!(report.is_clean(), "{:?}", report.warnings);
}
