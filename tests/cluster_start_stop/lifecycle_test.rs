use std::net::TcpListener;

use minicluster::ConfigKey;
use minicluster::ConfigurationInjector;
use minicluster::ClusterState;
use minicluster::LocalCluster;
use serial_test::serial;
use tracing_test::traced_test;

use crate::common::test_config;
use crate::common::wait_for_leader;
use crate::common::wait_for_registration;

/// Start 3 masters and a worker, check that exactly one master leads and the
/// worker found it, then stop and check nothing is left behind.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
#[traced_test]
async fn test_3_master_cluster_start_stop() {
    let mut cluster = LocalCluster::new(test_config(3)).unwrap();
    cluster.start().await.unwrap();
    assert_eq!(cluster.state(), ClusterState::Running);

    let home = cluster.home().to_path_buf();
    for dir in ["journal/0", "journal/1", "journal/2", "data", "logs", "underfs/data", "underfs/workers", "ramdisk"] {
        assert!(home.join(dir).is_dir(), "{dir} missing");
    }
    assert!(cluster.image_path().is_file());

    let leader = wait_for_leader(&cluster).await.expect("no leader elected");
    let leaders = (0..3)
        .filter(|i| cluster.master_info(*i).unwrap().is_leader())
        .count();
    assert_eq!(leaders, 1);

    let leader_info = cluster.master_info(leader).unwrap();
    assert!(leader_info.journal_dir.join("log.data").is_file());
    assert!(wait_for_registration(&cluster, &leader_info.address).await);

    let client = cluster.get_client().unwrap();
    assert_eq!(client.leader_address().await.unwrap(), leader_info.address);

    let master_ports = cluster.master_ports().to_vec();
    let report = cluster.stop().await.unwrap();
    assert!(report.is_clean(), "{:?}", report.warnings);
    assert_eq!(cluster.state(), ClusterState::Stopped);
    assert!(client.is_closed());

    for key in ConfigKey::ALL {
        assert_eq!(ConfigurationInjector::lookup(key), None);
    }
    for port in master_ports {
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok(), "port {port} still bound");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_cluster_can_be_recreated_on_same_ports() {
    let config = test_config(2);

    for _ in 0..2 {
        let mut cluster = LocalCluster::new(config.clone()).unwrap();
        cluster.start().await.unwrap();
        assert!(wait_for_leader(&cluster).await.is_some());
        assert!(cluster.stop().await.unwrap().is_clean());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_every_client_is_closed_on_stop() {
    let mut cluster = LocalCluster::new(test_config(1)).unwrap();
    cluster.start().await.unwrap();

    let clients: Vec<_> = (0..3).map(|_| cluster.get_client().unwrap()).collect();
    // A client the test already closed is reported, not fatal
    clients[1].close().unwrap();

    let report = cluster.stop().await.unwrap();

    assert!(clients.iter().all(|c| c.is_closed()));
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].component, "client-1");
}
