use std::path::PathBuf;
use std::sync::Arc;

use serial_test::serial;
use tracing_test::traced_test;

use super::*;
use crate::ClientError;
use crate::ClusterConfig;
use crate::ConfigKey;
use crate::ConfigurationInjector;
use crate::CoordinationServiceError;
use crate::Error;
use crate::MasterInfo;
use crate::MasterRole;
use crate::MockClusterClient;
use crate::MockCoordinationService;
use crate::MockMaster;
use crate::MockWorker;
use crate::UsageError;
use crate::WorkerInfo;

const COORDINATION_ADDRESS: &str = "127.0.0.1:2181";

fn test_config() -> ClusterConfig {
    ClusterConfig {
        hostname: "127.0.0.1".to_string(),
        readiness_timeout_ms: None,
        ..ClusterConfig::with_ports(19990, 29990, 100, 3)
    }
}

fn test_home() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("cluster");
    (dir, home)
}

fn mock_coordination() -> Box<dyn crate::CoordinationService> {
    let mut service = MockCoordinationService::new();
    service
        .expect_start()
        .times(1)
        .returning(|| Ok(COORDINATION_ADDRESS.to_string()));
    service.expect_stop().times(1).returning(|| Ok(()));
    Box::new(service)
}

fn mock_master(
    index: usize,
    role: MasterRole,
) -> Arc<dyn crate::Master> {
    let mut master = MockMaster::new();
    master.expect_serve().returning(|_| Ok(()));
    master.expect_info().returning(move || MasterInfo {
        index,
        address: format!("127.0.0.1:{}", 19990 + index * 10),
        port: 19990 + (index as u16) * 10,
        web_port: 19991 + (index as u16) * 10,
        role,
        journal_dir: PathBuf::from(format!("/journal/{index}")),
        leader_terms: u64::from(role == MasterRole::Leader),
    });
    Arc::new(master)
}

fn mock_worker() -> Arc<dyn crate::Worker> {
    let mut worker = MockWorker::new();
    worker.expect_serve().returning(|_| Ok(()));
    worker.expect_info().returning(|| WorkerInfo {
        address: "127.0.0.1:29990".to_string(),
        port: 29990,
        data_port: 29991,
        data_folder: PathBuf::from("/ramdisk"),
        capacity_bytes: 100,
        registered_master: None,
    });
    Arc::new(worker)
}

/// Factory whose masters report replica `leader` as leader.
fn healthy_factory(leader: usize) -> MockComponentFactory {
    let mut factory = MockComponentFactory::new();
    factory
        .expect_create_coordination_service()
        .times(1)
        .returning(|| Ok(mock_coordination()));
    factory
        .expect_create_master()
        .withf(|spec| spec.coordination_address == COORDINATION_ADDRESS)
        .times(3)
        .returning(move |spec| {
            let role = if spec.index == leader {
                MasterRole::Leader
            } else {
                MasterRole::Standby
            };
            Ok(mock_master(spec.index, role))
        });
    factory
        .expect_create_worker()
        .withf(|spec| spec.quorum.ports() == vec![19990, 20000, 20010] && spec.port == 29990)
        .times(1)
        .returning(|_| Ok(mock_worker()));
    factory
}

#[tokio::test]
#[serial]
async fn test_start_then_stop() {
    let (_dir, home) = test_home();
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(healthy_factory(0)))
        .unwrap()
        .with_home(&home);
    assert_eq!(cluster.state(), ClusterState::Created);

    cluster.start().await.unwrap();

    assert_eq!(cluster.state(), ClusterState::Running);
    assert_eq!(cluster.master_ports(), &[19990, 20000, 20010]);
    assert_eq!(cluster.worker_port(), Some(29990));
    assert_eq!(cluster.home(), home.as_path());
    assert!(home.join("journal").join("2").is_dir());
    assert!(home.join("underfs").join("data").is_dir());
    assert!(home.join("underfs").join("workers").is_dir());
    assert_eq!(cluster.temp_folder_in_underfs().unwrap(), home.join("underfs"));
    assert_eq!(cluster.edit_log_path(), home.join("journal/0/log.data"));
    assert_eq!(cluster.image_path(), home.join("journal/0/image.data"));
    assert_eq!(cluster.leader_index(), Some(0));
    assert_eq!(cluster.worker_service().unwrap().info().port, 29990);

    let report = cluster.stop().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(cluster.state(), ClusterState::Stopped);
}

#[tokio::test]
#[serial]
async fn test_start_twice_is_usage_error_without_side_effects() {
    let (_dir, home) = test_home();
    // times() on every expectation fails the test if anything is created twice
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(healthy_factory(0)))
        .unwrap()
        .with_home(&home);
    cluster.start().await.unwrap();
    let entries_before = std::fs::read_dir(&home).unwrap().count();

    let second = cluster.start().await;

    assert!(matches!(
        second,
        Err(Error::Usage(UsageError::InvalidState {
            operation: "start",
            state: ClusterState::Running,
        }))
    ));
    assert_eq!(std::fs::read_dir(&home).unwrap().count(), entries_before);
    assert_eq!(cluster.state(), ClusterState::Running);

    cluster.stop().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_every_client_closed_exactly_once() {
    let (_dir, home) = test_home();
    let mut factory = healthy_factory(0);
    factory.expect_create_client().times(4).returning(|_| {
        let mut client = MockClusterClient::new();
        client.expect_close().times(1).returning(|| Ok(()));
        Ok(Arc::new(client))
    });
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(factory))
        .unwrap()
        .with_home(&home);
    cluster.start().await.unwrap();

    for _ in 0..4 {
        cluster.get_client().unwrap();
    }

    let report = cluster.stop().await.unwrap();
    assert!(report.is_clean());
}

#[tokio::test]
#[serial]
#[traced_test]
async fn test_client_close_failure_is_a_warning() {
    let (_dir, home) = test_home();
    let mut factory = healthy_factory(0);
    factory.expect_create_client().times(1).returning(|_| {
        let mut client = MockClusterClient::new();
        client
            .expect_close()
            .times(1)
            .returning(|| Err(ClientError::AlreadyClosed.into()));
        Ok(Arc::new(client))
    });
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(factory))
        .unwrap()
        .with_home(&home);
    cluster.start().await.unwrap();
    cluster.get_client().unwrap();

    let report = cluster.stop().await.unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].component, "client-0");
    assert_eq!(cluster.state(), ClusterState::Stopped);
    assert!(logs_contain("client-0"));
}

#[tokio::test]
#[serial]
async fn test_stop_after_coordination_failure() {
    let (_dir, home) = test_home();
    let mut factory = MockComponentFactory::new();
    factory.expect_create_coordination_service().times(1).returning(|| {
        let mut service = MockCoordinationService::new();
        service
            .expect_start()
            .returning(|| Err(CoordinationServiceError::NotStarted.into()));
        service.expect_stop().times(1).returning(|| Ok(()));
        Ok(Box::new(service))
    });
    factory.expect_create_master().times(0);
    factory.expect_create_worker().times(0);
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(factory))
        .unwrap()
        .with_home(&home);

    let result = cluster.start().await;
    assert!(matches!(result, Err(Error::Coordination(_))));
    assert_eq!(cluster.state(), ClusterState::Starting);

    let report = cluster.stop().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(cluster.state(), ClusterState::Stopped);
    assert_eq!(ConfigurationInjector::lookup(ConfigKey::MasterPort), None);
}

#[tokio::test]
#[serial]
async fn test_stop_clears_configuration() {
    let (_dir, home) = test_home();
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(healthy_factory(0)))
        .unwrap()
        .with_home(&home);
    cluster.start().await.unwrap();

    assert_eq!(
        ConfigurationInjector::lookup(ConfigKey::MasterPort),
        Some("19990".to_string())
    );
    assert_eq!(
        ConfigurationInjector::lookup(ConfigKey::WorkerMemorySize),
        Some("100".to_string())
    );

    cluster.stop().await.unwrap();

    for key in ConfigKey::ALL {
        assert_eq!(ConfigurationInjector::lookup(key), None, "{key:?} still set");
    }
    let again = cluster.stop().await;
    assert!(matches!(
        again,
        Err(Error::Usage(UsageError::InvalidState { operation: "stop", .. }))
    ));
}

#[tokio::test]
#[serial]
async fn test_provisioning_failure_names_home() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("occupied");
    std::fs::write(&home, b"not a directory").unwrap();

    let mut factory = MockComponentFactory::new();
    factory.expect_create_coordination_service().times(0);
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(factory))
        .unwrap()
        .with_home(&home);

    match cluster.start().await {
        Err(Error::Provisioning(e)) => assert_eq!(e.path, home),
        other => panic!("expected provisioning error, got {other:?}"),
    }
    assert_eq!(ConfigurationInjector::lookup(ConfigKey::Home), None);

    cluster.stop().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_kill_leader_whichever_replica_leads() {
    let (_dir, home) = test_home();
    let mut cluster = LocalCluster::with_factory(test_config(), Arc::new(healthy_factory(2)))
        .unwrap()
        .with_home(&home);
    cluster.start().await.unwrap();

    assert_eq!(cluster.master_info(2).unwrap().role, MasterRole::Leader);
    assert_eq!(cluster.kill_leader().await.unwrap(), 2);
    assert_eq!(cluster.leader_index(), None);
    assert!(matches!(
        cluster.kill_leader().await,
        Err(Error::Usage(UsageError::NoLeader))
    ));

    let report = cluster.stop().await.unwrap();
    assert!(report.is_clean());
}

#[tokio::test]
#[serial]
async fn test_accessors_before_start() {
    let cluster = LocalCluster::with_factory(test_config(), Arc::new(MockComponentFactory::new())).unwrap();

    assert!(cluster.master_ports().is_empty());
    assert_eq!(cluster.worker_port(), None);
    assert!(cluster.worker_service().is_none());
    assert!(matches!(
        cluster.get_client(),
        Err(Error::Usage(UsageError::InvalidState {
            operation: "get_client",
            state: ClusterState::Created,
        }))
    ));
    assert!(matches!(
        cluster.master_info(5),
        Err(Error::Usage(UsageError::NoSuchMaster { index: 5, masters: 0 }))
    ));
}

#[test]
fn test_invalid_config_is_rejected_at_construction() {
    let config = ClusterConfig::with_ports(19990, 29990, 100, 0);
    let result = LocalCluster::with_factory(config, Arc::new(MockComponentFactory::new()));
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}
