use std::path::PathBuf;

use serial_test::serial;
use temp_env::with_vars;

use super::*;
use crate::Error;

fn cleanup_all_minicluster_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("MINICLUSTER__") {
            std::env::remove_var(&key);
        }
    }
}

#[test]
fn default_cluster_config_should_use_local_ports() {
    let config = ClusterConfig::default();

    assert_eq!(config.master_base_port, 18998);
    assert_eq!(config.worker_base_port, 28998);
    assert_eq!(config.masters, 3);
    assert_eq!(config.hostname, "localhost");
    assert_eq!(config.readiness_timeout_ms, Some(5000));
    assert!(config.validate().is_ok());
}

#[test]
fn validate_should_reject_zero_masters() {
    let config = ClusterConfig::with_ports(19990, 29990, 100, 0);
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn validate_should_reject_zero_capacity() {
    let config = ClusterConfig::with_ports(19990, 29990, 0, 3);
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn validate_should_reject_port_overflow() {
    // 65530 + 10 overflows
    let config = ClusterConfig::with_ports(65530, 29990, 100, 2);
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

    // Web port of the last replica must fit too
    let config = ClusterConfig::with_ports(65535, 29990, 100, 1);
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

    let config = ClusterConfig::with_ports(19990, u16::MAX, 100, 1);
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn validate_should_reject_overlapping_worker_and_master_ports() {
    let config = ClusterConfig::with_ports(19990, 20010, 100, 3);
    match config.validate() {
        Err(Error::InvalidConfig(msg)) => assert!(msg.contains("20010"), "{msg}"),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }

    assert!(ClusterConfig::with_ports(19990, 20020, 100, 3).validate().is_ok());
}

#[test]
fn from_file_should_fill_missing_fields_with_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("cluster.toml");
    std::fs::write(
        &config_path,
        r#"
        master_base_port = 19990
        worker_base_port = 29990
        masters = 5
        readiness_timeout_ms = 100
        "#,
    )
    .unwrap();

    let config = ClusterConfig::from_file(&config_path).unwrap();

    assert_eq!(config.master_base_port, 19990);
    assert_eq!(config.masters, 5);
    assert_eq!(config.readiness_timeout_ms, Some(100));
    assert_eq!(config.worker_capacity_bytes, 100 * 1024 * 1024);
    assert_eq!(config.settle_delay_ms, 10);
}

#[test]
fn from_file_should_validate() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("cluster.toml");
    std::fs::write(&config_path, "masters = 0\n").unwrap();

    assert!(matches!(
        ClusterConfig::from_file(&config_path),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn from_file_should_fail_on_missing_file() {
    let result = ClusterConfig::from_file("/nonexistent/cluster.toml");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn settings_load_should_return_defaults_when_unset() {
    cleanup_all_minicluster_env_vars();
    let settings = Settings::load().unwrap();

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.master.port, 19998);
    assert_eq!(settings.worker.data_port, 29999);
}

#[test]
#[serial]
fn settings_load_should_read_environment() {
    cleanup_all_minicluster_env_vars();
    with_vars(
        vec![
            ("MINICLUSTER__UNDERFS__ADDRESS", Some("/tmp/x/underfs")),
            ("MINICLUSTER__MASTER__WEB_PORT", Some("20001")),
            ("MINICLUSTER__WORKER__MEMORY_SIZE", Some("100")),
        ],
        || {
            let settings = Settings::load().unwrap();

            assert_eq!(settings.underfs.address, PathBuf::from("/tmp/x/underfs"));
            assert_eq!(settings.underfs.data_folder(), PathBuf::from("/tmp/x/underfs/data"));
            assert_eq!(settings.underfs.workers_folder(), PathBuf::from("/tmp/x/underfs/workers"));
            assert_eq!(settings.master.web_port, 20001);
            assert_eq!(settings.worker.memory_size, 100);
            assert_eq!(settings.master.port, 19998);
        },
    );
}

#[test]
#[serial]
fn settings_load_should_reject_bad_port() {
    cleanup_all_minicluster_env_vars();
    with_vars(vec![("MINICLUSTER__MASTER__PORT", Some("not-a-port"))], || {
        assert!(matches!(Settings::load(), Err(Error::Config(_))));
    });
}
