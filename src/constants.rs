// -
// Ports

pub const DEFAULT_MASTER_PORT: u16 = 19998;
pub const DEFAULT_WORKER_PORT: u16 = 29998;

/// Local clusters are shifted away from the production defaults.
pub const LOCAL_CLUSTER_PORT_OFFSET: u16 = 1000;

/// Distance between consecutive master replicas. Each replica uses `port` and
/// `port + 1`, the rest is headroom.
pub const MASTER_PORT_STRIDE: u16 = 10;

// -
// Filesystem layout

pub const HOME_DIR_PREFIX: &str = "minicluster-";
pub const HOME_DIR_SUFFIX: &str = "-UnitTest";
pub const JOURNAL_DIR: &str = "journal";
pub const DATA_DIR: &str = "data";
pub const LOGS_DIR: &str = "logs";
pub const UNDERFS_DIR: &str = "underfs";
pub const RAMDISK_DIR: &str = "ramdisk";

pub const UNDERFS_DATA_DIR: &str = "data";
pub const UNDERFS_WORKERS_DIR: &str = "workers";

pub const EDIT_LOG_FILE: &str = "log.data";
pub const IMAGE_FILE: &str = "image.data";

// -
// Health services

/// Reported SERVING only by the replica that currently holds leadership.
pub const LEADER_SERVICE: &str = "minicluster.master.leader";

/// Whole-server health, SERVING once listeners are up.
pub const SERVER_SERVICE: &str = "";
