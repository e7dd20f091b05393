//! Mini-cluster Error Hierarchy
//!
//! Defines the error types surfaced by the cluster lifecycle, categorized by the
//! stage that produced them. Fatal start errors propagate synchronously; teardown
//! problems are collected as [`CleanupWarning`]s instead of errors.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::ClusterState;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Directory creation failures
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// Ephemeral coordination service failures
    #[error(transparent)]
    Coordination(#[from] CoordinationServiceError),

    /// Master replica or worker failed to bind or initialize
    #[error(transparent)]
    ComponentStart(#[from] ComponentStartError),

    /// Lifecycle method invoked from an invalid state
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Configuration source failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Probe and leader discovery failures
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Client handle failures
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to make folder: {}", .path.display())]
pub struct ProvisioningError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinationServiceError {
    /// No free port could be bound for the ensemble
    #[error("Coordination service failed to bind: {source}")]
    Bind {
        #[source]
        source: std::io::Error,
    },

    /// A master asked for an ensemble that is not running
    #[error("Coordination service unreachable at {0}")]
    Unreachable(String),

    #[error("Coordination service is not started")]
    NotStarted,

    #[error("Coordination service task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum ComponentStartError {
    /// Listener could not be bound
    #[error("{component} failed to bind {addr}: {source}")]
    Bind {
        component: String,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Component-specific initialization failure
    #[error("{component} failed to initialize: {reason}")]
    Init { component: String, reason: String },

    /// Readiness probe did not succeed in time
    #[error("{component} at {addr} did not become ready within {timeout:?}")]
    NotReady {
        component: String,
        addr: String,
        timeout: Duration,
    },

    /// Host name could not be resolved to an address
    #[error("Failed to resolve host {host}: {reason}")]
    Resolve { host: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("{operation}() is not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ClusterState,
    },

    #[error("Master index {index} out of range (masters = {masters})")]
    NoSuchMaster { index: usize, masters: usize },

    #[error("No master currently holds leadership")]
    NoLeader,
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid URI format: {0}")]
    InvalidURI(String),

    #[error("Socket connect failed error: {0}")]
    ConnectError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("No leader found among {0}")]
    NoLeader(String),

    #[error("Invalid quorum address: {0}")]
    InvalidQuorum(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Client is closed")]
    Closed,

    #[error("Client was already closed")]
    AlreadyClosed,
}

/// A teardown step that did not complete cleanly. Logged and collected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub component: String,
    pub message: String,
}

impl CleanupWarning {
    pub fn new(
        component: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self {
            component: component.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for CleanupWarning {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.message)
    }
}
