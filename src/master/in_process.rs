//! A master replica that runs inside the test process.
//!
//! ## Listeners
//! - `port`: gRPC health. `minicluster.master.leader` is SERVING only while this
//!   replica holds leadership, which is how workers and clients find the leader.
//! - `port + 1`: web endpoint with `GET /status` (JSON) and `GET /metrics`.
//!
//! ## Election
//! Every heartbeat (plus jitter) the replica tries to acquire or renew the
//! coordination service latch. Gaining leadership appends a record to the journal
//! edit log.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::async_trait;
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;
use tracing::debug;
use tracing::info;
use tracing::warn;
use warp::Filter;

use super::Master;
use super::MasterInfo;
use super::MasterRole;
use super::MasterSpec;
use crate::constants::EDIT_LOG_FILE;
use crate::constants::IMAGE_FILE;
use crate::constants::LEADER_SERVICE;
use crate::metrics;
use crate::metrics::LEADERSHIP_CHANGES;
use crate::network::spawn_health_server;
use crate::utils::file_io;
use crate::utils::net::bind;
use crate::ComponentStartError;
use crate::LeaderLatch;
use crate::Result;
use crate::Settings;

/// Lease lifetime in heartbeats. A leader that misses this many renewals loses
/// the latch.
const LEASE_HEARTBEATS: u32 = 5;

#[derive(Debug)]
struct MasterState {
    index: usize,
    is_leader: AtomicBool,
    leader_terms: AtomicU64,
}

impl MasterState {
    fn role(&self) -> MasterRole {
        if self.is_leader.load(Ordering::Acquire) {
            MasterRole::Leader
        } else {
            MasterRole::Standby
        }
    }
}

#[derive(Debug, Serialize)]
struct MasterStatus {
    index: usize,
    role: MasterRole,
    leader_terms: u64,
}

pub struct InProcessMaster {
    spec: MasterSpec,
    latch: Arc<LeaderLatch>,
    state: Arc<MasterState>,
    rpc_listener: Mutex<Option<TcpListener>>,
    web_listener: Mutex<Option<TcpListener>>,
}

impl InProcessMaster {
    /// Binds both listeners and prepares the journal.
    ///
    /// Reads the process-wide [`Settings`]; the under-storage data folder they
    /// point at must already exist.
    pub async fn create(
        spec: MasterSpec,
        latch: Arc<LeaderLatch>,
    ) -> Result<Self> {
        let component = format!("master-{}", spec.index);

        let settings = Settings::load()?;
        let underfs_data = settings.underfs.data_folder();
        if !underfs_data.is_dir() {
            return Err(ComponentStartError::Init {
                component,
                reason: format!("under-storage data folder {} is missing", underfs_data.display()),
            }
            .into());
        }

        file_io::touch(&spec.journal_dir.join(IMAGE_FILE)).map_err(|e| ComponentStartError::Init {
            component: component.clone(),
            reason: e.to_string(),
        })?;

        let rpc_listener = bind(&component, &spec.hostname, spec.port).await?;
        let web_listener = bind(&component, &spec.hostname, spec.web_port).await?;
        debug!(
            "{} bound {}:{} and web port {}",
            component, spec.hostname, spec.port, spec.web_port
        );

        Ok(Self {
            state: Arc::new(MasterState {
                index: spec.index,
                is_leader: AtomicBool::new(false),
                leader_terms: AtomicU64::new(0),
            }),
            spec,
            latch,
            rpc_listener: Mutex::new(Some(rpc_listener)),
            web_listener: Mutex::new(Some(web_listener)),
        })
    }

    pub fn edit_log_path(&self) -> PathBuf {
        self.spec.journal_dir.join(EDIT_LOG_FILE)
    }

    fn participant(&self) -> u64 {
        self.spec.index as u64
    }

    fn lease_ttl(&self) -> Duration {
        self.spec.heartbeat_interval * LEASE_HEARTBEATS
    }

    async fn campaign(
        &self,
        reporter: &mut HealthReporter,
    ) {
        let acquired = self.latch.try_acquire(self.participant(), self.lease_ttl());
        let was_leader = self.state.is_leader.swap(acquired, Ordering::AcqRel);

        if acquired && !was_leader {
            let term = self.state.leader_terms.fetch_add(1, Ordering::AcqRel) + 1;
            info!("master-{} gained leadership (term {})", self.spec.index, term);
            LEADERSHIP_CHANGES.with_label_values(&[&self.spec.index.to_string()]).inc();
            reporter.set_service_status(LEADER_SERVICE, ServingStatus::Serving).await;

            let record = format!("leader index={} term={}", self.spec.index, term);
            if let Err(e) = file_io::append_line(&self.edit_log_path(), &record) {
                warn!("master-{} failed to append edit log: {}", self.spec.index, e);
            }
        } else if !acquired && was_leader {
            info!("master-{} lost leadership", self.spec.index);
            reporter.set_service_status(LEADER_SERVICE, ServingStatus::NotServing).await;
        }
    }

    async fn run_election(
        &self,
        mut shutdown: watch::Receiver<()>,
        mut reporter: HealthReporter,
    ) {
        reporter.set_service_status(LEADER_SERVICE, ServingStatus::NotServing).await;

        let heartbeat = self.spec.heartbeat_interval;
        loop {
            self.campaign(&mut reporter).await;

            let jitter_ms = rand::thread_rng().gen_range(0..=(heartbeat.as_millis() as u64 / 2));
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(heartbeat + Duration::from_millis(jitter_ms)) => {}
            }
        }

        self.latch.release(self.participant());
        if self.state.is_leader.swap(false, Ordering::AcqRel) {
            info!("master-{} released leadership", self.spec.index);
        }
        reporter.set_service_status(LEADER_SERVICE, ServingStatus::NotServing).await;
    }
}

#[async_trait]
impl Master for InProcessMaster {
    async fn serve(
        &self,
        shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        let component = format!("master-{}", self.spec.index);
        let rpc_listener = self.rpc_listener.lock().take();
        let web_listener = self.web_listener.lock().take();
        let (Some(rpc_listener), Some(web_listener)) = (rpc_listener, web_listener) else {
            return Err(ComponentStartError::Init {
                component,
                reason: "replica was already served".to_string(),
            }
            .into());
        };

        let (reporter, rpc_handle) = spawn_health_server(rpc_listener, shutdown.clone());

        let state = self.state.clone();
        let status = warp::path!("status").map(move || {
            warp::reply::json(&MasterStatus {
                index: state.index,
                role: state.role(),
                leader_terms: state.leader_terms.load(Ordering::Acquire),
            })
        });
        let metrics_route = warp::path!("metrics").map(metrics::gather_text);
        let routes = warp::get().and(status.or(metrics_route));

        let mut web_shutdown = shutdown.clone();
        let web = warp::serve(routes).serve_incoming_with_graceful_shutdown(
            TcpListenerStream::new(web_listener),
            async move {
                let _ = web_shutdown.changed().await;
            },
        );

        tokio::join!(web, self.run_election(shutdown, reporter));

        match rpc_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{} rpc server stopped with error: {}", component, e),
            Err(e) => warn!("{} rpc server task failed: {}", component, e),
        }
        debug!("{} exited", component);
        Ok(())
    }

    fn info(&self) -> MasterInfo {
        MasterInfo {
            index: self.spec.index,
            address: self.spec.address(),
            port: self.spec.port,
            web_port: self.spec.web_port,
            role: self.state.role(),
            journal_dir: self.spec.journal_dir.clone(),
            leader_terms: self.state.leader_terms.load(Ordering::Acquire),
        }
    }
}
