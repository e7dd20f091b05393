use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::Worker;
use super::WorkerSpec;
use crate::metrics::RUNNING_COMPONENTS;
use crate::CleanupWarning;
use crate::ComponentFactory;
use crate::Result;

const COMPONENT: &str = "worker";

/// Owns the single worker of a cluster and the task it runs on.
#[derive(Default)]
pub struct WorkerProcess {
    worker: Option<Arc<dyn Worker>>,
    shutdown_tx: Option<watch::Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl WorkerProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the worker and launches it on its own task.
    pub async fn start(
        &mut self,
        factory: &dyn ComponentFactory,
        spec: WorkerSpec,
    ) -> Result<()> {
        let quorum = spec.quorum.to_string();
        let port = spec.port;
        let worker = factory.create_worker(spec).await.map_err(|e| {
            error!("worker failed to start: {}", e);
            e
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let task_worker = worker.clone();
        let handle = tokio::spawn(async move { task_worker.serve(shutdown_rx).await });
        RUNNING_COMPONENTS.with_label_values(&[COMPONENT]).inc();
        info!("worker launched on port {} with quorum {}", port, quorum);

        self.worker = Some(worker);
        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Halts the worker. No-op if it never started or was already stopped.
    pub async fn stop(&mut self) -> Option<CleanupWarning> {
        let handle = self.handle.take()?;
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        RUNNING_COMPONENTS.with_label_values(&[COMPONENT]).dec();

        match handle.await {
            Ok(Ok(())) => {
                debug!("worker stopped");
                None
            }
            Ok(Err(e)) => Some(CleanupWarning::new(COMPONENT, e)),
            Err(e) => Some(CleanupWarning::new(COMPONENT, e)),
        }
    }

    pub fn worker(&self) -> Option<Arc<dyn Worker>> {
        self.worker.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}
