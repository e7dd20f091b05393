use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::warn;

use super::ClusterClient;
use crate::metrics::CLIENT_CLOSE_TOTAL;
use crate::CleanupWarning;

/// Every client handle given out for one cluster, in creation order.
///
/// A single lock guards both registration and [`close_all`](Self::close_all).
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<Vec<Arc<dyn ClusterClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        client: Arc<dyn ClusterClient>,
    ) -> Arc<dyn ClusterClient> {
        self.clients.lock().push(client.clone());
        client
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// Closes every registered client once, in registration order, and forgets
    /// them. A client that fails to close is reported and skipped.
    pub fn close_all(&self) -> Vec<CleanupWarning> {
        let mut clients = self.clients.lock();
        let mut warnings = Vec::new();

        for (i, client) in clients.drain(..).enumerate() {
            match client.close() {
                Ok(()) => {
                    CLIENT_CLOSE_TOTAL.with_label_values(&["closed"]).inc();
                    debug!("client-{} closed", i);
                }
                Err(e) => {
                    CLIENT_CLOSE_TOTAL.with_label_values(&["failed"]).inc();
                    let warning = CleanupWarning::new(format!("client-{i}"), e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }
        warnings
    }
}
