//! Prometheus metrics of the local cluster, served by every master on
//! `GET /metrics`.


use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::error;

lazy_static! {
    pub static ref LIFECYCLE_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("lifecycle_events", "Cluster start/stop transitions"),
        &["event"]
    )
    .expect("metric can not be created");

    pub static ref RUNNING_COMPONENTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("running_components", "Components currently running"),
        &["component"]
    )
    .expect("metric can not be created");

    pub static ref CLIENT_CLOSE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("client_close_total", "Client handles closed at teardown"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref LEADERSHIP_CHANGES: IntCounterVec = IntCounterVec::new(
        Opts::new("leadership_changes", "Times a master replica gained leadership"),
        &["master"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

/// Registers every collector of this module into `registry`.
pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(LIFECYCLE_EVENTS.clone()))?;
    registry.register(Box::new(RUNNING_COMPONENTS.clone()))?;
    registry.register(Box::new(CLIENT_CLOSE_TOTAL.clone()))?;
    registry.register(Box::new(LEADERSHIP_CHANGES.clone()))?;
    Ok(())
}

/// Text exposition of [`REGISTRY`]
pub fn gather_text() -> String {
    REGISTER.call_once(|| {
        if let Err(e) = register_custom_metrics(&REGISTRY) {
            error!("could not register custom metrics: {}", e);
        }
    });

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}
