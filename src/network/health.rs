use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;
use tonic::transport::Server;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tonic_health::server::HealthReporter;
use tracing::debug;

use crate::NetworkError;
use crate::Result;

/// Serves the gRPC health protocol on an already bound listener until `shutdown`
/// fires. The whole-server service starts as SERVING.
pub(crate) fn spawn_health_server(
    listener: TcpListener,
    mut shutdown: watch::Receiver<()>,
) -> (
    HealthReporter,
    JoinHandle<std::result::Result<(), tonic::transport::Error>>,
) {
    let (reporter, service) = tonic_health::server::health_reporter();
    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                let _ = shutdown.changed().await;
            })
            .await
    });
    (reporter, handle)
}

pub(crate) struct HealthChecker {
    client: HealthClient<Channel>,
}

impl HealthChecker {
    /// addr: "127.0.0.1:19990"
    pub(crate) async fn connect(
        addr: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let uri = format!("http://{addr}");
        let channel = Channel::from_shared(uri.clone())
            .map_err(|_| NetworkError::InvalidURI(uri))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect()
            .await
            .map_err(|err| {
                debug!("connect to {} failed: {}", addr, err);
                NetworkError::ConnectError(addr.to_string())
            })?;

        Ok(Self {
            client: HealthClient::new(channel),
        })
    }

    /// Ok only when `service` reports SERVING
    pub(crate) async fn check_serving(
        &mut self,
        service: &str,
    ) -> Result<()> {
        let response = self
            .client
            .check(tonic::Request::new(HealthCheckRequest {
                service: service.to_string(),
            }))
            .await
            .map_err(|status| NetworkError::ServiceUnavailable(status.message().to_string()))?
            .into_inner();

        if response.status == ServingStatus::Serving as i32 {
            Ok(())
        } else {
            Err(NetworkError::ServiceUnavailable(format!("{service} is not serving")).into())
        }
    }
}

/// One-shot probe of a named health service.
pub async fn check_service_is_serving(
    addr: &str,
    service: &str,
    timeout: Duration,
) -> Result<()> {
    let mut checker = HealthChecker::connect(addr, timeout).await?;
    checker.check_serving(service).await
}
