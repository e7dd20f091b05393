use std::net::IpAddr;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::net::TcpStream;

use crate::ComponentStartError;
use crate::Result;

pub(crate) async fn is_server_ready(addr: &str) -> bool {
    TcpStream::connect(addr).await.is_ok()
}

/// `host:port`, with IPv6 literals bracketed so the result is a valid authority.
pub fn host_port(
    host: &str,
    port: u16,
) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{host}:{port}"),
    }
}

/// accept ip either like 127.0.0.1 or host name: node1. IPv4 wins over IPv6.
pub async fn canonical_host(host: &str) -> Result<String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    let addrs: Vec<_> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| ComponentStartError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| a.ip().to_string())
        .ok_or_else(|| {
            ComponentStartError::Resolve {
                host: host.to_string(),
                reason: "no address found".to_string(),
            }
            .into()
        })
}

/// Binds `host:port`, reporting failures against `component`.
pub(crate) async fn bind(
    component: &str,
    host: &str,
    port: u16,
) -> Result<TcpListener> {
    TcpListener::bind((host, port)).await.map_err(|source| {
        ComponentStartError::Bind {
            component: component.to_string(),
            addr: host_port(host, port)
                .parse()
                .unwrap_or_else(|_| ([127, 0, 0, 1], port).into()),
            source,
        }
        .into()
    })
}
