use crate::constants::MASTER_PORT_STRIDE;
use crate::ClusterConfig;
use crate::Error;
use crate::QuorumAddress;
use crate::Result;

/// Derives the deterministic port set of a cluster.
pub struct PortAllocator;

impl PortAllocator {
    /// `base_port + i * 10` for `i` in `[0, masters)`.
    pub fn master_ports(
        base_port: u16,
        masters: usize,
    ) -> Result<Vec<u16>> {
        if masters == 0 {
            return Err(Error::InvalidConfig("masters must be at least 1".into()));
        }
        (0..masters)
            .map(|i| {
                u16::try_from(i)
                    .ok()
                    .and_then(|i| i.checked_mul(MASTER_PORT_STRIDE))
                    .and_then(|offset| base_port.checked_add(offset))
                    .ok_or_else(|| {
                        Error::InvalidConfig(format!(
                            "master {i} port overflows from base {base_port}"
                        ))
                    })
            })
            .collect()
    }

    pub fn resolve(
        config: &ClusterConfig,
        hostname: impl Into<String>,
    ) -> Result<ResolvedTopology> {
        config.validate()?;
        let master_ports = Self::master_ports(config.master_base_port, config.masters)?;
        Ok(ResolvedTopology {
            master_ports,
            worker_port: config.worker_base_port,
            worker_data_port: config.worker_base_port + 1,
            hostname: hostname.into(),
        })
    }
}

/// Ports and host of a started cluster. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTopology {
    master_ports: Vec<u16>,
    worker_port: u16,
    worker_data_port: u16,
    hostname: String,
}

impl ResolvedTopology {
    /// Ordered by replica index
    pub fn master_ports(&self) -> &[u16] {
        &self.master_ports
    }

    pub fn master_web_ports(&self) -> Vec<u16> {
        self.master_ports.iter().map(|p| p + 1).collect()
    }

    pub fn worker_port(&self) -> u16 {
        self.worker_port
    }

    pub fn worker_data_port(&self) -> u16 {
        self.worker_data_port
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn quorum_address(&self) -> QuorumAddress {
        QuorumAddress::new(&self.hostname, &self.master_ports)
    }
}
