use std::fmt;
use std::str::FromStr;

use crate::utils::net::host_port;
use crate::NetworkError;

/// Ordered list of every master replica address.
///
/// Rendered as `host:p0,host:p1,...` in replica index order so a consumer can try
/// each replica in turn until it finds the current leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumAddress {
    members: Vec<(String, u16)>,
}

impl QuorumAddress {
    pub fn new(
        host: &str,
        ports: &[u16],
    ) -> Self {
        Self {
            members: ports.iter().map(|p| (host.to_string(), *p)).collect(),
        }
    }

    /// `host:port` per replica
    pub fn addresses(&self) -> Vec<String> {
        self.members.iter().map(|(h, p)| host_port(h, *p)).collect()
    }

    pub fn ports(&self) -> Vec<u16> {
        self.members.iter().map(|(_, p)| *p).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Display for QuorumAddress {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.addresses().join(","))
    }
}

impl FromStr for QuorumAddress {
    type Err = NetworkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut members = Vec::new();
        for member in s.split(',').map(str::trim).filter(|m| !m.is_empty()) {
            let (host, port) = member
                .rsplit_once(':')
                .ok_or_else(|| NetworkError::InvalidQuorum(s.to_string()))?;
            let port = port
                .parse::<u16>()
                .map_err(|_| NetworkError::InvalidQuorum(s.to_string()))?;
            if host.is_empty() {
                return Err(NetworkError::InvalidQuorum(s.to_string()));
            }
            let host = host.trim_start_matches('[').trim_end_matches(']');
            members.push((host.to_string(), port));
        }
        if members.is_empty() {
            return Err(NetworkError::InvalidQuorum(s.to_string()));
        }
        Ok(Self { members })
    }
}
