//! Deterministic resources of a cluster instance: ports, quorum address and the
//! on-disk layout.

mod layout;
mod ports;
mod quorum;

pub use layout::*;
pub use ports::*;
pub use quorum::*;
