//! Helpers shared by the unit tests of this crate.
mod common;

pub use common::*;
