//! CLI command implementations.

pub mod backend;
pub mod common;
pub mod compile;
pub mod version;
pub mod weyl;
