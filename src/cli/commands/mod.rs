//! CLI command implementations.

pub mod indicators;
pub mod replay;
pub mod validate;
