//! Core types and traits for the streaming indicator engine.
//!
//! This crate provides the foundational building blocks including:
//! - The error taxonomy shared by every graph node
//! - Node handles, sample validation and candle types
//! - The [`StreamingIndicator`] recompute trait implemented by derived nodes

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DataError, GraphError, IndicatorError, NodeFailure};
pub use traits::*;
pub use types::*;
