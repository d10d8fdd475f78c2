//! Core data types for the indicator engine.

mod node;
mod ohlcv;
mod sample;

pub use node::NodeId;
pub use ohlcv::{Bar, PriceField};
pub use sample::{ensure_finite, Sample};
