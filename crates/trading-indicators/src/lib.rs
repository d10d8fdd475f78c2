//! Incremental technical indicators wired as a dataflow graph.
//!
//! This crate provides:
//! - [`WindowBuffer`]: bounded sliding window with O(1) mean/variance
//! - [`Graph`]: arena of streaming-value nodes with synchronous, depth-first
//!   propagation from sources to every dependent indicator
//! - Derived indicators (SMA, EMA, standard deviation, Bollinger bands,
//!   momentum, RSI, two-input spread/ratio)
//! - [`IndicatorRegistry`] and [`GraphSpec`] for building graphs from
//!   configuration
//!
//! ```
//! use trading_indicators::{Graph, StdDev};
//!
//! let mut graph = Graph::new();
//! let price = graph.add_source("price").unwrap();
//! let std_dev = graph.add_node("std2", StdDev::new(2).unwrap()).unwrap();
//! graph.bind(price, std_dev).unwrap();
//!
//! graph.emit(price, 10.0).unwrap();
//! graph.emit(price, 20.0).unwrap();
//! assert!((graph[std_dev] - 5.0).abs() < 1e-9);
//! ```

pub mod builder;
pub mod combinators;
pub mod graph;
pub mod momentum;
pub mod moving_average;
pub mod registry;
pub mod simd;
pub mod volatility;
pub mod window;

pub use builder::{BuiltGraph, GraphSpec, NodeSpec, SourceSpec};
pub use combinators::{Map, Ratio, Spread};
pub use graph::{Graph, SinkFn, Subscriber};
pub use momentum::{Momentum, RateOfChange, Rsi};
pub use moving_average::{Ema, Sma};
pub use registry::{IndicatorInfo, IndicatorRegistry};
pub use volatility::{BandSide, BollingerBand, StdDev, Variance, ZScore};
pub use window::WindowBuffer;
