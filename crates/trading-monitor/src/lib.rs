//! Logging setup for the indicator engine.

mod logging;

pub use logging::setup_logging;
pub use tracing_appender::non_blocking::WorkerGuard;
