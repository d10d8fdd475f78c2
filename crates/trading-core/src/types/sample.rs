//! Samples pushed through the graph.

use crate::error::IndicatorError;

/// A single numeric observation: a price, a volume, or an upstream
/// indicator value. It carries no identity beyond value and arrival order.
pub type Sample = f64;

/// Reject NaN and infinities.
#[inline]
pub fn ensure_finite(value: Sample) -> Result<Sample, IndicatorError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(IndicatorError::InvalidSample { value })
    }
}
