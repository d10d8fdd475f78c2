//! Indicator trait definitions.

use crate::error::IndicatorError;

/// Recompute rule of a derived graph node.
///
/// An indicator owns whatever state it needs (usually a window buffer) and
/// turns each incoming sample into at most one new output value. The graph
/// calls [`update`](Self::update) once per upstream emission and, when it
/// returns `Some`, emits that value to the node's own subscribers.
///
/// Implementations must validate before mutating: a returned error leaves
/// the indicator exactly as it was before the call.
pub trait StreamingIndicator: Send {
    /// Number of upstream inputs the indicator consumes.
    fn arity(&self) -> usize {
        1
    }

    /// Feed a new sample arriving on input `port`.
    ///
    /// # Returns
    /// The new output, or `None` while the indicator is still warming up.
    fn update(&mut self, port: usize, value: f64) -> Result<Option<f64>, IndicatorError>;

    /// Reset the indicator state.
    fn reset(&mut self);

    /// Number of samples the indicator looks back over.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}
