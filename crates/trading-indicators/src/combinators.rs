//! Combinators over one or more upstream series.
//!
//! Two-input nodes ([`Spread`], [`Ratio`]) stay silent until both ports have
//! received a value. After that, an emission on either port recomputes from
//! the last-known value of the other. When the two upstreams are fed by
//! independent sources, the interleaving of their emissions decides the
//! output sequence.

use std::fmt;

use trading_core::error::IndicatorError;
use trading_core::traits::StreamingIndicator;
use trading_core::types::ensure_finite;

/// Last-known values of a pair of inputs.
#[derive(Debug, Clone, Copy, Default)]
struct PairState {
    left: Option<f64>,
    right: Option<f64>,
}

impl PairState {
    /// Apply `value` on `port` and combine the pair with `f`.
    ///
    /// The new value is only kept if `f` yields a finite output (or the
    /// other side has not arrived yet).
    fn update<F>(&mut self, port: usize, value: f64, f: F) -> Result<Option<f64>, IndicatorError>
    where
        F: FnOnce(f64, f64) -> f64,
    {
        let value = ensure_finite(value)?;
        let mut next = *self;
        match port {
            0 => next.left = Some(value),
            1 => next.right = Some(value),
            _ => {
                return Err(IndicatorError::InvalidConfiguration(format!(
                    "input port {} does not exist on a two-input node",
                    port
                )))
            }
        }
        let output = next
            .left
            .zip(next.right)
            .map(|(left, right)| ensure_finite(f(left, right)))
            .transpose()?;
        *self = next;
        Ok(output)
    }
}

/// Difference of two series: `left - right`.
#[derive(Debug, Clone, Default)]
pub struct Spread {
    state: PairState,
}

impl Spread {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamingIndicator for Spread {
    fn arity(&self) -> usize {
        2
    }

    fn update(&mut self, port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.state.update(port, value, |left, right| left - right)
    }

    fn reset(&mut self) {
        self.state = PairState::default();
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "Spread"
    }
}

/// Quotient of two series: `left / right`.
///
/// A zero denominator is reported as an invalid output rather than
/// emitting an infinity.
#[derive(Debug, Clone, Default)]
pub struct Ratio {
    state: PairState,
}

impl Ratio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamingIndicator for Ratio {
    fn arity(&self) -> usize {
        2
    }

    fn update(&mut self, port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.state.update(port, value, |left, right| left / right)
    }

    fn reset(&mut self) {
        self.state = PairState::default();
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "Ratio"
    }
}

/// Stateless single-input transform built from a closure.
pub struct Map<F> {
    name: String,
    f: F,
}

impl<F> Map<F>
where
    F: FnMut(f64) -> f64 + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for Map<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map").field("name", &self.name).finish()
    }
}

impl<F> StreamingIndicator for Map<F>
where
    F: FnMut(f64) -> f64 + Send,
{
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        let value = ensure_finite(value)?;
        ensure_finite((self.f)(value)).map(Some)
    }

    fn reset(&mut self) {}

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        &self.name
    }
}
