//! Momentum indicators.

use crate::window::WindowBuffer;
use trading_core::error::IndicatorError;
use trading_core::traits::StreamingIndicator;
use trading_core::types::ensure_finite;

/// Momentum: `x[t] - x[t - period]`.
///
/// Silent until `period + 1` samples have arrived.
#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    window: WindowBuffer,
}

impl Momentum {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            period,
            window: lookback_window(period)?,
        })
    }
}

impl StreamingIndicator for Momentum {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.window.push_then(value, |w| {
            lookback(w)
                .map(|base| ensure_finite(value - base))
                .transpose()
        })
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Momentum"
    }
}

/// Rate of change in percent: `(x[t] / x[t - period] - 1) * 100`.
///
/// Produces no output while the base sample is zero (or so small the
/// ratio is not finite).
#[derive(Debug, Clone)]
pub struct RateOfChange {
    period: usize,
    window: WindowBuffer,
}

impl RateOfChange {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            period,
            window: lookback_window(period)?,
        })
    }
}

impl StreamingIndicator for RateOfChange {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.window.push(value)?;
        Ok(lookback(&self.window).and_then(|base| {
            // Undefined against a zero base; the sample still advances the window.
            let roc = (value / base - 1.0) * 100.0;
            roc.is_finite().then_some(roc)
        }))
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ROC"
    }
}

fn lookback_window(period: usize) -> Result<WindowBuffer, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidConfiguration(
            "Period must be greater than 0".to_string(),
        ));
    }
    WindowBuffer::new(period + 1)
}

/// Oldest sample once the lookback window is full.
fn lookback(window: &WindowBuffer) -> Option<f64> {
    if window.is_full() {
        window.get(0)
    } else {
        None
    }
}

/// Relative Strength Index (RSI) with Wilder's smoothing.
///
/// The first value is emitted once `period` price changes have been seen,
/// seeded with the simple average gain and loss.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev: Option<f64>,
    changes: usize,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    /// Create a new RSI indicator. Common periods are 14 or 9.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidConfiguration(
                "RSI period must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            period,
            prev: None,
            changes: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        })
    }

    fn value(&self) -> f64 {
        if self.avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
        }
    }
}

impl StreamingIndicator for Rsi {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        let value = ensure_finite(value)?;
        let Some(prev) = self.prev else {
            self.prev = Some(value);
            return Ok(None);
        };

        let change = ensure_finite(value - prev)?;
        self.prev = Some(value);
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        let period = self.period as f64;
        self.changes += 1;

        if self.changes <= self.period {
            // Accumulate sums for the seed averages
            self.avg_gain += gain;
            self.avg_loss += loss;
            if self.changes < self.period {
                return Ok(None);
            }
            self.avg_gain /= period;
            self.avg_loss /= period;
        } else {
            self.avg_gain = (self.avg_gain * (period - 1.0) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - 1.0) + loss) / period;
        }

        Ok(Some(self.value()))
    }

    fn reset(&mut self) {
        self.prev = None;
        self.changes = 0;
        self.avg_gain = 0.0;
        self.avg_loss = 0.0;
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}
