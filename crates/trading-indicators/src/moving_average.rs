//! Moving average indicators.

use crate::window::WindowBuffer;
use trading_core::error::IndicatorError;
use trading_core::traits::StreamingIndicator;
use trading_core::types::ensure_finite;

/// Simple Moving Average (SMA).
///
/// Arithmetic mean of the last N values. Emits from the first sample on,
/// averaging over however many samples the window holds so far.
#[derive(Debug, Clone)]
pub struct Sma {
    window: WindowBuffer,
}

impl Sma {
    /// Create a new SMA with the specified window.
    pub fn new(window: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            window: WindowBuffer::new(window)?,
        })
    }

    /// Samples currently averaged.
    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }
}

impl StreamingIndicator for Sma {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.window
            .push_then(value, |w| w.mean().and_then(ensure_finite))
            .map(Some)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn period(&self) -> usize {
        self.window.capacity()
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA).
///
/// Seeded with the first sample, then `ema = x * α + ema * (1 - α)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    current: Option<f64>,
}

impl Ema {
    /// Create a new EMA with `α = 2 / (period + 1)`.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidConfiguration(
                "EMA period must be greater than 0".to_string(),
            ));
        }
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self::with_multiplier(period, multiplier)
    }

    /// Create an EMA with a custom smoothing factor.
    pub fn with_multiplier(period: usize, multiplier: f64) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidConfiguration(
                "EMA period must be greater than 0".to_string(),
            ));
        }
        if !(multiplier > 0.0 && multiplier <= 1.0) {
            return Err(IndicatorError::InvalidConfiguration(format!(
                "EMA multiplier must be in (0, 1], got {}",
                multiplier
            )));
        }
        Ok(Self {
            period,
            multiplier,
            current: None,
        })
    }

    /// Get the current EMA value.
    pub fn current(&self) -> Option<f64> {
        self.current
    }
}

impl StreamingIndicator for Ema {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        let value = ensure_finite(value)?;
        let next = match self.current {
            Some(ema) => value * self.multiplier + ema * (1.0 - self.multiplier),
            None => value,
        };
        self.current = Some(next);
        Ok(self.current)
    }

    fn reset(&mut self) {
        self.current = None;
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(indicator: &mut dyn StreamingIndicator, data: &[f64]) -> Vec<Option<f64>> {
        data.iter()
            .map(|&x| indicator.update(0, x).unwrap())
            .collect()
    }

    #[test]
    fn test_sma() {
        let mut sma = Sma::new(3).unwrap();
        let result = run(&mut sma, &[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert!((result[0].unwrap() - 1.0).abs() < 1e-10); // partial window
        assert!((result[2].unwrap() - 2.0).abs() < 1e-10); // (1+2+3)/3
        assert!((result[3].unwrap() - 3.0).abs() < 1e-10); // (2+3+4)/3
        assert!((result[4].unwrap() - 4.0).abs() < 1e-10); // (3+4+5)/3
        assert_eq!(sma.window().to_vec(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_sma_invalid_window() {
        assert!(matches!(
            Sma::new(0),
            Err(IndicatorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_ema() {
        let mut ema = Ema::new(3).unwrap();
        // mult = 2/(3+1) = 0.5
        let result = run(&mut ema, &[2.0, 4.0, 5.0]);

        assert_eq!(result[0], Some(2.0)); // seed
        assert!((result[1].unwrap() - 3.0).abs() < 1e-10);
        assert!((result[2].unwrap() - 4.0).abs() < 1e-10);
        assert_eq!(ema.current(), result[2]);
    }

    #[test]
    fn test_ema_rejects_non_finite() {
        let mut ema = Ema::new(3).unwrap();
        ema.update(0, 2.0).unwrap();
        assert!(ema.update(0, f64::NAN).is_err());
        assert_eq!(ema.current(), Some(2.0));
    }

    #[test]
    fn test_ema_reset() {
        let mut ema = Ema::new(3).unwrap();
        run(&mut ema, &[1.0, 2.0, 3.0]);

        ema.reset();
        assert!(ema.current().is_none());
        assert_eq!(ema.update(0, 9.0).unwrap(), Some(9.0));
    }

    #[test]
    fn test_ema_invalid_params() {
        assert!(Ema::new(0).is_err());
        assert!(Ema::with_multiplier(5, 0.0).is_err());
        assert!(Ema::with_multiplier(5, 1.5).is_err());
        assert!(Ema::with_multiplier(5, f64::NAN).is_err());
    }
}
