//! Volatility indicators.
//!
//! All of these push the incoming sample into a [`WindowBuffer`] and derive
//! their output from its running statistics, so each update is O(1). A
//! sample whose output would not be finite is rejected and leaves the
//! window untouched.

use serde::{Deserialize, Serialize};

use crate::window::WindowBuffer;
use trading_core::error::IndicatorError;
use trading_core::traits::StreamingIndicator;
use trading_core::types::ensure_finite;

/// Windowed population standard deviation.
///
/// A window holding a single sample reports `0.0`.
#[derive(Debug, Clone)]
pub struct StdDev {
    window: WindowBuffer,
}

impl StdDev {
    /// Create a new standard deviation indicator.
    pub fn new(window: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            window: WindowBuffer::new(window)?,
        })
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }
}

impl StreamingIndicator for StdDev {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.window
            .push_then(value, |w| w.std_dev().and_then(ensure_finite))
            .map(Some)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn period(&self) -> usize {
        self.window.capacity()
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Windowed population variance.
#[derive(Debug, Clone)]
pub struct Variance {
    window: WindowBuffer,
}

impl Variance {
    pub fn new(window: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            window: WindowBuffer::new(window)?,
        })
    }
}

impl StreamingIndicator for Variance {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.window
            .push_then(value, |w| w.variance().and_then(ensure_finite))
            .map(Some)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn period(&self) -> usize {
        self.window.capacity()
    }

    fn name(&self) -> &str {
        "Variance"
    }
}

/// Distance of the newest sample from the window mean, in standard deviations.
///
/// A flat window (zero deviation) reports `0.0`.
#[derive(Debug, Clone)]
pub struct ZScore {
    window: WindowBuffer,
}

impl ZScore {
    pub fn new(window: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            window: WindowBuffer::new(window)?,
        })
    }
}

impl StreamingIndicator for ZScore {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        self.window
            .push_then(value, |w| {
                let std_dev = w.std_dev()?;
                if std_dev == 0.0 {
                    return Ok(0.0);
                }
                ensure_finite((value - w.mean()?) / std_dev)
            })
            .map(Some)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn period(&self) -> usize {
        self.window.capacity()
    }

    fn name(&self) -> &str {
        "ZScore"
    }
}

/// Which Bollinger band a node tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandSide {
    #[default]
    Upper,
    Lower,
}

/// One Bollinger band: `mean ± multiplier * std_dev` over the window.
#[derive(Debug, Clone)]
pub struct BollingerBand {
    window: WindowBuffer,
    multiplier: f64,
    side: BandSide,
}

impl BollingerBand {
    /// Create a band with the given window and std-dev multiplier.
    pub fn new(window: usize, multiplier: f64, side: BandSide) -> Result<Self, IndicatorError> {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(IndicatorError::InvalidConfiguration(format!(
                "Std dev multiplier must be positive, got {}",
                multiplier
            )));
        }
        Ok(Self {
            window: WindowBuffer::new(window)?,
            multiplier,
            side,
        })
    }

    pub fn side(&self) -> BandSide {
        self.side
    }
}

impl StreamingIndicator for BollingerBand {
    fn update(&mut self, _port: usize, value: f64) -> Result<Option<f64>, IndicatorError> {
        let (multiplier, side) = (self.multiplier, self.side);
        self.window
            .push_then(value, |w| {
                let mean = w.mean()?;
                let offset = multiplier * w.std_dev()?;
                let band = match side {
                    BandSide::Upper => mean + offset,
                    BandSide::Lower => mean - offset,
                };
                ensure_finite(band)
            })
            .map(Some)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn period(&self) -> usize {
        self.window.capacity()
    }

    fn name(&self) -> &str {
        match self.side {
            BandSide::Upper => "BollingerUpper",
            BandSide::Lower => "BollingerLower",
        }
    }
}
