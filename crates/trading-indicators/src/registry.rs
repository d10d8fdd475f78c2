//! Indicator registry for building nodes from declarative configuration.
//!
//! Each indicator kind is registered under a string identifier together with
//! its default parameters and a factory. The factory decodes the parameters
//! into a strongly-typed struct (unknown fields are rejected) and validates
//! them before any indicator is constructed.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::{
    BandSide, BollingerBand, Ema, Momentum, RateOfChange, Ratio, Rsi, Sma, Spread, StdDev,
    Variance, ZScore,
};
use trading_core::error::IndicatorError;
use trading_core::traits::StreamingIndicator;

/// Builds a boxed indicator from already-merged parameters.
pub type IndicatorFactory = fn(Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError>;

/// Information about a registered indicator kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorInfo {
    /// Identifier used in configuration (`kind = "stddev"`)
    pub kind: String,
    /// Human-readable description
    pub description: String,
    /// Number of upstream inputs
    pub arity: usize,
    /// Parameters used when a configuration omits them
    pub default_params: Value,
}

/// Parameters of single-window indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowParams {
    pub window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmaParams {
    pub window: usize,
    #[serde(default)]
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BollingerParams {
    pub window: usize,
    pub multiplier: f64,
    pub side: BandSide,
}

/// Parameters of lookback indicators (momentum, ROC, RSI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodParams {
    pub period: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoParams {}

fn decode<P: DeserializeOwned>(params: Value) -> Result<P, IndicatorError> {
    serde_json::from_value(params)
        .map_err(|e| IndicatorError::InvalidConfiguration(format!("invalid params: {}", e)))
}

fn sma(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: WindowParams = decode(params)?;
    Ok(Box::new(Sma::new(p.window)?))
}

fn ema(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: EmaParams = decode(params)?;
    let ema = match p.multiplier {
        Some(multiplier) => Ema::with_multiplier(p.window, multiplier)?,
        None => Ema::new(p.window)?,
    };
    Ok(Box::new(ema))
}

fn stddev(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: WindowParams = decode(params)?;
    Ok(Box::new(StdDev::new(p.window)?))
}

fn variance(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: WindowParams = decode(params)?;
    Ok(Box::new(Variance::new(p.window)?))
}

fn zscore(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: WindowParams = decode(params)?;
    Ok(Box::new(ZScore::new(p.window)?))
}

fn bollinger(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: BollingerParams = decode(params)?;
    Ok(Box::new(BollingerBand::new(p.window, p.multiplier, p.side)?))
}

fn momentum(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: PeriodParams = decode(params)?;
    Ok(Box::new(Momentum::new(p.period)?))
}

fn roc(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: PeriodParams = decode(params)?;
    Ok(Box::new(RateOfChange::new(p.period)?))
}

fn rsi(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let p: PeriodParams = decode(params)?;
    Ok(Box::new(Rsi::new(p.period)?))
}

fn spread(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let _: NoParams = decode(params)?;
    Ok(Box::new(Spread::new()))
}

fn ratio(params: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
    let _: NoParams = decode(params)?;
    Ok(Box::new(Ratio::new()))
}

/// Overlay `params` onto `defaults`, key by key for objects.
fn merge_params(defaults: &Value, params: Value) -> Value {
    match (defaults, params) {
        (_, Value::Null) => defaults.clone(),
        (Value::Object(base), Value::Object(overrides)) => {
            let mut merged = base.clone();
            merged.extend(overrides);
            Value::Object(merged)
        }
        (_, other) => other,
    }
}

/// Registry of indicator kinds available to configuration.
pub struct IndicatorRegistry {
    entries: BTreeMap<String, (IndicatorInfo, IndicatorFactory)>,
}

impl IndicatorRegistry {
    /// Create a registry with every built-in indicator.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(
            "sma",
            "Simple moving average over a window",
            1,
            json!({ "window": 20 }),
            sma,
        );
        registry.register(
            "ema",
            "Exponential moving average seeded with the first sample",
            1,
            json!({ "window": 20 }),
            ema,
        );
        registry.register(
            "stddev",
            "Population standard deviation over a window",
            1,
            json!({ "window": 20 }),
            stddev,
        );
        registry.register(
            "variance",
            "Population variance over a window",
            1,
            json!({ "window": 20 }),
            variance,
        );
        registry.register(
            "zscore",
            "Distance of the latest sample from the window mean in standard deviations",
            1,
            json!({ "window": 20 }),
            zscore,
        );
        registry.register(
            "bollinger",
            "Bollinger band: window mean plus or minus a multiple of the standard deviation",
            1,
            json!({ "window": 20, "multiplier": 2.0, "side": "upper" }),
            bollinger,
        );
        registry.register(
            "momentum",
            "Difference between the latest sample and the one `period` samples ago",
            1,
            json!({ "period": 10 }),
            momentum,
        );
        registry.register(
            "roc",
            "Rate of change in percent over `period` samples",
            1,
            json!({ "period": 10 }),
            roc,
        );
        registry.register(
            "rsi",
            "Relative strength index with Wilder smoothing",
            1,
            json!({ "period": 14 }),
            rsi,
        );
        registry.register(
            "spread",
            "Difference of two series, emitted once both have a value",
            2,
            json!({}),
            spread,
        );
        registry.register(
            "ratio",
            "Quotient of two series, emitted once both have a value",
            2,
            json!({}),
            ratio,
        );

        registry
    }

    /// Create a registry with no indicators.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register (or replace) an indicator kind.
    pub fn register(
        &mut self,
        kind: &str,
        description: &str,
        arity: usize,
        default_params: Value,
        factory: IndicatorFactory,
    ) {
        let info = IndicatorInfo {
            kind: kind.to_string(),
            description: description.to_string(),
            arity,
            default_params,
        };
        self.entries.insert(kind.to_string(), (info, factory));
    }

    /// List all registered indicators, sorted by kind.
    pub fn list(&self) -> Vec<&IndicatorInfo> {
        self.entries.values().map(|(info, _)| info).collect()
    }

    /// Get indicator info by kind.
    pub fn get(&self, kind: &str) -> Option<&IndicatorInfo> {
        self.entries.get(kind).map(|(info, _)| info)
    }

    /// Check if a kind exists.
    pub fn exists(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Get all kinds.
    pub fn kinds(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Create an indicator of `kind`; omitted params fall back to the defaults.
    pub fn create(
        &self,
        kind: &str,
        params: Value,
    ) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
        let (info, factory) = self.entries.get(kind).ok_or_else(|| {
            IndicatorError::InvalidConfiguration(format!("unknown indicator kind '{}'", kind))
        })?;

        factory(merge_params(&info.default_params, params)).map_err(|e| match e {
            IndicatorError::InvalidConfiguration(msg) => {
                IndicatorError::InvalidConfiguration(format!("{}: {}", kind, msg))
            }
            other => other,
        })
    }

    /// Create an indicator with its default parameters.
    pub fn create_default(
        &self,
        kind: &str,
    ) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
        self.create(kind, Value::Null)
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds_create_with_defaults() {
        let registry = IndicatorRegistry::new();
        for kind in registry.kinds() {
            let indicator = registry.create_default(kind).unwrap();
            assert_eq!(indicator.arity(), registry.get(kind).unwrap().arity);
        }
        assert!(registry.exists("stddev"));
        assert_eq!(registry.list().len(), 11);
    }

    #[test]
    fn test_params_override_defaults() {
        let registry = IndicatorRegistry::new();

        let indicator = registry.create("stddev", json!({ "window": 5 })).unwrap();
        assert_eq!(indicator.period(), 5);
        assert_eq!(indicator.name(), "StdDev");

        let band = registry.create("bollinger", json!({ "side": "lower" })).unwrap();
        assert_eq!(band.period(), 20);
        assert_eq!(band.name(), "BollingerLower");
    }

    #[test]
    fn test_invalid_params_rejected() {
        let registry = IndicatorRegistry::new();

        for (kind, params) in [
            ("sma", json!({ "window": 0 })),
            ("sma", json!({ "window": -3 })),
            ("sma", json!({ "windw": 5 })),
            ("ema", json!({ "window": 5, "multiplier": 2.0 })),
            ("bollinger", json!({ "side": "middle" })),
            ("spread", json!({ "window": 5 })),
        ] {
            let err = registry.create(kind, params).err().unwrap();
            match err {
                IndicatorError::InvalidConfiguration(msg) => assert!(msg.starts_with(kind)),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_kind() {
        let registry = IndicatorRegistry::new();
        assert!(matches!(
            registry.create_default("macd"),
            Err(IndicatorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_register_custom_kind() {
        fn half(_: Value) -> Result<Box<dyn StreamingIndicator>, IndicatorError> {
            Ok(Box::new(crate::Map::new("half", |x| x / 2.0)))
        }

        let mut registry = IndicatorRegistry::empty();
        registry.register("half", "Halves its input", 1, Value::Null, half);

        let mut indicator = registry.create_default("half").unwrap();
        assert_eq!(indicator.update(0, 3.0).unwrap(), Some(1.5));
        assert_eq!(registry.kinds(), vec!["half"]);
    }
}
