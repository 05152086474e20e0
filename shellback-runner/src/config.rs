//! Serializable run configuration.
//!
//! Everything the strategy's variants disagreed on (risk fractions, slot
//! counts, re-entry behavior) is a knob here rather than a constant in the
//! engine. The default instrument book ships the three pairs the strategy
//! originally traded.

use serde::{Deserialize, Serialize};
use shellback_core::domain::{ContractId, Instrument, InstrumentBook};
use shellback_core::engine::StrategyParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full run configuration, normally loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub strategy: StrategyParams,
    pub account: AccountConfig,
    pub log: LogConfig,
    pub instruments: Vec<InstrumentConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyParams::default(),
            account: AccountConfig::default(),
            log: LogConfig::default(),
            instruments: vec![
                InstrumentConfig::new("EUR.USD", "EUR", "USD", 0.00005, 1, 1.0, 1.0800),
                InstrumentConfig::new("GBP.JPY", "GBP", "JPY", 0.005, 2, 0.0068, 186.50),
                InstrumentConfig::new("AUD.CAD", "AUD", "CAD", 0.00005, 3, 0.7300, 0.8950),
            ],
        }
    }
}

/// Starting account state for simulated runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccountConfig {
    /// Available funds in the account's base currency.
    pub available_funds: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self { available_funds: 100_000.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is not set.
    pub level: String,
    /// Directory for rotating file output; `None` logs to console only.
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), dir: None }
    }
}

/// One instrument entry, with the simulation inputs the core instrument
/// type deliberately does not carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentConfig {
    pub pair: String,
    pub base: String,
    pub quote: String,
    pub increment: f64,
    pub contract_id: i64,
    /// Rate converting the quote currency into the account's base currency,
    /// e.g. USD-per-JPY for GBP.JPY in a USD account (1.0 when quoted in
    /// the account currency).
    #[serde(default = "default_rate")]
    pub exchange_rate: f64,
    /// Starting mid price for simulated runs.
    #[serde(default)]
    pub start_price: f64,
}

fn default_rate() -> f64 {
    1.0
}

impl InstrumentConfig {
    pub fn new(
        pair: &str,
        base: &str,
        quote: &str,
        increment: f64,
        contract_id: i64,
        exchange_rate: f64,
        start_price: f64,
    ) -> Self {
        Self {
            pair: pair.to_string(),
            base: base.to_string(),
            quote: quote.to_string(),
            increment,
            contract_id,
            exchange_rate,
            start_price,
        }
    }

    pub fn to_instrument(&self) -> Instrument {
        Instrument::new(
            self.pair.clone(),
            self.base.clone(),
            self.quote.clone(),
            self.increment,
            ContractId(self.contract_id),
        )
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::Invalid("no instruments configured".into()));
        }
        for inst in &self.instruments {
            if !(inst.increment > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "instrument {} has non-positive increment {}",
                    inst.pair, inst.increment
                )));
            }
            if !(inst.exchange_rate > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "instrument {} has non-positive exchange rate {}",
                    inst.pair, inst.exchange_rate
                )));
            }
        }
        let s = &self.strategy;
        if !(s.risk_fraction > 0.0 && s.risk_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk_fraction {} must be in (0, 1)",
                s.risk_fraction
            )));
        }
        if !(s.unit_risk_fraction > 0.0 && s.unit_risk_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "unit_risk_fraction {} must be in (0, 1)",
                s.unit_risk_fraction
            )));
        }
        if s.max_pyramid_units == 0 {
            return Err(ConfigError::Invalid("max_pyramid_units must be >= 1".into()));
        }
        Ok(())
    }

    pub fn instrument_book(&self) -> InstrumentBook {
        InstrumentBook::new(self.instruments.iter().map(|i| i.to_instrument()).collect())
    }
}
