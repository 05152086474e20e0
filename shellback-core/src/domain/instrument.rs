//! Instrument metadata: currency pair, tick increment, contract linkage.

use super::ids::ContractId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    #[error("instrument {pair} has no usable price increment ({increment})")]
    BadIncrement { pair: String, increment: f64 },

    #[error("unknown instrument {0}")]
    Unknown(String),
}

/// A tradable currency pair. Immutable once configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    /// Pair in broker notation, e.g. `EUR.USD`.
    pub pair: String,
    /// Base currency code (`EUR` in `EUR.USD`).
    pub base: String,
    /// Quote currency code (`USD` in `EUR.USD`).
    pub quote: String,
    /// Minimum allowed price increment (tick size).
    pub increment: f64,
    /// Broker contract id, referenced by price conditions on orders.
    pub contract_id: ContractId,
}

impl Instrument {
    pub fn new(
        pair: impl Into<String>,
        base: impl Into<String>,
        quote: impl Into<String>,
        increment: f64,
        contract_id: ContractId,
    ) -> Self {
        Self {
            pair: pair.into(),
            base: base.into(),
            quote: quote.into(),
            increment,
            contract_id,
        }
    }

    /// Round a raw price to the nearest multiple of the tick increment.
    ///
    /// Deterministic and idempotent: `quantize(quantize(x)) == quantize(x)`.
    pub fn quantize(&self, raw: f64) -> Result<f64, InstrumentError> {
        if !(self.increment > 0.0) || !self.increment.is_finite() {
            return Err(InstrumentError::BadIncrement {
                pair: self.pair.clone(),
                increment: self.increment,
            });
        }
        Ok(self.increment * (raw / self.increment).round())
    }

    /// Number of whole ticks in a price. Used as a dedup key where
    /// comparing raw floats would be fragile.
    pub fn tick_index(&self, price: f64) -> Result<i64, InstrumentError> {
        let q = self.quantize(price)?;
        Ok((q / self.increment).round() as i64)
    }
}

/// Registry of configured instruments, looked up by pair.
///
/// A pair missing from the book is `InstrumentError::Unknown`, which callers
/// surface as "unsupported instrument" and skip for the cycle.
#[derive(Debug, Clone, Default)]
pub struct InstrumentBook {
    instruments: Vec<Instrument>,
}

impl InstrumentBook {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }

    pub fn get(&self, pair: &str) -> Result<&Instrument, InstrumentError> {
        self.instruments
            .iter()
            .find(|i| i.pair == pair)
            .ok_or_else(|| InstrumentError::Unknown(pair.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
