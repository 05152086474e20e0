//! Per-cycle value objects reported by the external adapters.
//!
//! Both snapshots are rebuilt from the broker every cycle and never cached
//! or mutated in place; the engine is stateless across cycles and must
//! reconstruct its view of the world from these alone.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};

/// Latest indicator values for one instrument, as of the most recent
/// completed bar. The indicator math itself lives outside the core; these
/// arrive already computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// Average true range over the strategy's lookback (non-negative).
    pub atr: f64,
    /// Long-lookback channel (breakout entry signal).
    pub long_upper: f64,
    pub long_lower: f64,
    /// Short-lookback channel (exit signal).
    pub short_upper: f64,
    pub short_lower: f64,
}

/// Account state relevant to one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Funds available for new risk, in the account's base currency.
    pub available_funds: f64,
    /// Net position in whole units of the instrument's base currency.
    /// Positive = long, negative = short.
    pub net_position: i64,
    /// Rate converting the instrument's quote currency into the account's
    /// base currency (account units per quote unit), so a per-unit loss of
    /// `stop_distance` costs `stop_distance * exchange_rate` in account
    /// funds. 1.0 when the instrument is quoted in the account currency.
    pub exchange_rate: f64,
}

impl AccountSnapshot {
    pub fn flat(available_funds: f64) -> Self {
        Self {
            available_funds,
            net_position: 0,
            exchange_rate: 1.0,
        }
    }
}

/// A fill reported back by the broker collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub quantity: u64,
    pub avg_price: f64,
}
