//! The decision engine: sizing, bracket construction, unit state
//! classification, stop reconciliation, and the per-instrument cycle that
//! ties them together.

pub mod bracket;
pub mod cycle;
pub mod reconcile;
pub mod sizing;
pub mod unit_state;

pub use bracket::{Bracket, BracketBuilder};
pub use cycle::{CycleEngine, CycleOutcome};
pub use reconcile::{reconcile_stops, ReconcileOutcome};
pub use sizing::position_size;
pub use unit_state::{classify_unit, UnitState};

use crate::broker::BrokerError;
use crate::domain::InstrumentError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Unknown pair or unusable tick increment. Fatal for the instrument
    /// this cycle; the runner logs and moves on.
    #[error("unsupported instrument: {0}")]
    UnsupportedInstrument(#[from] InstrumentError),

    /// Non-positive stop distance, usually stale or missing indicator data.
    #[error("invalid stop distance {distance} for {pair}")]
    InvalidStopDistance { pair: String, distance: f64 },

    /// Broker round-trip failed. The instrument's cycle is aborted with
    /// nothing partially submitted.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] BrokerError),
}

/// Strategy constants. These are configuration, not invariants: the source
/// strategy's variants disagreed on several of them, so every knob is
/// surfaced rather than hard-coded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Fraction of available funds risked per entry.
    pub risk_fraction: f64,
    /// Fraction of available funds forming a unit's total risk ceiling.
    pub unit_risk_fraction: f64,
    /// Pyramid slots per unit.
    pub max_pyramid_units: u8,
    /// |net position| below this many units counts as flat.
    pub dust_threshold: u64,
    /// Stop distance as a multiple of ATR.
    pub stop_atr_multiple: f64,
    /// ATR multiple used when translating net position into consumed
    /// pyramid slots.
    pub slot_atr_multiple: f64,
    /// Chain re-entry attempts behind each stop leg (whipsaw protection).
    pub whipsaw_reentry: bool,
    /// Attempts per direction when `whipsaw_reentry` is on.
    pub reentry_depth: u8,
    /// Give stop legs a breakeven adjustment trigger.
    pub breakeven_adjust: bool,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            risk_fraction: 0.005,
            unit_risk_fraction: 0.02,
            max_pyramid_units: 4,
            dust_threshold: 100,
            stop_atr_multiple: 2.0,
            slot_atr_multiple: 0.5,
            whipsaw_reentry: false,
            reentry_depth: 3,
            breakeven_adjust: false,
        }
    }
}
