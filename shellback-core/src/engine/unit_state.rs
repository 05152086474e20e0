//! Unit state classification: flat, directional-not-full, directional-full.
//!
//! The unit is never stored. It is re-derived every cycle from the account
//! and indicator snapshots, so the engine can be killed and re-run at any
//! point and still reconstruct correct behavior from broker-reported state
//! alone. Introducing a local position object here would create a second
//! source of truth that can desynchronize from the broker's actual book.

use super::StrategyParams;
use crate::domain::{AccountSnapshot, Direction, IndicatorSnapshot};
use serde::{Deserialize, Serialize};

/// Where the instrument's unit stands this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    /// |net position| below the dust threshold: place initial entry
    /// brackets for both directions.
    Flat,
    /// Holding a direction with pyramid slots still open: place compound
    /// brackets at the remaining offsets, then reconcile stops.
    DirectionalNotFull {
        side: Direction,
        /// Slots already consumed (1..max); next compound offset to place.
        filled_slots: u8,
    },
    /// Risk ceiling reached: no new entries, only stop reconciliation and
    /// exit maintenance.
    DirectionalFull { side: Direction },
}

impl UnitState {
    pub fn side(&self) -> Option<Direction> {
        match self {
            UnitState::Flat => None,
            UnitState::DirectionalNotFull { side, .. } | UnitState::DirectionalFull { side } => {
                Some(*side)
            }
        }
    }
}

/// Classify the unit from externally-observed state.
///
/// Consumed pyramid slots come from comparing the position's risk footprint
/// `|net_position * exchange_rate * slot_atr_multiple * atr|` against
/// fractional thresholds of the unit risk ceiling
/// (`available_funds * unit_risk_fraction`, recomputed each cycle so it
/// tracks equity growth and drawdown). Comparisons are strict `<`, so a
/// position exactly on a threshold boundary lands in the lower band and is
/// never under-counted into the next slot prematurely.
pub fn classify_unit(
    account: &AccountSnapshot,
    indicators: &IndicatorSnapshot,
    params: &StrategyParams,
) -> UnitState {
    if account.net_position.unsigned_abs() < params.dust_threshold {
        return UnitState::Flat;
    }
    let side = if account.net_position > 0 {
        Direction::Long
    } else {
        Direction::Short
    };

    let max = params.max_pyramid_units.max(1);
    let ceiling = account.available_funds * params.unit_risk_fraction;
    if ceiling <= 0.0 {
        // Equity gone or ceiling misconfigured: treat the unit as full so
        // no new risk is added.
        return UnitState::DirectionalFull { side };
    }

    let footprint = (account.net_position as f64
        * account.exchange_rate
        * params.slot_atr_multiple
        * indicators.atr)
        .abs();
    let consumed = footprint / ceiling;

    let mut filled_slots = max;
    for slot in 1..max {
        if consumed < slot as f64 / max as f64 {
            filled_slots = slot;
            break;
        }
    }

    if filled_slots >= max {
        UnitState::DirectionalFull { side }
    } else {
        UnitState::DirectionalNotFull { side, filled_slots }
    }
}
