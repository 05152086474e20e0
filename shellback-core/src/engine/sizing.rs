//! Position sizing: risk budget and stop distance to an order quantity.
//!
//! Size scales inversely with stop distance so that a full stop-out always
//! loses the risk budget, independent of the instrument's volatility.

use super::EngineError;
use crate::domain::{AccountSnapshot, Instrument};

/// Convert a risk budget into whole units of the instrument.
///
/// ```text
/// risk_budget = available_funds * risk_fraction
/// quantity    = round(risk_budget / stop_distance / exchange_rate)
/// ```
///
/// `exchange_rate` is 1.0 when the instrument is quoted in the account's
/// base currency, collapsing the two cases in the source strategy into one
/// formula. A non-positive `stop_distance` is rejected rather than clamped:
/// it almost always means stale indicator data, and sizing off it would
/// produce an absurd quantity.
pub fn position_size(
    instrument: &Instrument,
    account: &AccountSnapshot,
    risk_fraction: f64,
    stop_distance: f64,
) -> Result<u64, EngineError> {
    if !(stop_distance > 0.0) || !stop_distance.is_finite() {
        return Err(EngineError::InvalidStopDistance {
            pair: instrument.pair.clone(),
            distance: stop_distance,
        });
    }
    if account.available_funds <= 0.0 || account.exchange_rate <= 0.0 {
        return Ok(0);
    }

    let risk_budget = account.available_funds * risk_fraction;
    let raw = risk_budget / stop_distance / account.exchange_rate;
    Ok(raw.round().max(0.0) as u64)
}
