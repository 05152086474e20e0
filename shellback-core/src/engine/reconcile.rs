//! Stop reconciliation: collapse duplicate protective stops down to one
//! live stop per filled leg and flush every stale open order.
//!
//! Pyramiding moves the correct stop price for already-filled legs (stops
//! only ever tighten, following the newest fill), and a purely additive
//! strategy would otherwise accumulate an unbounded pile of now-irrelevant
//! conditional orders across cycles. So every cycle, before new brackets go
//! out: keep one stop per trigger price for the legs that actually filled
//! (rebuilt fresh, not reusing stale broker-side ids), and cancel
//! everything else for the rebuild. Stops guarding a still-resting entry
//! are not retained; the cycle's fresh brackets rebuild them, and a
//! retained copy would rest naked with no filled quantity behind it.

use super::bracket::BracketBuilder;
use crate::domain::{Fill, Instrument, Order, OrderId};
use std::collections::HashSet;
use tracing::warn;

/// What reconciliation decided for one instrument.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Deduplicated protective stops for filled legs, rebuilt as fresh
    /// orders. Re-submitted alongside the cycle's new brackets so filled
    /// legs stay protected through the reconciliation window.
    pub retained_stops: Vec<Order>,
    /// Every open order, all of which are cancelled and rebuilt this cycle.
    pub to_cancel: Vec<Order>,
    /// Orders dropped for referencing a parent the broker no longer knows.
    pub dropped_inconsistent: usize,
}

/// Reconcile the broker-reported open orders for one instrument.
///
/// `fills` is consulted for parent validation: a child whose parent has
/// filled is normal, a child whose parent is neither open nor filled is
/// inconsistent broker state and is dropped (and logged), never retained.
pub fn reconcile_stops(
    instrument: &Instrument,
    open_orders: &[Order],
    fills: &[Fill],
    builder: &mut BracketBuilder<'_>,
) -> ReconcileOutcome {
    let known: HashSet<OrderId> = open_orders
        .iter()
        .map(|o| o.id)
        .chain(fills.iter().map(|f| f.order_id))
        .collect();
    let filled: HashSet<OrderId> = fills.iter().map(|f| f.order_id).collect();

    let mut outcome = ReconcileOutcome::default();
    let mut seen_stop_ticks: HashSet<i64> = HashSet::new();

    for order in open_orders {
        let consistent = order.parent.map_or(true, |p| known.contains(&p));
        if !consistent {
            warn!(
                pair = %instrument.pair,
                order = %order.id,
                role = %order.role,
                parent = ?order.parent,
                "dropping open order with unknown parent"
            );
            outcome.dropped_inconsistent += 1;
            outcome.to_cancel.push(order.clone());
            continue;
        }

        // A stop protects quantity only once its entry has filled (a
        // parent-less stop is a prior cycle's retained copy, already live
        // against the position). Stops of still-resting entries belong to
        // the brackets being rebuilt and must not survive on their own.
        let protects_fill = order.parent.map_or(true, |p| filled.contains(&p));

        if order.is_stop() && protects_fill {
            if let Some(cond) = order.condition {
                // Tick index sidesteps float-equality trouble when two
                // cycles computed the "same" stop price.
                let tick = instrument
                    .tick_index(cond.price)
                    .unwrap_or_else(|_| cond.price.to_bits() as i64);
                if seen_stop_ticks.insert(tick) {
                    let mut fresh = order.clone();
                    fresh.id = builder.next_id();
                    fresh.parent = None;
                    fresh.oca_group = None;
                    fresh.transmit = true;
                    outcome.retained_stops.push(fresh);
                }
            }
        }

        outcome.to_cancel.push(order.clone());
    }

    outcome
}
