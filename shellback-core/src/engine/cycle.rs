//! The per-instrument cycle: snapshots in, one linked order group out.
//!
//! Each invocation re-derives everything from broker-reported state:
//! prior-cycle unfilled orders are cancelled and rebuilt, never silently
//! duplicated. A broker failure anywhere aborts the instrument's cycle
//! before anything is partially submitted; the next cycle starts from
//! scratch.

use super::bracket::BracketBuilder;
use super::reconcile::reconcile_stops;
use super::sizing::position_size;
use super::unit_state::{classify_unit, UnitState};
use super::{EngineError, StrategyParams};
use crate::broker::Broker;
use crate::domain::{Instrument, OcaPolicy, Order};
use tracing::{debug, info};

/// What one instrument's cycle decided and did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub pair: String,
    pub state: UnitState,
    /// Stale open orders cancelled for the rebuild.
    pub cancelled: usize,
    /// Orders submitted this cycle (retained stops + new brackets).
    pub submitted: Vec<Order>,
    /// Open orders dropped for inconsistent parent references.
    pub dropped_inconsistent: usize,
}

/// Drives one instrument through classify → reconcile → build → submit.
///
/// Holds only the strategy constants; all market and account state is
/// fetched fresh from the broker inside `run_instrument`.
#[derive(Debug, Clone, Default)]
pub struct CycleEngine {
    params: StrategyParams,
}

impl CycleEngine {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Run one full cycle for one instrument.
    pub fn run_instrument(
        &self,
        broker: &mut dyn Broker,
        instrument: &Instrument,
    ) -> Result<CycleOutcome, EngineError> {
        let indicators = broker.fetch_indicators(instrument)?;
        let account = broker.fetch_account(instrument)?;

        let stop_distance = instrument.quantize(self.params.stop_atr_multiple * indicators.atr)?;
        if !(stop_distance > 0.0) || !stop_distance.is_finite() {
            return Err(EngineError::InvalidStopDistance {
                pair: instrument.pair.clone(),
                distance: stop_distance,
            });
        }

        let state = classify_unit(&account, &indicators, &self.params);
        debug!(
            pair = %instrument.pair,
            ?state,
            net_position = account.net_position,
            stop_distance,
            "classified unit"
        );

        let open_orders = broker.list_open_orders(instrument)?;
        let fills = broker.list_recent_fills(instrument)?;

        let mut builder = BracketBuilder::new(instrument, &indicators, &self.params);
        let next_free_id = open_orders
            .iter()
            .map(|o| o.id.0)
            .chain(fills.iter().map(|f| f.order_id.0))
            .max()
            .map_or(1, |m| m + 1);
        builder.start_ids_at(next_free_id);
        let reconciled = reconcile_stops(instrument, &open_orders, &fills, &mut builder);

        let mut submitted: Vec<Order> = Vec::new();
        match state {
            UnitState::Flat => {
                // Flat means there are no filled legs to protect; retained
                // stops would rest naked, so they are flushed with the rest.
                if !reconciled.retained_stops.is_empty() {
                    debug!(
                        pair = %instrument.pair,
                        count = reconciled.retained_stops.len(),
                        "flat unit, discarding retained stops"
                    );
                }
                let quantity = position_size(
                    instrument,
                    &account,
                    self.params.risk_fraction,
                    stop_distance,
                )?;
                if quantity > 0 {
                    submitted.extend(builder.initial_pair(quantity, stop_distance)?);
                }
            }
            UnitState::DirectionalNotFull { side, filled_slots } => {
                submitted.extend(reconciled.retained_stops.iter().cloned());
                // The filled quantity keeps its channel exit while the
                // remaining slots pyramid; the compound brackets only carry
                // exits for quantity that has not filled yet.
                let net_units = account.net_position.unsigned_abs();
                submitted.push(builder.full_position_exit(side, net_units)?);
                let quantity = position_size(
                    instrument,
                    &account,
                    self.params.risk_fraction,
                    stop_distance,
                )?;
                if quantity > 0 {
                    for offset in filled_slots..self.params.max_pyramid_units {
                        let bracket =
                            builder.compound(side, offset, quantity, stop_distance)?;
                        submitted.extend(bracket.into_orders());
                    }
                }
            }
            UnitState::DirectionalFull { side } => {
                submitted.extend(reconciled.retained_stops.iter().cloned());
                let net_units = account.net_position.unsigned_abs();
                submitted.push(builder.full_position_exit(side, net_units)?);
            }
        }

        for order in &reconciled.to_cancel {
            broker.cancel_order(instrument, order)?;
        }
        if !submitted.is_empty() {
            broker.submit_order_group(instrument, submitted.clone(), OcaPolicy::CancelAll)?;
        }

        info!(
            pair = %instrument.pair,
            ?state,
            cancelled = reconciled.to_cancel.len(),
            submitted = submitted.len(),
            "cycle complete"
        );

        Ok(CycleOutcome {
            pair: instrument.pair.clone(),
            state,
            cancelled: reconciled.to_cancel.len(),
            submitted,
            dropped_inconsistent: reconciled.dropped_inconsistent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerError;
    use crate::domain::{AccountSnapshot, ContractId, Direction, Fill, IndicatorSnapshot, Leg};

    /// Scripted broker: fixed snapshots, records everything.
    struct MockBroker {
        indicators: IndicatorSnapshot,
        account: AccountSnapshot,
        open_orders: Vec<Order>,
        fills: Vec<Fill>,
        cancelled: Vec<Order>,
        submissions: Vec<(Vec<Order>, OcaPolicy)>,
        fail_account: bool,
    }

    impl MockBroker {
        fn new(indicators: IndicatorSnapshot, account: AccountSnapshot) -> Self {
            Self {
                indicators,
                account,
                open_orders: Vec::new(),
                fills: Vec::new(),
                cancelled: Vec::new(),
                submissions: Vec::new(),
                fail_account: false,
            }
        }
    }

    impl Broker for MockBroker {
        fn fetch_indicators(
            &mut self,
            _instrument: &Instrument,
        ) -> Result<IndicatorSnapshot, BrokerError> {
            Ok(self.indicators)
        }

        fn fetch_account(
            &mut self,
            _instrument: &Instrument,
        ) -> Result<AccountSnapshot, BrokerError> {
            if self.fail_account {
                return Err(BrokerError::Unavailable("scripted outage".into()));
            }
            Ok(self.account)
        }

        fn list_open_orders(
            &mut self,
            _instrument: &Instrument,
        ) -> Result<Vec<Order>, BrokerError> {
            Ok(self.open_orders.clone())
        }

        fn list_recent_fills(&mut self, _instrument: &Instrument) -> Result<Vec<Fill>, BrokerError> {
            Ok(self.fills.clone())
        }

        fn submit_order_group(
            &mut self,
            _instrument: &Instrument,
            orders: Vec<Order>,
            policy: OcaPolicy,
        ) -> Result<(), BrokerError> {
            self.submissions.push((orders, policy));
            Ok(())
        }

        fn cancel_order(
            &mut self,
            _instrument: &Instrument,
            order: &Order,
        ) -> Result<(), BrokerError> {
            self.cancelled.push(order.clone());
            Ok(())
        }
    }

    fn eurusd() -> Instrument {
        Instrument::new("EUR.USD", "EUR", "USD", 0.00005, ContractId(1))
    }

    fn indicators() -> IndicatorSnapshot {
        IndicatorSnapshot {
            atr: 0.00120,
            long_upper: 1.08453,
            long_lower: 1.06200,
            short_upper: 1.08100,
            short_lower: 1.07000,
        }
    }

    #[test]
    fn flat_unit_submits_both_direction_brackets() {
        let mut broker = MockBroker::new(indicators(), AccountSnapshot::flat(100_000.0));
        let engine = CycleEngine::new(StrategyParams::default());
        let outcome = engine.run_instrument(&mut broker, &eurusd()).unwrap();

        assert_eq!(outcome.state, UnitState::Flat);
        assert_eq!(outcome.submitted.len(), 6);
        assert_eq!(broker.submissions.len(), 1);
        let entries: Vec<_> = outcome.submitted.iter().filter(|o| o.is_entry()).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.oca_group.is_some()));
    }

    #[test]
    fn not_full_unit_pyramids_the_remaining_offsets() {
        let account = AccountSnapshot {
            available_funds: 100_000.0,
            net_position: 400_000, // one slot consumed
            exchange_rate: 1.0,
        };
        let mut broker = MockBroker::new(indicators(), account);
        let engine = CycleEngine::new(StrategyParams::default());
        let outcome = engine.run_instrument(&mut broker, &eurusd()).unwrap();

        assert_eq!(
            outcome.state,
            UnitState::DirectionalNotFull { side: Direction::Long, filled_slots: 1 }
        );
        // Offsets 1, 2, 3: three compound brackets.
        let entries: Vec<_> = outcome.submitted.iter().filter(|o| o.is_entry()).collect();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.role.compound));
        let offsets: Vec<u8> = entries.iter().map(|e| e.role.unit).collect();
        assert_eq!(offsets, vec![1, 2, 3]);
    }

    #[test]
    fn not_full_unit_keeps_a_channel_exit_for_the_filled_quantity() {
        let account = AccountSnapshot {
            available_funds: 100_000.0,
            net_position: 400_000,
            exchange_rate: 1.0,
        };
        let mut broker = MockBroker::new(indicators(), account);
        let engine = CycleEngine::new(StrategyParams::default());
        let outcome = engine.run_instrument(&mut broker, &eurusd()).unwrap();

        let exits: Vec<_> = outcome
            .submitted
            .iter()
            .filter(|o| o.role.leg == Leg::Exit && !o.role.compound)
            .collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].quantity, 400_000);
        // Long channel exit triggers at the short-channel lower bound.
        let cond = exits[0].condition.unwrap();
        assert!((cond.price - 1.07000).abs() < 1e-9);
        assert!(exits[0].parent.is_none());
    }

    #[test]
    fn full_unit_places_no_entries_but_maintains_exit() {
        let account = AccountSnapshot {
            available_funds: 100_000.0,
            net_position: 2_000_000,
            exchange_rate: 1.0,
        };
        let mut broker = MockBroker::new(indicators(), account);
        let engine = CycleEngine::new(StrategyParams::default());
        let outcome = engine.run_instrument(&mut broker, &eurusd()).unwrap();

        assert_eq!(outcome.state, UnitState::DirectionalFull { side: Direction::Long });
        assert!(outcome.submitted.iter().all(|o| !o.is_entry()));
        let exits: Vec<_> = outcome
            .submitted
            .iter()
            .filter(|o| o.role.leg == Leg::Exit)
            .collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].quantity, 2_000_000);
    }

    #[test]
    fn stale_open_orders_are_cancelled_before_resubmission() {
        let mut broker = MockBroker::new(indicators(), AccountSnapshot::flat(100_000.0));
        // Leftover entry bracket from a prior cycle.
        let params = StrategyParams::default();
        let ind = indicators();
        let inst = eurusd();
        let mut seed = BracketBuilder::new(&inst, &ind, &params);
        broker.open_orders = seed.initial_pair(50_000, 0.0024).unwrap();

        let engine = CycleEngine::new(params);
        let outcome = engine.run_instrument(&mut broker, &inst).unwrap();

        assert_eq!(outcome.cancelled, 6);
        assert_eq!(broker.cancelled.len(), 6);
        // Fresh brackets replace them, count unchanged: no duplication.
        assert_eq!(outcome.submitted.len(), 6);
    }

    #[test]
    fn broker_outage_aborts_before_any_submission() {
        let mut broker = MockBroker::new(indicators(), AccountSnapshot::flat(100_000.0));
        broker.fail_account = true;
        let engine = CycleEngine::new(StrategyParams::default());
        let err = engine.run_instrument(&mut broker, &eurusd()).unwrap_err();

        assert!(matches!(err, EngineError::BrokerUnavailable(_)));
        assert!(broker.submissions.is_empty());
        assert!(broker.cancelled.is_empty());
    }

    #[test]
    fn zero_atr_is_an_invalid_stop_distance() {
        let mut broker = MockBroker::new(
            IndicatorSnapshot { atr: 0.0, ..indicators() },
            AccountSnapshot::flat(100_000.0),
        );
        let engine = CycleEngine::new(StrategyParams::default());
        let err = engine.run_instrument(&mut broker, &eurusd()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidStopDistance { .. }));
    }
}
