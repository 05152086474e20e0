//! End-to-end cycles against the simulated broker.
//!
//! Exercises the engine-level invariants that need a live order book:
//! OCA exclusivity of the two initial entries, statelessness across
//! identical cycles, and pyramid progression after a fill.

use shellback_core::domain::{IndicatorSnapshot, Leg, Order, OrderSide, TriggerSide};
use shellback_runner::config::{InstrumentConfig, RunConfig};
use shellback_runner::runner::run_cycle;
use shellback_runner::sim::{SimBroker, SimMarket};

const PAIR: &str = "EUR.USD";

fn indicators() -> IndicatorSnapshot {
    IndicatorSnapshot {
        atr: 0.00120,
        long_upper: 1.08453,
        long_lower: 1.06200,
        short_upper: 1.08100,
        short_lower: 1.07000,
    }
}

fn one_pair_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.instruments = vec![InstrumentConfig::new(
        PAIR, "EUR", "USD", 0.00005, 1, 1.0, 1.0750,
    )];
    config
}

fn sim() -> SimBroker {
    let mut broker = SimBroker::new(100_000.0);
    broker.add_market(
        PAIR,
        SimMarket {
            indicators: indicators(),
            exchange_rate: 1.0,
            price: 1.0750,
        },
    );
    broker
}

/// Shape of an order without cycle-local ids, for cross-cycle comparison.
fn shape(order: &Order) -> (String, OrderSide, u64, Option<(i64, TriggerSide)>, bool) {
    (
        order.role.to_string(),
        order.side,
        order.quantity,
        order
            .condition
            .map(|c| (((c.price / 0.00005).round()) as i64, c.when)),
        order.transmit,
    )
}

#[test]
fn initial_entries_are_mutually_exclusive() {
    let config = one_pair_config();
    let mut broker = sim();
    let report = run_cycle(&mut broker, &config);
    assert_eq!(report.failures(), 0);
    assert_eq!(broker.working_orders(PAIR).len(), 6);

    // Breakout up through the long entry trigger (1.08455).
    broker.set_price(PAIR, 1.08460);
    assert!(broker.net_position(PAIR) > 0);

    // The short ladder hung off the OCA'd short entry: all of it is gone.
    let working = broker.working_orders(PAIR);
    assert!(working
        .iter()
        .all(|o| o.role.to_string().starts_with("long_")));
    // The long stop and exit survive, freed by the entry fill.
    assert_eq!(working.len(), 2);
}

#[test]
fn identical_cycles_submit_identical_orders() {
    let config = one_pair_config();
    let mut broker = sim();

    let first = run_cycle(&mut broker, &config);
    let first_orders: Vec<_> = first.results[0]
        .result
        .as_ref()
        .unwrap()
        .submitted
        .iter()
        .map(shape)
        .collect();
    assert_eq!(broker.working_orders(PAIR).len(), 6);

    // Nothing fills, nothing moves. The next cycle must replace, not
    // accumulate.
    let second = run_cycle(&mut broker, &config);
    let second_orders: Vec<_> = second.results[0]
        .result
        .as_ref()
        .unwrap()
        .submitted
        .iter()
        .map(shape)
        .collect();

    assert_eq!(first_orders, second_orders);
    assert_eq!(broker.working_orders(PAIR).len(), 6);
    assert_eq!(second.results[0].result.as_ref().unwrap().cancelled, 6);
}

#[test]
fn a_filled_entry_pyramids_on_the_next_cycle() {
    let config = one_pair_config();
    let mut broker = sim();
    run_cycle(&mut broker, &config);

    // Fill the long entry.
    broker.set_price(PAIR, 1.08460);
    let net_after_entry = broker.net_position(PAIR);
    assert!(net_after_entry > 0);

    let second = run_cycle(&mut broker, &config);
    let outcome = second.results[0].result.as_ref().unwrap();

    // One slot consumed: compound brackets at offsets 1..3, plus the
    // retained protective stop for the filled leg.
    let entries: Vec<_> = outcome.submitted.iter().filter(|o| o.is_entry()).collect();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.role.compound));
    let offsets: Vec<u8> = entries.iter().map(|e| e.role.unit).collect();
    assert_eq!(offsets, vec![1, 2, 3]);

    let retained_stops: Vec<_> = outcome
        .submitted
        .iter()
        .filter(|o| o.role.leg == Leg::Stop && !o.role.compound)
        .collect();
    assert_eq!(retained_stops.len(), 1);
    assert_eq!(retained_stops[0].quantity as i64, net_after_entry);

    // The filled quantity keeps its channel exit alongside the pyramid.
    let exits: Vec<_> = outcome
        .submitted
        .iter()
        .filter(|o| o.role.leg == Leg::Exit && !o.role.compound)
        .collect();
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].quantity as i64, net_after_entry);

    // Position is untouched by the reshuffle.
    assert_eq!(broker.net_position(PAIR), net_after_entry);
}

#[test]
fn pyramiding_steady_state_replaces_without_growing_or_trading() {
    let config = one_pair_config();
    let mut broker = sim();
    run_cycle(&mut broker, &config);

    broker.set_price(PAIR, 1.08460);
    let net = broker.net_position(PAIR);
    assert!(net > 0);

    // Nothing moves between cycles: each rebuild must produce the same
    // order set, leave the book the same size, and never touch the
    // position (a naked stop firing here would reverse it).
    let second = run_cycle(&mut broker, &config);
    let second_shapes: Vec<_> = second.results[0]
        .result
        .as_ref()
        .unwrap()
        .submitted
        .iter()
        .map(shape)
        .collect();
    assert_eq!(broker.net_position(PAIR), net);
    let book_size = broker.working_orders(PAIR).len();

    let third = run_cycle(&mut broker, &config);
    let third_shapes: Vec<_> = third.results[0]
        .result
        .as_ref()
        .unwrap()
        .submitted
        .iter()
        .map(shape)
        .collect();

    assert_eq!(second_shapes, third_shapes);
    assert_eq!(broker.working_orders(PAIR).len(), book_size);
    assert_eq!(broker.net_position(PAIR), net);
}

#[test]
fn compound_entries_trigger_strictly_farther_out() {
    let config = one_pair_config();
    let mut broker = sim();
    run_cycle(&mut broker, &config);
    broker.set_price(PAIR, 1.08460);

    let second = run_cycle(&mut broker, &config);
    let outcome = second.results[0].result.as_ref().unwrap();

    let mut entry_prices: Vec<f64> = outcome
        .submitted
        .iter()
        .filter(|o| o.is_entry())
        .map(|o| o.condition.unwrap().price)
        .collect();
    let sorted = {
        let mut s = entry_prices.clone();
        s.sort_by(|a, b| a.partial_cmp(b).unwrap());
        s
    };
    assert_eq!(entry_prices, sorted);
    entry_prices.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    assert_eq!(entry_prices.len(), 3);
}

#[test]
fn whipsaw_ladder_rearms_after_a_stop_out() {
    let mut config = one_pair_config();
    config.strategy.whipsaw_reentry = true;
    config.strategy.reentry_depth = 3;
    let mut broker = sim();

    let report = run_cycle(&mut broker, &config);
    assert_eq!(report.failures(), 0);
    // 9 per direction.
    assert_eq!(broker.working_orders(PAIR).len(), 18);

    // Enter long, then stop out (entry 1.08455, stop 1.08215).
    broker.set_price(PAIR, 1.08460);
    assert!(broker.net_position(PAIR) > 0);
    broker.set_price(PAIR, 1.08210);
    assert_eq!(broker.net_position(PAIR), 0);

    // The stop-out freed the second long attempt; a fresh breakout fills
    // it without waiting for the next cycle.
    broker.set_price(PAIR, 1.08460);
    assert!(broker.net_position(PAIR) > 0);
}
