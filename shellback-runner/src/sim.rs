//! In-memory broker simulation.
//!
//! Implements the engine's `Broker` seam well enough to exercise the whole
//! cycle without a live session: conditional orders rest until a driven
//! price meets them, children activate when their parent fills, and an OCA
//! fill takes the siblings (and their descendants) off the book. Used by
//! the CLI's dry-run mode and the integration tests.

use crate::config::RunConfig;
use shellback_core::broker::{Broker, BrokerError};
use shellback_core::domain::{
    AccountSnapshot, Fill, IndicatorSnapshot, Instrument, OcaPolicy, Order, OrderId,
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimStatus {
    Working,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone)]
struct SimOrder {
    order: Order,
    status: SimStatus,
}

#[derive(Debug, Default)]
struct SimBook {
    orders: Vec<SimOrder>,
    fills: Vec<Fill>,
    net_position: i64,
}

/// Market inputs for one pair.
#[derive(Debug, Clone)]
pub struct SimMarket {
    pub indicators: IndicatorSnapshot,
    pub exchange_rate: f64,
    pub price: f64,
}

impl SimMarket {
    /// Synthetic but plausible indicator values around a mid price, for
    /// dry runs where no real bar history exists.
    pub fn synthetic(price: f64, exchange_rate: f64) -> Self {
        Self {
            indicators: IndicatorSnapshot {
                atr: price * 0.001,
                long_upper: price * 1.02,
                long_lower: price * 0.98,
                short_upper: price * 1.01,
                short_lower: price * 0.99,
            },
            exchange_rate,
            price,
        }
    }
}

/// Simulated broker account: one set of funds, one book per pair.
///
/// Available funds are held constant across fills, good enough for
/// exercising sizing and state classification, which only read them.
pub struct SimBroker {
    available_funds: f64,
    markets: HashMap<String, SimMarket>,
    books: HashMap<String, SimBook>,
}

impl SimBroker {
    pub fn new(available_funds: f64) -> Self {
        Self {
            available_funds,
            markets: HashMap::new(),
            books: HashMap::new(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        let mut broker = Self::new(config.account.available_funds);
        for inst in &config.instruments {
            broker.add_market(
                &inst.pair,
                SimMarket::synthetic(inst.start_price, inst.exchange_rate),
            );
        }
        broker
    }

    pub fn add_market(&mut self, pair: &str, market: SimMarket) {
        self.markets.insert(pair.to_string(), market);
        self.books.entry(pair.to_string()).or_default();
    }

    pub fn set_indicators(&mut self, pair: &str, indicators: IndicatorSnapshot) {
        if let Some(market) = self.markets.get_mut(pair) {
            market.indicators = indicators;
        }
    }

    /// Move the driven price and let resting orders react.
    pub fn set_price(&mut self, pair: &str, price: f64) {
        if let Some(market) = self.markets.get_mut(pair) {
            market.price = price;
        }
        self.evaluate(pair);
    }

    /// Working orders currently on the book for a pair.
    pub fn working_orders(&self, pair: &str) -> Vec<Order> {
        self.books
            .get(pair)
            .map(|b| {
                b.orders
                    .iter()
                    .filter(|o| o.status == SimStatus::Working)
                    .map(|o| o.order.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn net_position(&self, pair: &str) -> i64 {
        self.books.get(pair).map(|b| b.net_position).unwrap_or(0)
    }

    fn market(&self, pair: &str) -> Result<&SimMarket, BrokerError> {
        self.markets
            .get(pair)
            .ok_or_else(|| BrokerError::NoData(pair.to_string()))
    }

    /// Repeatedly fill whatever is eligible at the current price until the
    /// book settles. Child legs become eligible the moment their parent
    /// fills, so a breakout entry and its freed stop are handled in one
    /// pass.
    fn evaluate(&mut self, pair: &str) {
        let price = match self.markets.get(pair) {
            Some(m) => m.price,
            None => return,
        };
        let Some(book) = self.books.get_mut(pair) else {
            return;
        };

        loop {
            let next = book.orders.iter().position(|so| {
                so.status == SimStatus::Working
                    && parent_filled(&book.orders, so.order.parent)
                    && so.order.condition.map_or(true, |c| c.is_met(price))
            });
            let Some(idx) = next else { break };

            let (id, side, qty, cond, oca) = {
                let so = &mut book.orders[idx];
                so.status = SimStatus::Filled;
                (
                    so.order.id,
                    so.order.side,
                    so.order.quantity,
                    so.order.condition,
                    so.order.oca_group.clone(),
                )
            };

            let fill_price = cond.map_or(price, |c| c.price);
            book.fills.push(Fill {
                order_id: id,
                quantity: qty,
                avg_price: fill_price,
            });
            let signed = match side {
                shellback_core::domain::OrderSide::Buy => qty as i64,
                shellback_core::domain::OrderSide::Sell => -(qty as i64),
            };
            book.net_position += signed;
            debug!(pair, order = %id, fill_price, net = book.net_position, "sim fill");

            // OCA: first fill cancels the siblings (and their children).
            if let Some(group) = oca {
                let siblings: Vec<OrderId> = book
                    .orders
                    .iter()
                    .filter(|o| {
                        o.status == SimStatus::Working && o.order.oca_group.as_ref() == Some(&group)
                    })
                    .map(|o| o.order.id)
                    .collect();
                for sib in siblings {
                    cancel_cascade(&mut book.orders, sib);
                }
            }
        }
    }
}

fn parent_filled(orders: &[SimOrder], parent: Option<OrderId>) -> bool {
    match parent {
        None => true,
        Some(pid) => orders
            .iter()
            .any(|o| o.order.id == pid && o.status == SimStatus::Filled),
    }
}

/// Cancel an order and, recursively, its working children.
fn cancel_cascade(orders: &mut Vec<SimOrder>, id: OrderId) {
    if let Some(so) = orders.iter_mut().find(|o| o.order.id == id) {
        if so.status != SimStatus::Working {
            return;
        }
        so.status = SimStatus::Cancelled;
    } else {
        return;
    }
    let children: Vec<OrderId> = orders
        .iter()
        .filter(|o| o.status == SimStatus::Working && o.order.parent == Some(id))
        .map(|o| o.order.id)
        .collect();
    for child in children {
        cancel_cascade(orders, child);
    }
}

impl Broker for SimBroker {
    fn fetch_indicators(
        &mut self,
        instrument: &Instrument,
    ) -> Result<IndicatorSnapshot, BrokerError> {
        Ok(self.market(&instrument.pair)?.indicators)
    }

    fn fetch_account(&mut self, instrument: &Instrument) -> Result<AccountSnapshot, BrokerError> {
        let rate = self.market(&instrument.pair)?.exchange_rate;
        Ok(AccountSnapshot {
            available_funds: self.available_funds,
            net_position: self.net_position(&instrument.pair),
            exchange_rate: rate,
        })
    }

    fn list_open_orders(&mut self, instrument: &Instrument) -> Result<Vec<Order>, BrokerError> {
        self.market(&instrument.pair)?;
        Ok(self.working_orders(&instrument.pair))
    }

    fn list_recent_fills(&mut self, instrument: &Instrument) -> Result<Vec<Fill>, BrokerError> {
        self.market(&instrument.pair)?;
        Ok(self
            .books
            .get(&instrument.pair)
            .map(|b| b.fills.clone())
            .unwrap_or_default())
    }

    /// Fills here are all-or-nothing, so `ReduceSize` never diverges from
    /// `CancelAll`: a partial fill is the only case where the policies
    /// differ, and the sim never produces one.
    fn submit_order_group(
        &mut self,
        instrument: &Instrument,
        orders: Vec<Order>,
        _policy: OcaPolicy,
    ) -> Result<(), BrokerError> {
        self.market(&instrument.pair)?;
        if !orders.is_empty() && !orders.iter().any(|o| o.transmit) {
            return Err(BrokerError::Rejected {
                order_id: orders[0].id,
                reason: "group has no transmitting leg".to_string(),
            });
        }
        let book = self.books.entry(instrument.pair.clone()).or_default();
        for order in orders {
            book.orders.push(SimOrder {
                order,
                status: SimStatus::Working,
            });
        }
        // Unconditional legs (exit-all) execute on arrival.
        self.evaluate(&instrument.pair);
        Ok(())
    }

    fn cancel_order(&mut self, instrument: &Instrument, order: &Order) -> Result<(), BrokerError> {
        let book = self
            .books
            .get_mut(&instrument.pair)
            .ok_or_else(|| BrokerError::NoData(instrument.pair.clone()))?;
        let known = book.orders.iter().any(|o| o.order.id == order.id);
        if !known {
            return Err(BrokerError::Rejected {
                order_id: order.id,
                reason: "unknown order".to_string(),
            });
        }
        // Cancelling an order that already filled or was swept by an OCA
        // sibling is benign; the cascade no-ops on non-working orders.
        cancel_cascade(&mut book.orders, order.id);
        Ok(())
    }
}
