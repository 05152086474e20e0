//! The broker collaborator: the one external seam of the engine.
//!
//! Everything the engine knows about the world (indicator values, account
//! state, the open order book) arrives through this trait, and every order
//! it decides on leaves through it. Calls are blocking request/response;
//! the engine never retries on its own (a failed call aborts the
//! instrument's cycle and the next cycle re-derives everything fresh).

use crate::domain::{
    AccountSnapshot, Fill, IndicatorSnapshot, Instrument, OcaPolicy, Order, OrderId,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("broker rejected order {order_id}: {reason}")]
    Rejected { order_id: OrderId, reason: String },

    #[error("no data for instrument {0}")]
    NoData(String),
}

/// Synchronous broker collaborator.
///
/// Implementations own all I/O. The engine treats reported state as the
/// single system of record: it re-fetches funds, positions, and open orders
/// every cycle rather than caching, so external fills and manual
/// interventions are picked up naturally.
pub trait Broker {
    /// Latest ATR and channel bounds for the instrument.
    fn fetch_indicators(&mut self, instrument: &Instrument)
        -> Result<IndicatorSnapshot, BrokerError>;

    /// Available funds, net position, and exchange rate for the instrument.
    fn fetch_account(&mut self, instrument: &Instrument) -> Result<AccountSnapshot, BrokerError>;

    /// All currently open (unfilled, uncancelled) orders for the instrument.
    fn list_open_orders(&mut self, instrument: &Instrument) -> Result<Vec<Order>, BrokerError>;

    /// Fills reported since the position was last flat.
    fn list_recent_fills(&mut self, instrument: &Instrument) -> Result<Vec<Fill>, BrokerError>;

    /// Atomically link and transmit a bracket / OCA group.
    ///
    /// Parent references and OCA membership inside `orders` are resolved by
    /// the implementation; nothing is live until the transmitting leg is
    /// accepted.
    fn submit_order_group(
        &mut self,
        instrument: &Instrument,
        orders: Vec<Order>,
        policy: OcaPolicy,
    ) -> Result<(), BrokerError>;

    /// Cancel one open order.
    fn cancel_order(&mut self, instrument: &Instrument, order: &Order) -> Result<(), BrokerError>;
}
