//! Domain types: instruments, orders, snapshots, identifiers.

pub mod ids;
pub mod instrument;
pub mod order;
pub mod snapshot;

pub use ids::{ContractId, OcaGroupId, OrderId};
pub use instrument::{Instrument, InstrumentBook, InstrumentError};
pub use order::{
    Direction, Leg, OcaPolicy, Order, OrderRole, OrderSide, TriggerCondition, TriggerSide,
};
pub use snapshot::{AccountSnapshot, Fill, IndicatorSnapshot};
