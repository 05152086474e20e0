//! Order legs, trigger conditions, role tags, and OCA groups.
//!
//! Every order the engine emits is a conditional market order: it rests at
//! the broker until its price condition is met, then fills at market. Legs
//! are linked through `parent` (a child only activates once its parent
//! fills) and through OCA membership (first fill cancels the siblings).

use super::ids::{OcaGroupId, OrderId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Directional bias of a unit or bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side of an entry order in this direction.
    pub fn entry_side(self) -> OrderSide {
        match self {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }

    /// Side of a stop or exit order in this direction.
    pub fn closing_side(self) -> OrderSide {
        self.entry_side().opposite()
    }

    /// +1 for long, -1 for short. Price offsets are applied along this sign.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("long"),
            Direction::Short => f.write_str("short"),
        }
    }
}

/// "Trigger when price is at-or-above / at-or-below the threshold."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSide {
    AtOrAbove,
    AtOrBelow,
}

impl TriggerSide {
    pub fn is_met(self, threshold: f64, price: f64) -> bool {
        match self {
            TriggerSide::AtOrAbove => price >= threshold,
            TriggerSide::AtOrBelow => price <= threshold,
        }
    }
}

/// Price condition attached to an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub price: f64,
    pub when: TriggerSide,
}

impl TriggerCondition {
    pub fn at_or_above(price: f64) -> Self {
        Self { price, when: TriggerSide::AtOrAbove }
    }

    pub fn at_or_below(price: f64) -> Self {
        Self { price, when: TriggerSide::AtOrBelow }
    }

    pub fn is_met(&self, price: f64) -> bool {
        self.when.is_met(self.price, price)
    }
}

/// Which leg of a bracket an order is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    Entry,
    Stop,
    Exit,
}

/// Role tag carried by every order so the reconciler (and a human reading
/// the broker blotter) can tell legs apart across cycles.
///
/// Renders as e.g. `long_entry`, `short_sl_2`, `long_exit_1_compound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderRole {
    pub direction: Direction,
    pub leg: Leg,
    /// Pyramid unit index (0 = initial entry).
    pub unit: u8,
    /// Marks pyramid additions, distinguishing them from base legs.
    pub compound: bool,
}

impl OrderRole {
    pub fn new(direction: Direction, leg: Leg, unit: u8, compound: bool) -> Self {
        Self { direction, leg, unit, compound }
    }
}

impl fmt::Display for OrderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leg = match self.leg {
            Leg::Entry => "entry",
            Leg::Stop => "sl",
            Leg::Exit => "exit",
        };
        write!(f, "{}_{}", self.direction, leg)?;
        if self.unit > 0 {
            write!(f, "_{}", self.unit)?;
        }
        if self.compound {
            f.write_str("_compound")?;
        }
        Ok(())
    }
}

/// Cancellation policy for an OCA group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcaPolicy {
    /// First fill (or cancel) cancels every sibling.
    CancelAll,
    /// A partial fill reduces sibling quantities instead of cancelling.
    ReduceSize,
}

/// One leg of a bracket, as submitted to the broker collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    /// Positive whole units of the instrument's base currency.
    pub quantity: u64,
    /// Price condition; `None` means fire unconditionally (exit-all).
    pub condition: Option<TriggerCondition>,
    /// Child legs activate only after the parent fills.
    pub parent: Option<OrderId>,
    /// Whether this leg releases the group to the broker. Only the final
    /// leg of a bracket transmits, so the group arrives atomically.
    pub transmit: bool,
    pub role: OrderRole,
    pub oca_group: Option<OcaGroupId>,
    /// Breakeven adjustment: once price has moved one stop-distance in the
    /// trade's favor, the protective stop is moved to this price. `None`
    /// (the default) leaves the stop where it was built.
    pub breakeven: Option<f64>,
}

impl Order {
    pub fn is_stop(&self) -> bool {
        self.role.leg == Leg::Stop
    }

    pub fn is_entry(&self) -> bool {
        self.role.leg == Leg::Entry
    }
}
