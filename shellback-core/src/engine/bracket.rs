//! Bracket construction: the three-legged entry / stop / exit order group
//! for one directional attempt, with offset support for pyramiding.
//!
//! Long and short are one parametrized path keyed by `Direction`; all price
//! arithmetic runs through `Direction::sign()` so the short side is the
//! exact mirror of the long side rather than a copy-pasted branch.

use super::{EngineError, StrategyParams};
use crate::domain::{
    Direction, IndicatorSnapshot, Instrument, Leg, OcaGroupId, Order, OrderId, OrderRole,
    TriggerCondition,
};

/// One directional attempt: entry, protective stop, channel exit.
///
/// The stop and exit are children of the entry (they only activate once it
/// fills) and the exit carries the transmit flag, so the broker receives
/// the group atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    pub entry: Order,
    pub stop: Order,
    pub exit: Order,
}

impl Bracket {
    pub fn into_orders(self) -> Vec<Order> {
        vec![self.entry, self.stop, self.exit]
    }
}

/// Builds brackets for one instrument from the current indicator snapshot.
///
/// Orders get cycle-local ids from an internal sequence; the builder is
/// created fresh each cycle along with everything it emits.
pub struct BracketBuilder<'a> {
    instrument: &'a Instrument,
    indicators: &'a IndicatorSnapshot,
    params: &'a StrategyParams,
    next_id: u64,
    next_oca_seq: u64,
}

impl<'a> BracketBuilder<'a> {
    pub fn new(
        instrument: &'a Instrument,
        indicators: &'a IndicatorSnapshot,
        params: &'a StrategyParams,
    ) -> Self {
        Self {
            instrument,
            indicators,
            params,
            next_id: 1,
            next_oca_seq: 1,
        }
    }

    /// Continue the id sequence past ids the broker already knows (open
    /// orders, recent fills), so a rebuilt order can never collide with a
    /// prior cycle's linkage.
    pub fn start_ids_at(&mut self, first: u64) {
        self.next_id = self.next_id.max(first);
    }

    pub fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn new_oca_group(&mut self) -> OcaGroupId {
        let id = OcaGroupId::new(&self.instrument.pair, self.next_oca_seq);
        self.next_oca_seq += 1;
        id
    }

    /// Entry trigger for a direction at a pyramid offset: the long-channel
    /// bound pushed `offset` stop-distances in the favorable direction.
    /// Offset 0 is the raw breakout; offsets 1..3 are pyramid additions
    /// that only trigger after price has already moved one more
    /// stop-distance the trade's way. Add to winners, never to losers.
    fn entry_price(
        &self,
        direction: Direction,
        offset: u8,
        stop_distance: f64,
    ) -> Result<f64, EngineError> {
        let channel = match direction {
            Direction::Long => self.indicators.long_upper,
            Direction::Short => self.indicators.long_lower,
        };
        let raw = channel + direction.sign() * offset as f64 * stop_distance;
        Ok(self.instrument.quantize(raw)?)
    }

    /// Exit trigger: the opposite short-channel bound, shifted by the same
    /// offset so a pyramided leg gives back proportionally less before it
    /// exits.
    fn exit_price(
        &self,
        direction: Direction,
        offset: u8,
        stop_distance: f64,
    ) -> Result<f64, EngineError> {
        let channel = match direction {
            Direction::Long => self.indicators.short_lower,
            Direction::Short => self.indicators.short_upper,
        };
        let raw = channel + direction.sign() * offset as f64 * stop_distance;
        Ok(self.instrument.quantize(raw)?)
    }

    /// Build one directional bracket.
    ///
    /// For long: entry at-or-above the offset long-channel upper bound,
    /// stop one stop-distance below the entry (at-or-below), exit at the
    /// offset short-channel lower bound (at-or-below). Short is the exact
    /// mirror. The exit leg transmits.
    pub fn directional(
        &mut self,
        direction: Direction,
        offset: u8,
        quantity: u64,
        stop_distance: f64,
        compound: bool,
    ) -> Result<Bracket, EngineError> {
        let entry_price = self.entry_price(direction, offset, stop_distance)?;
        let stop_price = self
            .instrument
            .quantize(entry_price - direction.sign() * stop_distance)?;
        let exit_price = self.exit_price(direction, offset, stop_distance)?;

        let (entry_cond, closing_cond): (TriggerCondition, fn(f64) -> TriggerCondition) =
            match direction {
                Direction::Long => (
                    TriggerCondition::at_or_above(entry_price),
                    TriggerCondition::at_or_below,
                ),
                Direction::Short => (
                    TriggerCondition::at_or_below(entry_price),
                    TriggerCondition::at_or_above,
                ),
            };

        // The two closing legs cancel each other: whichever of stop/exit
        // fires first takes the leg off, the sibling must not fire too.
        let protect_oca = self.new_oca_group();

        let entry_id = self.next_id();
        let entry = Order {
            id: entry_id,
            side: direction.entry_side(),
            quantity,
            condition: Some(entry_cond),
            parent: None,
            transmit: false,
            role: OrderRole::new(direction, Leg::Entry, offset, compound),
            oca_group: None,
            breakeven: None,
        };

        let stop = Order {
            id: self.next_id(),
            side: direction.closing_side(),
            quantity,
            condition: Some(closing_cond(stop_price)),
            parent: Some(entry_id),
            transmit: false,
            role: OrderRole::new(direction, Leg::Stop, offset, compound),
            oca_group: Some(protect_oca.clone()),
            breakeven: self.params.breakeven_adjust.then_some(entry_price),
        };

        let exit = Order {
            id: self.next_id(),
            side: direction.closing_side(),
            quantity,
            condition: Some(closing_cond(exit_price)),
            parent: Some(entry_id),
            transmit: true,
            role: OrderRole::new(direction, Leg::Exit, offset, compound),
            oca_group: Some(protect_oca),
            breakeven: None,
        };

        Ok(Bracket { entry, stop, exit })
    }

    /// Chain `depth` attempts of the offset-0 bracket behind each other:
    /// attempt N+1's entry is a child of attempt N's stop leg, so a
    /// stop-out re-arms the breakout instead of leaving the unit asleep
    /// until the next cycle (whipsaw protection). Only the final exit leg
    /// transmits.
    pub fn reentry_ladder(
        &mut self,
        direction: Direction,
        quantity: u64,
        stop_distance: f64,
        depth: u8,
    ) -> Result<Vec<Order>, EngineError> {
        let depth = depth.max(1);
        let mut orders = Vec::with_capacity(depth as usize * 3);
        let mut prior_stop: Option<OrderId> = None;

        for attempt in 0..depth {
            let mut bracket = self.directional(direction, 0, quantity, stop_distance, false)?;
            // Unit index doubles as the attempt index on ladder legs.
            bracket.entry.role.unit = attempt;
            bracket.stop.role.unit = attempt;
            bracket.exit.role.unit = attempt;
            if let Some(stop_id) = prior_stop {
                bracket.entry.parent = Some(stop_id);
            }
            bracket.exit.transmit = attempt + 1 == depth;
            prior_stop = Some(bracket.stop.id);
            orders.extend(bracket.into_orders());
        }
        Ok(orders)
    }

    /// Initial entries for a flat unit: one ladder per direction, with the
    /// two first entries sharing an OCA group so only the first-triggered
    /// breakout survives: enter long OR short, whichever breaks out
    /// first, never both.
    pub fn initial_pair(
        &mut self,
        quantity: u64,
        stop_distance: f64,
    ) -> Result<Vec<Order>, EngineError> {
        let depth = if self.params.whipsaw_reentry {
            self.params.reentry_depth
        } else {
            1
        };
        let mut long = self.reentry_ladder(Direction::Long, quantity, stop_distance, depth)?;
        let mut short = self.reentry_ladder(Direction::Short, quantity, stop_distance, depth)?;

        let oca = self.new_oca_group();
        long[0].oca_group = Some(oca.clone());
        short[0].oca_group = Some(oca);

        long.append(&mut short);
        Ok(long)
    }

    /// A pyramid addition at the given offset. Role tags carry the
    /// compound marker so the reconciler can tell these from base legs.
    pub fn compound(
        &mut self,
        direction: Direction,
        offset: u8,
        quantity: u64,
        stop_distance: f64,
    ) -> Result<Bracket, EngineError> {
        self.directional(direction, offset, quantity, stop_distance, true)
    }

    /// Unconditional exit sized to the full net position, used to flatten
    /// a unit entirely.
    pub fn exit_all(&mut self, direction: Direction, net_units: u64) -> Order {
        Order {
            id: self.next_id(),
            side: direction.closing_side(),
            quantity: net_units,
            condition: None,
            parent: None,
            transmit: true,
            role: OrderRole::new(direction, Leg::Exit, 0, false),
            oca_group: None,
            breakeven: None,
        }
    }

    /// Conditional exit for the full net position at the short-channel
    /// bound. Maintained for a full unit, which places no new entries.
    pub fn full_position_exit(
        &mut self,
        direction: Direction,
        net_units: u64,
    ) -> Result<Order, EngineError> {
        let price = self.exit_price(direction, 0, 0.0)?;
        let cond = match direction {
            Direction::Long => TriggerCondition::at_or_below(price),
            Direction::Short => TriggerCondition::at_or_above(price),
        };
        Ok(Order {
            id: self.next_id(),
            side: direction.closing_side(),
            quantity: net_units,
            condition: Some(cond),
            parent: None,
            transmit: true,
            role: OrderRole::new(direction, Leg::Exit, 0, false),
            oca_group: None,
            breakeven: None,
        })
    }
}
