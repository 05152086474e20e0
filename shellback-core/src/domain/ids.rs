//! Identifier newtypes for order linkage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cycle-local order identifier.
///
/// Orders are rebuilt from scratch every cycle, so ids only need to be
/// unique within one submitted group: they exist to express parent/child
/// linkage before the broker has assigned its own wire ids. The broker
/// collaborator is expected to map them onto whatever its protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Broker contract identifier for an instrument (used in price conditions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub i64);

/// One-cancels-all group membership.
///
/// Formatted as `OCA_<pair>_<seq>` so a human reading the broker's order
/// blotter can tell which instrument a group belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OcaGroupId(pub String);

impl OcaGroupId {
    pub fn new(pair: &str, seq: u64) -> Self {
        Self(format!("OCA_{pair}_{seq}"))
    }
}

impl fmt::Display for OcaGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
