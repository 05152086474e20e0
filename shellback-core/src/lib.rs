//! Shellback Core: turtle-style bracket construction engine for currency
//! pairs.
//!
//! The crate turns externally supplied indicator and account snapshots into
//! a mutually consistent set of linked broker orders, every cycle, from
//! scratch:
//! - Domain types (instruments, order legs, trigger conditions, snapshots)
//! - Position sizing from a risk budget and a stop distance
//! - Three-legged bracket construction with pyramid offsets and OCA linkage
//! - Unit state classification derived purely from broker-reported state
//! - Stop reconciliation (dedup + cancel-and-rebuild)
//!
//! All I/O lives behind the [`broker::Broker`] trait; the engine itself is
//! synchronous, single-threaded, and stateless across cycles.

pub mod broker;
pub mod domain;
pub mod engine;
