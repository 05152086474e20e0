//! Shellback Runner: configuration, logging, the cycle driver, and the
//! simulated broker.
//!
//! The core engine decides; this crate wires it to the world: TOML config
//! with the strategy knobs and instrument book, tracing initialization,
//! a sequential multi-instrument cycle with per-instrument fault
//! containment, and an in-memory broker for dry runs and tests.

pub mod config;
pub mod logging;
pub mod runner;
pub mod sim;

pub use config::{ConfigError, InstrumentConfig, LogConfig, RunConfig};
pub use runner::{run_cycle, CycleReport, InstrumentResult};
pub use sim::{SimBroker, SimMarket};
