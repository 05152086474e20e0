//! Cycle driver: walk the configured instruments sequentially, one full
//! reconciliation window each, with per-instrument fault containment.
//!
//! One instrument's failure never aborts the others; the error is logged
//! with the instrument and cause, the unit is left as the broker knows it,
//! and the next cycle re-evaluates from scratch.

use crate::config::RunConfig;
use chrono::{DateTime, Utc};
use shellback_core::broker::Broker;
use shellback_core::engine::{CycleEngine, CycleOutcome, EngineError};
use tracing::{error, info};

/// Outcome of one instrument within a cycle.
#[derive(Debug)]
pub struct InstrumentResult {
    pub pair: String,
    pub result: Result<CycleOutcome, EngineError>,
}

/// Summary of one full pass over the instrument book.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub results: Vec<InstrumentResult>,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_err()).count()
    }

    pub fn orders_submitted(&self) -> usize {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref().ok())
            .map(|o| o.submitted.len())
            .sum()
    }

    pub fn orders_cancelled(&self) -> usize {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref().ok())
            .map(|o| o.cancelled)
            .sum()
    }
}

/// Run one cycle over every configured instrument.
pub fn run_cycle(broker: &mut dyn Broker, config: &RunConfig) -> CycleReport {
    let engine = CycleEngine::new(config.strategy.clone());
    let book = config.instrument_book();
    let started_at = Utc::now();
    info!(instruments = book.len(), "beginning trading cycle");

    let mut results = Vec::with_capacity(book.len());
    for instrument in book.iter() {
        let result = engine.run_instrument(broker, instrument);
        if let Err(err) = &result {
            error!(pair = %instrument.pair, %err, "instrument cycle failed, skipping");
        }
        results.push(InstrumentResult {
            pair: instrument.pair.clone(),
            result,
        });
    }

    let report = CycleReport { started_at, results };
    info!(
        submitted = report.orders_submitted(),
        cancelled = report.orders_cancelled(),
        failures = report.failures(),
        "cycle finished"
    );
    report
}
