//! Consumers of finished searches.
//!
//! A sink only reads a [`SearchOutcome`]; nothing flows back into the search.

use log::{info, warn};
use scout_core::time::{TimeError, format_utc};
use thiserror::Error;

use crate::search::SearchOutcome;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("epoch formatting failed: {0}")]
    Time(#[from] TimeError),
    #[error("render failed: {0}")]
    Render(String),
}

pub trait SearchSink {
    fn consume(&mut self, outcome: &SearchOutcome) -> Result<(), SinkError>;
}

impl<T: SearchSink + ?Sized> SearchSink for Box<T> {
    fn consume(&mut self, outcome: &SearchOutcome) -> Result<(), SinkError> {
        (**self).consume(outcome)
    }
}

/// Feed one outcome to every sink in order, stopping at the first failure.
pub fn dispatch(outcome: &SearchOutcome, sinks: &mut [Box<dyn SearchSink + '_>]) -> Result<(), SinkError> {
    for sink in sinks.iter_mut() {
        sink.consume(outcome)?;
    }
    Ok(())
}

/// Logs the best transfer and the scan counters.
#[derive(Debug, Clone)]
pub struct LogSink {
    label: String,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl SearchSink for LogSink {
    fn consume(&mut self, outcome: &SearchOutcome) -> Result<(), SinkError> {
        let stats = &outcome.stats;
        info!(
            "[{}] {} cells: {} feasible, {} filtered, {} ephemeris failures, {} solver failures, {} empty",
            self.label,
            stats.cells,
            stats.feasible,
            stats.filtered,
            stats.ephemeris_failures,
            stats.solver_failures,
            stats.empty_cells
        );

        let Some(best) = &outcome.best else {
            warn!("[{}] no feasible transfer found", self.label);
            return Ok(());
        };

        info!(
            "[{}] best: depart {} arrive {} ({:.1} days), branch {} with {} revolution(s)",
            self.label,
            format_utc(best.departure_epoch)?,
            format_utc(best.arrival_epoch)?,
            best.time_of_flight_days(),
            best.branch_index,
            best.revolutions
        );
        info!(
            "[{}] delta-v: departure {:.3} km/s, arrival {:.3} km/s, total {:.3} km/s",
            self.label, best.departure_dv_km_s, best.arrival_dv_km_s, best.total_dv_km_s
        );
        Ok(())
    }
}
