//! CSV and JSON sinks for finished searches.

use std::io::Write;
use std::path::PathBuf;

use log::info;
use scout_core::time::{TimeError, format_utc};
use scout_export::porkchop::{self, Record};
use scout_export::summary::{self, BestLeg, Metadata, Reference, ScanCounts, WindowEntry};
use scout_export::writer_for_path;
use scout_transfer::windows::{departure_profile, launch_windows};
use scout_transfer::{BestTransfer, CostModel, SearchOutcome, SearchScenario, SearchSink, SinkError};

/// Writes one CSV row per grid cell, infeasible cells included.
#[derive(Debug, Clone)]
pub struct CsvSink {
    output: PathBuf,
}

impl CsvSink {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self { output: output.into() }
    }
}

impl SearchSink for CsvSink {
    fn consume(&mut self, outcome: &SearchOutcome) -> Result<(), SinkError> {
        let mut writer = writer_for_path(&self.output)?;
        porkchop::write_header(writer.as_mut())?;

        let axis = outcome.arrival_axis.values();
        for (i, &departure) in outcome.departure_epochs.iter().enumerate() {
            let departure_utc = format_utc(departure)?;
            for (j, &axis_value) in axis.iter().enumerate() {
                let arrival = outcome.arrival_epoch(i, j);
                let arrival_utc = format_utc(arrival)?;
                Record {
                    departure_index: i,
                    arrival_index: j,
                    departure_mjd2000: departure,
                    arrival_mjd2000: arrival,
                    departure_utc: &departure_utc,
                    arrival_utc: &arrival_utc,
                    tof_days: arrival - departure,
                    axis_value,
                    axis_kind: outcome.arrival_axis.label(),
                    dv_total_km_s: outcome.grid.get(i, j),
                }
                .write_to(writer.as_mut())?;
            }
        }
        writer.flush()?;
        info!("wrote porkchop CSV {}", self.output.display());
        Ok(())
    }
}

/// Writes the best transfer, scan counters, reference estimate and launch windows.
#[derive(Debug, Clone)]
pub struct JsonSink {
    output: PathBuf,
    scenario: String,
    origin: String,
    target: String,
    cost: CostModel,
    max_revolutions: u32,
    reference: Option<Reference>,
    window_threshold_km_s: Option<f64>,
}

impl JsonSink {
    pub fn for_scenario(output: impl Into<PathBuf>, scenario: &SearchScenario) -> Self {
        use scout_transfer::ephem::Ephemeris;

        let reference = scenario.hohmann_reference().map(|estimate| Reference {
            hohmann_total_dv_km_s: estimate.total_dv_km_s,
            hohmann_tof_days: estimate.time_of_flight_days,
            synodic_period_days: scenario.synodic_period_days(),
        });
        Self {
            output: output.into(),
            scenario: scenario.name.clone(),
            origin: scenario.origin.name().to_string(),
            target: scenario.target.name().to_string(),
            cost: scenario.cost,
            max_revolutions: scenario.max_revolutions,
            reference,
            window_threshold_km_s: None,
        }
    }

    /// Also list departure windows whose cheapest transfer is at most `threshold_km_s`.
    pub fn with_window_threshold(mut self, threshold_km_s: f64) -> Self {
        self.window_threshold_km_s = Some(threshold_km_s);
        self
    }
}

impl SearchSink for JsonSink {
    fn consume(&mut self, outcome: &SearchOutcome) -> Result<(), SinkError> {
        let meta = Metadata {
            scenario: &self.scenario,
            origin: &self.origin,
            target: &self.target,
            cost_model: cost_label(self.cost),
            arrival_axis: outcome.arrival_axis.label(),
            departure_count: outcome.departure_epochs.len(),
            arrival_count: outcome.arrival_axis.len(),
            max_revolutions: self.max_revolutions,
        };
        let stats = &outcome.stats;
        let counts = ScanCounts {
            cells: stats.cells,
            feasible: stats.feasible,
            filtered: stats.filtered,
            ephemeris_failures: stats.ephemeris_failures,
            solver_failures: stats.solver_failures,
            empty_cells: stats.empty_cells,
        };
        let best = outcome.best.as_ref().map(best_leg).transpose()?;

        let mut windows = Vec::new();
        if let Some(threshold) = self.window_threshold_km_s {
            for window in launch_windows(&departure_profile(outcome), threshold) {
                windows.push(WindowEntry {
                    opens_utc: format_utc(window.opens)?,
                    closes_utc: format_utc(window.closes)?,
                    best_departure_utc: format_utc(window.best.departure_epoch)?,
                    best_total_dv_km_s: window.best.total_dv_km_s,
                });
            }
        }

        summary::write_summary(&self.output, &meta, counts, best.as_ref(), self.reference, &windows)?;
        info!("wrote search summary {}", self.output.display());
        Ok(())
    }
}

pub fn cost_label(cost: CostModel) -> &'static str {
    match cost {
        CostModel::DepartureOnly => "departure_only",
        CostModel::Rendezvous => "rendezvous",
    }
}

/// Flatten a best transfer for the summary document.
pub fn best_leg(best: &BestTransfer) -> Result<BestLeg, TimeError> {
    Ok(BestLeg {
        departure_mjd2000: best.departure_epoch,
        departure_utc: format_utc(best.departure_epoch)?,
        arrival_mjd2000: best.arrival_epoch,
        arrival_utc: format_utc(best.arrival_epoch)?,
        time_of_flight_days: best.time_of_flight_days(),
        departure_index: best.departure_index,
        arrival_index: best.arrival_index,
        branch_index: best.branch_index,
        revolutions: best.revolutions,
        r1_km: best.r1_km,
        r2_km: best.r2_km,
        v1_km_s: best.v1_km_s,
        v2_km_s: best.v2_km_s,
        origin_velocity_km_s: best.origin_velocity_km_s,
        target_velocity_km_s: best.target_velocity_km_s,
        departure_dv_km_s: best.departure_dv_km_s,
        arrival_dv_km_s: best.arrival_dv_km_s,
        total_dv_km_s: best.total_dv_km_s,
    })
}
