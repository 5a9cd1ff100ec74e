//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod porkchop {
    use std::io::{self, Write};

    pub const HEADER: &str = "departure_index,arrival_index,departure_mjd2000,arrival_mjd2000,departure_utc,arrival_utc,tof_days,axis_value,axis_kind,dv_total_km_s,feasible";

    /// Write the standard porkchop CSV header.
    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// CSV row emitted for every grid cell, feasible or not.
    #[derive(Debug, Clone)]
    pub struct Record<'a> {
        pub departure_index: usize,
        pub arrival_index: usize,
        pub departure_mjd2000: f64,
        pub arrival_mjd2000: f64,
        pub departure_utc: &'a str,
        pub arrival_utc: &'a str,
        pub tof_days: f64,
        /// Value on the second grid axis: arrival epoch or flight duration (days).
        pub axis_value: f64,
        /// `arrival_epoch` or `flight_days`.
        pub axis_kind: &'a str,
        /// `NaN` for infeasible cells.
        pub dv_total_km_s: f64,
    }

    impl Record<'_> {
        /// Serialize the record to CSV, matching the standard header ordering.
        pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
            let feasible = !self.dv_total_km_s.is_nan();
            writeln!(
                writer,
                "{},{},{:.6},{:.6},{},{},{:.6},{:.6},{},{:.6},{}",
                self.departure_index,
                self.arrival_index,
                self.departure_mjd2000,
                self.arrival_mjd2000,
                self.departure_utc,
                self.arrival_utc,
                self.tof_days,
                self.axis_value,
                self.axis_kind,
                self.dv_total_km_s,
                if feasible { "true" } else { "false" },
            )
        }
    }
}

pub mod summary {
    use std::fs::{self, File};
    use std::io::{self, BufWriter};
    use std::path::Path;

    use serde::Serialize;
    use serde_json::to_writer_pretty;

    /// Scenario context written alongside the best transfer.
    #[derive(Debug, Serialize)]
    pub struct Metadata<'a> {
        pub scenario: &'a str,
        pub origin: &'a str,
        pub target: &'a str,
        pub cost_model: &'a str,
        /// `arrival_epoch` or `flight_days`.
        pub arrival_axis: &'a str,
        pub departure_count: usize,
        pub arrival_count: usize,
        pub max_revolutions: u32,
    }

    /// Best cell of the search, flattened for JSON.
    #[derive(Debug, Clone, Serialize)]
    pub struct BestLeg {
        pub departure_mjd2000: f64,
        pub departure_utc: String,
        pub arrival_mjd2000: f64,
        pub arrival_utc: String,
        pub time_of_flight_days: f64,
        pub departure_index: usize,
        pub arrival_index: usize,
        pub branch_index: usize,
        pub revolutions: u32,
        pub r1_km: [f64; 3],
        pub r2_km: [f64; 3],
        pub v1_km_s: [f64; 3],
        pub v2_km_s: [f64; 3],
        pub origin_velocity_km_s: [f64; 3],
        pub target_velocity_km_s: [f64; 3],
        pub departure_dv_km_s: f64,
        pub arrival_dv_km_s: f64,
        pub total_dv_km_s: f64,
    }

    /// Closed-form reference for planet-to-planet searches.
    #[derive(Debug, Clone, Copy, Serialize)]
    pub struct Reference {
        pub hohmann_total_dv_km_s: f64,
        pub hohmann_tof_days: f64,
        pub synodic_period_days: Option<f64>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct WindowEntry {
        pub opens_utc: String,
        pub closes_utc: String,
        pub best_departure_utc: String,
        pub best_total_dv_km_s: f64,
    }

    #[derive(Debug, Clone, Copy, Serialize)]
    pub struct ScanCounts {
        pub cells: usize,
        pub feasible: usize,
        pub filtered: usize,
        pub ephemeris_failures: usize,
        pub solver_failures: usize,
        pub empty_cells: usize,
    }

    #[derive(Serialize)]
    struct SummaryDocument<'a> {
        #[serde(flatten)]
        meta: &'a Metadata<'a>,
        counts: ScanCounts,
        best: Option<&'a BestLeg>,
        reference: Option<Reference>,
        windows: &'a [WindowEntry],
    }

    /// Write the search summary as pretty JSON.
    pub fn write_summary(
        output: &Path,
        meta: &Metadata<'_>,
        counts: ScanCounts,
        best: Option<&BestLeg>,
        reference: Option<Reference>,
        windows: &[WindowEntry],
    ) -> io::Result<()> {
        write_json(
            output,
            &SummaryDocument {
                meta,
                counts,
                best,
                reference,
                windows,
            },
        )
    }

    /// Write any serializable value as pretty JSON, creating parent directories.
    pub fn write_json<T: Serialize + ?Sized>(output: &Path, value: &T) -> io::Result<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(output)?);
        to_writer_pretty(writer, value)?;
        Ok(())
    }
}

pub mod trajectory {
    use std::io::{self, Write};

    pub const HEADER: &str = "offset_days,body,x_km,y_km,z_km,vx_km_s,vy_km_s,vz_km_s";

    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// One body at one output time of a propagation.
    #[derive(Debug, Clone)]
    pub struct Row<'a> {
        pub offset_days: f64,
        pub body: &'a str,
        pub position_km: [f64; 3],
        pub velocity_km_s: [f64; 3],
    }

    impl Row<'_> {
        pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
            let [x, y, z] = self.position_km;
            let [vx, vy, vz] = self.velocity_km_s;
            writeln!(
                writer,
                "{:.6},{},{:.3},{:.3},{:.3},{:.9},{:.9},{:.9}",
                self.offset_days, self.body, x, y, z, vx, vy, vz
            )
        }
    }
}
