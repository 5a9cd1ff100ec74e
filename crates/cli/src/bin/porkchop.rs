use anyhow::anyhow;
use clap::Parser;
use log::{LevelFilter, info, warn};
use std::path::PathBuf;
use transfer_scout::config::load_search_scenario;
use transfer_scout::core::constants::MU_SUN_KM3_S2;
use transfer_scout::core::time::{format_utc, parse_utc};
use transfer_scout::plot::{HeatmapStyle, PorkchopPlotSink, TrajectoryPlotSink};
use transfer_scout::report::{CsvSink, JsonSink};
use transfer_scout::transfer::windows::{
    departure_profile, launch_windows, mean_window_spacing_days, suggest_departure,
};
use transfer_scout::transfer::{LogSink, SearchScenario, SearchSink, dispatch};

/// Run a Lambert porkchop search described by a scenario manifest.
#[derive(Parser, Debug)]
#[command(author, version, about = "Minimum delta-v Lambert grid search")]
struct Cli {
    /// Search manifest (TOML or YAML)
    #[arg(long)]
    scenario: PathBuf,

    /// Directory receiving `<name>.csv`, `<name>_best.json` and plots
    #[arg(long, default_value = "artifacts")]
    output_dir: PathBuf,

    /// Also render the porkchop heatmap and the best-transfer overlay
    #[arg(long, default_value_t = false)]
    plot: bool,

    /// Report departure windows whose best total delta-v is at most this (km/s)
    #[arg(long)]
    threshold: Option<f64>,

    /// Planned departure (UTC); a cheaper one is suggested when it is too costly
    #[arg(long)]
    planned_departure: Option<String>,

    /// A planned departure is too costly above this multiple of the grid minimum
    #[arg(long, default_value_t = 1.5)]
    threshold_factor: f64,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    if cli.threshold.is_some_and(|t| t.is_nan() || t <= 0.0) {
        return Err(anyhow!("--threshold must be positive"));
    }
    if cli.threshold_factor.is_nan() || cli.threshold_factor < 1.0 {
        return Err(anyhow!("--threshold-factor must be at least 1"));
    }
    let planned = cli.planned_departure.as_deref().map(parse_utc).transpose()?;

    let config = load_search_scenario(&cli.scenario)?;
    let scenario = SearchScenario::from_config(&config)?;

    if let Some(estimate) = scenario.hohmann_reference() {
        info!(
            "[{}] Hohmann reference: {:.3} km/s total ({:.3} + {:.3}), {:.1} days",
            scenario.name,
            estimate.total_dv_km_s,
            estimate.departure_dv_km_s,
            estimate.arrival_dv_km_s,
            estimate.time_of_flight_days
        );
    }
    if let Some(synodic) = scenario.synodic_period_days() {
        info!("[{}] synodic period: {:.1} days", scenario.name, synodic);
    }

    let outcome = scenario.run()?;

    let dir = &cli.output_dir;
    let name = &scenario.name;
    let mut json = JsonSink::for_scenario(dir.join(format!("{name}_best.json")), &scenario);
    if let Some(threshold) = cli.threshold {
        json = json.with_window_threshold(threshold);
    }
    let mut sinks: Vec<Box<dyn SearchSink + '_>> = vec![
        Box::new(LogSink::new(name.clone())),
        Box::new(CsvSink::new(dir.join(format!("{name}.csv")))),
        Box::new(json),
    ];
    if cli.plot {
        let style = HeatmapStyle {
            title: format!("{name}: total Δv"),
            vmin_km_s: scenario.plot.vmin_km_s,
            vmax_km_s: scenario.plot.vmax_km_s,
            ..HeatmapStyle::default()
        };
        sinks.push(Box::new(PorkchopPlotSink::new(
            dir.join(format!("{name}_porkchop.png")),
            style,
        )));
        sinks.push(Box::new(TrajectoryPlotSink::new(
            dir.join(format!("{name}_trajectory.png")),
            format!("{name}: best transfer"),
            &scenario.origin,
            &scenario.target,
            MU_SUN_KM3_S2,
        )
        .with_impact(scenario.window.deadline)));
    }
    dispatch(&outcome, &mut sinks)?;

    let profile = departure_profile(&outcome);
    if let Some(threshold) = cli.threshold {
        let windows = launch_windows(&profile, threshold);
        if windows.is_empty() {
            warn!("[{name}] no departures below {threshold:.3} km/s");
        }
        for window in &windows {
            info!(
                "[{name}] window {} .. {} ({:.0} days), best {:.3} km/s on {}",
                format_utc(window.opens)?,
                format_utc(window.closes)?,
                window.duration_days(),
                window.best.total_dv_km_s,
                format_utc(window.best.departure_epoch)?
            );
        }
        if let Some(spacing) = mean_window_spacing_days(&windows) {
            info!("[{name}] windows recur every {spacing:.1} days on average");
        }
    }

    if let Some(planned) = planned {
        match suggest_departure(&profile, planned, cli.threshold_factor) {
            Some(suggestion) => info!(
                "[{name}] planned departure costs {:.3} km/s (limit {:.3}); depart {} instead for {:.3} km/s",
                suggestion.planned_dv_km_s,
                suggestion.threshold_dv_km_s,
                format_utc(suggestion.recommended.departure_epoch)?,
                suggestion.recommended.total_dv_km_s
            ),
            None => info!("[{name}] planned departure is within {:.2}x of the minimum", cli.threshold_factor),
        }
    }

    Ok(())
}

fn init_logging() {
    let _ = pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .try_init();
}
