use clap::Parser;
use log::{LevelFilter, info};
use std::io::Write;
use std::path::PathBuf;
use transfer_scout::config::load_flyby_scenario;
use transfer_scout::export::summary::write_json;
use transfer_scout::export::trajectory::{self as export_trajectory, Row};
use transfer_scout::export::writer_for_path;
use transfer_scout::nbody::FlybyScenario;
use transfer_scout::plot::{flyby_markers, flyby_tracks, render_xy};

/// Propagate an N-body flyby scenario and summarize the encounter.
#[derive(Parser, Debug)]
#[command(author, version, about = "Point-mass N-body flyby propagation")]
struct Cli {
    /// Flyby manifest (TOML or YAML)
    #[arg(long)]
    scenario: PathBuf,

    /// Directory receiving `<name>_trajectory.csv`, `<name>_summary.json` and the plot
    #[arg(long, default_value = "artifacts")]
    output_dir: PathBuf,

    /// Also render a top-down plot of every body
    #[arg(long, default_value_t = false)]
    plot: bool,

    /// Plot width and height in pixels
    #[arg(long, default_value_t = 900)]
    size: u32,
}

fn main() -> anyhow::Result<()> {
    let _ = pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .try_init();
    let cli = Cli::parse();

    let config = load_flyby_scenario(&cli.scenario)?;
    let scenario = FlybyScenario::from_config(&config)?;
    let (trajectories, summary) = scenario.run()?;
    let name = &scenario.name;

    let csv_path = cli.output_dir.join(format!("{name}_trajectory.csv"));
    let mut writer = writer_for_path(&csv_path)?;
    export_trajectory::write_header(writer.as_mut())?;
    for (offset, states) in trajectories.offsets_days.iter().zip(&trajectories.states) {
        for (body, state) in trajectories.names.iter().zip(states) {
            Row {
                offset_days: *offset,
                body,
                position_km: state.position_km,
                velocity_km_s: state.velocity_km_s,
            }
            .write_to(writer.as_mut())?;
        }
    }
    writer.flush()?;
    info!("wrote {}", csv_path.display());

    let summary_path = cli.output_dir.join(format!("{name}_summary.json"));
    write_json(&summary_path, &summary)?;
    info!("wrote {}", summary_path.display());

    if let (Some(encounter), Some(body)) = (&summary.closest_approach, &summary.encounter_body) {
        info!(
            "[{name}] closest approach to {body}: {:.0} km at {:+.2} days, {:.3} km/s relative",
            encounter.distance_km, encounter.offset_days, encounter.relative_speed_km_s
        );
    }
    if let Some(change) = summary.heliocentric_speed_change_km_s {
        info!("[{name}] heliocentric speed change over the span: {change:+.3} km/s");
    }

    if cli.plot {
        let plot_path = cli.output_dir.join(format!("{name}_flyby.png"));
        render_xy(
            &plot_path,
            &format!("{name}: N-body flyby"),
            &flyby_tracks(&trajectories),
            &flyby_markers(&trajectories),
            cli.size,
        )?;
        info!("wrote {}", plot_path.display());
    }

    Ok(())
}
