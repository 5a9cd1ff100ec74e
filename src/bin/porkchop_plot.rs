use anyhow::anyhow;
use clap::Parser;
use csv::ReaderBuilder;
use std::path::PathBuf;
use transfer_scout::config::PlotConfig;
use transfer_scout::plot::{HeatmapStyle, PorkchopField, SecondAxis, render_porkchop};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Render a porkchop heatmap from a search CSV"
)]
struct Cli {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "artifacts/pork.png")]
    output: PathBuf,
    /// Lower end of the colour scale (km/s).
    #[arg(long, default_value_t = 0.0)]
    vmin: f64,
    /// Upper end of the colour scale (km/s); larger values saturate.
    #[arg(long, default_value_t = 50.0)]
    vmax: f64,
    #[arg(long, default_value_t = 1200)]
    width: u32,
    #[arg(long, default_value_t = 900)]
    height: u32,
    #[arg(long)]
    title: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    departure: f64,
    axis_value: f64,
    dv_total: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    PlotConfig {
        vmin_km_s: cli.vmin,
        vmax_km_s: cli.vmax,
    }
    .check()
    .map_err(|reason| anyhow!("--vmin/--vmax: {reason}"))?;

    let (second_axis, cells) = read_cells(&cli.input)?;
    if cells.is_empty() {
        return Err(anyhow!("{} has no grid cells", cli.input.display()));
    }

    let field = build_field(&cells, second_axis);
    if field.minimum().is_none() {
        return Err(anyhow!(
            "No feasible Lambert solutions in the provided CSV"
        ));
    }

    let mut style = HeatmapStyle {
        vmin_km_s: cli.vmin,
        vmax_km_s: cli.vmax,
        width: cli.width,
        height: cli.height,
        ..HeatmapStyle::default()
    };
    if let Some(title) = cli.title {
        style.title = title;
    }
    render_porkchop(&cli.output, &field, &style)?;
    println!("wrote {}", cli.output.display());
    Ok(())
}

/// Grid cells of a search CSV and the meaning of its `axis_value` column.
fn read_cells(path: &PathBuf) -> anyhow::Result<(SecondAxis, Vec<Cell>)> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("CSV missing '{name}' column"))
    };
    let departure_idx = column("departure_mjd2000")?;
    let axis_idx = column("axis_value")?;
    let kind_idx = column("axis_kind")?;
    let dv_idx = column("dv_total_km_s")?;
    let feasible_idx = column("feasible")?;

    let mut second_axis: Option<SecondAxis> = None;
    let mut cells = Vec::new();
    for rec in rdr.records() {
        let r = rec?;
        let kind = r.get(kind_idx).unwrap_or("");
        let axis = SecondAxis::from_label(kind).ok_or_else(|| anyhow!("unknown axis_kind '{kind}'"))?;
        match second_axis {
            Some(seen) if seen != axis => {
                return Err(anyhow!(
                    "CSV mixes axis kinds '{}' and '{}'",
                    seen.label(),
                    axis.label()
                ));
            }
            _ => second_axis = Some(axis),
        }

        let number = |idx: usize| r.get(idx).unwrap_or("").parse::<f64>().unwrap_or(f64::NAN);
        let departure = number(departure_idx);
        let axis_value = number(axis_idx);
        if !(departure.is_finite() && axis_value.is_finite()) {
            continue;
        }
        let feasible = r
            .get(feasible_idx)
            .unwrap_or("false")
            .eq_ignore_ascii_case("true");
        cells.push(Cell {
            departure,
            axis_value,
            dv_total: if feasible { number(dv_idx) } else { f64::NAN },
        });
    }
    Ok((second_axis.unwrap_or(SecondAxis::ArrivalEpoch), cells))
}

fn build_field(cells: &[Cell], second_axis: SecondAxis) -> PorkchopField {
    let sorted_unique = |values: Vec<f64>| {
        let mut values = values;
        values.sort_by(f64::total_cmp);
        values.dedup();
        values
    };
    let departures = sorted_unique(cells.iter().map(|c| c.departure).collect());
    let second = sorted_unique(cells.iter().map(|c| c.axis_value).collect());

    let mut values = vec![vec![f64::NAN; departures.len()]; second.len()];
    for cell in cells {
        let (Ok(col), Ok(row)) = (
            departures.binary_search_by(|x| x.total_cmp(&cell.departure)),
            second.binary_search_by(|x| x.total_cmp(&cell.axis_value)),
        ) else {
            continue;
        };
        let slot = &mut values[row][col];
        if cell.dv_total.is_finite() && (slot.is_nan() || cell.dv_total < *slot) {
            *slot = cell.dv_total;
        }
    }

    PorkchopField {
        departures,
        second,
        second_axis,
        values,
    }
}
