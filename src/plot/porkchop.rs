//! Porkchop heatmaps: total delta-v over the departure × arrival grid.

use std::path::{Path, PathBuf};

use log::info;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use scout_core::time::format_date;
use scout_transfer::{ArrivalAxis, SearchOutcome, SearchSink, SinkError};

use super::{PlotError, ensure_parent, select_font_family, turbo_color};

/// Meaning of the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondAxis {
    /// Arrival epochs in MJD2000 days.
    ArrivalEpoch,
    /// Flight durations in days.
    FlightDays,
}

impl SecondAxis {
    /// Name written to the `axis_kind` CSV column.
    pub fn label(self) -> &'static str {
        match self {
            SecondAxis::ArrivalEpoch => "arrival_epoch",
            SecondAxis::FlightDays => "flight_days",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [SecondAxis::ArrivalEpoch, SecondAxis::FlightDays]
            .into_iter()
            .find(|axis| axis.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl From<&ArrivalAxis> for SecondAxis {
    fn from(axis: &ArrivalAxis) -> Self {
        match axis {
            ArrivalAxis::Epochs(_) => SecondAxis::ArrivalEpoch,
            ArrivalAxis::FlightDurations(_) => SecondAxis::FlightDays,
        }
    }
}

/// Grid values laid out for drawing: `values[row][col]` with rows along the
/// vertical (arrival) axis and columns along departures. `NaN` cells stay blank.
#[derive(Debug, Clone, PartialEq)]
pub struct PorkchopField {
    pub departures: Vec<f64>,
    pub second: Vec<f64>,
    pub second_axis: SecondAxis,
    pub values: Vec<Vec<f64>>,
}

impl PorkchopField {
    /// Transpose a search grid into drawing order.
    pub fn from_outcome(outcome: &SearchOutcome) -> Self {
        let second_axis = SecondAxis::from(&outcome.arrival_axis);
        let grid = &outcome.grid;
        let values = (0..grid.cols())
            .map(|j| (0..grid.rows()).map(|i| grid.get(i, j)).collect())
            .collect();
        Self {
            departures: outcome.departure_epochs.clone(),
            second: outcome.arrival_axis.values().to_vec(),
            second_axis,
            values,
        }
    }

    /// Smallest finite value and its `(col, row)` position; first hit wins ties.
    pub fn minimum(&self) -> Option<(usize, usize, f64)> {
        let mut found: Option<(usize, usize, f64)> = None;
        for (row, line) in self.values.iter().enumerate() {
            for (col, &value) in line.iter().enumerate() {
                if value.is_finite() && found.is_none_or(|(_, _, best)| value < best) {
                    found = Some((col, row, value));
                }
            }
        }
        found
    }
}

/// Colour scale and canvas of a heatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapStyle {
    pub title: String,
    /// Values below are drawn with the lowest colour.
    pub vmin_km_s: f64,
    /// Values above are drawn with the highest colour.
    pub vmax_km_s: f64,
    pub width: u32,
    pub height: u32,
    pub contour_levels: usize,
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            title: "Porkchop heatmap".to_string(),
            vmin_km_s: 0.0,
            vmax_km_s: 50.0,
            width: 1200,
            height: 900,
            contour_levels: 12,
        }
    }
}

/// Render `field` as a PNG heatmap with contours and the minimum marked.
pub fn render_porkchop(output: &Path, field: &PorkchopField, style: &HeatmapStyle) -> Result<(), PlotError> {
    if field.departures.is_empty() || field.second.is_empty() {
        return Err(PlotError::Empty("grid has no cells"));
    }
    let (min_col, min_row, min_value) = field
        .minimum()
        .ok_or(PlotError::Empty("grid has no feasible cells"))?;

    let (vmin, vmax) = (style.vmin_km_s, style.vmax_km_s);
    if !(vmin.is_finite() && vmax.is_finite() && vmax > vmin) {
        return Err(PlotError::InvalidScale { vmin, vmax });
    }

    ensure_parent(output)?;
    let output_str = output.to_str().ok_or(PlotError::InvalidPath)?;
    let root = BitMapBackend::new(output_str, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let dep0 = field.departures[0];
    let dep_coords: Vec<f64> = field.departures.iter().map(|d| d - dep0).collect();
    let second0 = match field.second_axis {
        SecondAxis::ArrivalEpoch => field.second[0],
        SecondAxis::FlightDays => 0.0,
    };
    let second_coords: Vec<f64> = field.second.iter().map(|s| s - second0).collect();

    let x_range = span(&dep_coords);
    let y_range = span(&second_coords);

    let font_family = select_font_family();
    let caption_font = FontDesc::new(font_family, 24.0, FontStyle::Bold);
    let label_font = FontDesc::new(font_family, 18.0, FontStyle::Normal);

    let legend_width = 140i32;
    let (plot_area, legend_area) = root.split_horizontally((style.width as i32 - legend_width).max(200));

    let normalize = |v: f64| (v.clamp(vmin, vmax) - vmin) / (vmax - vmin);

    {
        let mut chart = ChartBuilder::on(&plot_area)
            .margin(20)
            .caption(style.title.clone(), caption_font)
            .x_label_area_size(60)
            .y_label_area_size(y_label_area_size(field.second_axis))
            .build_cartesian_2d(x_range.clone(), y_range.clone())?;

        let x_formatter = |d: &f64| date_label(dep0 + d);
        let y_formatter = |d: &f64| match field.second_axis {
            SecondAxis::ArrivalEpoch => date_label(second0 + d),
            SecondAxis::FlightDays => format!("{d:.0}"),
        };
        chart
            .configure_mesh()
            .x_desc("Departure Date")
            .y_desc(match field.second_axis {
                SecondAxis::ArrivalEpoch => "Arrival Date",
                SecondAxis::FlightDays => "Flight Time (days)",
            })
            .label_style(label_font.clone())
            .x_labels(6)
            .y_labels(6)
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .draw()?;

        chart.draw_series(field.values.iter().enumerate().flat_map(|(row, line)| {
            let (y0, y1) = cell_bounds(&second_coords, row);
            let dep_coords = &dep_coords;
            line.iter().enumerate().filter(|(_, v)| v.is_finite()).map(move |(col, &value)| {
                let (x0, x1) = cell_bounds(dep_coords, col);
                Rectangle::new([(x0, y0), (x1, y1)], turbo_color(normalize(value)).filled())
            })
        }))?;

        let clamped: Vec<Vec<f64>> = field
            .values
            .iter()
            .map(|line| line.iter().map(|v| if v.is_finite() { v.clamp(vmin, vmax) } else { f64::NAN }).collect())
            .collect();
        let count = style.contour_levels.max(2);
        let levels: Vec<f64> = (0..count)
            .map(|i| vmin + (vmax - vmin) * i as f64 / (count - 1) as f64)
            .collect();
        draw_contours(&mut chart, &clamped, &dep_coords, &second_coords, &levels, vmin, vmax)?;

        let x = dep_coords[min_col];
        let y = second_coords[min_row];
        let guide = ShapeStyle::from(&BLACK.mix(0.5)).stroke_width(1);
        chart.draw_series(std::iter::once(PathElement::new(vec![(x, y_range.start), (x, y_range.end)], guide)))?;
        chart.draw_series(std::iter::once(PathElement::new(vec![(x_range.start, y), (x_range.end, y)], guide)))?;

        let marker_color = RGBColor(210, 100, 20);
        let half_w = (x_range.end - x_range.start) * 0.02;
        let half_h = (y_range.end - y_range.start) * 0.02;
        let stroke = ShapeStyle::from(&marker_color).stroke_width(3);
        chart.draw_series([
            PathElement::new(vec![(x - half_w, y), (x + half_w, y)], stroke),
            PathElement::new(vec![(x, y - half_h), (x, y + half_h)], stroke),
        ])?;
        chart.draw_series(std::iter::once(Text::new(
            format!("Δv = {min_value:.2} km/s"),
            (x + half_w, y + half_h),
            label_font.clone().color(&marker_color),
        )))?;
    }

    {
        let mut chart = ChartBuilder::on(&legend_area)
            .margin_left(20)
            .margin_right(20)
            .margin_top(30)
            .margin_bottom(30)
            .x_label_area_size(0)
            .y_label_area_size(70)
            .build_cartesian_2d(0.0..1.0, vmin..vmax)?;

        chart.draw_series((0..300).map(|i| {
            let t0 = i as f64 / 300.0;
            let t1 = (i + 1) as f64 / 300.0;
            Rectangle::new(
                [(0.0, vmin + (vmax - vmin) * t0), (1.0, vmin + (vmax - vmin) * t1)],
                turbo_color(t0).filled(),
            )
        }))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(0)
            .y_labels(6)
            .y_desc("Total Δv (km/s)")
            .y_label_style(label_font.clone())
            .axis_desc_style(label_font)
            .y_label_formatter(&|v| format!("{v:.1}"))
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Writes the heatmap of every consumed outcome to a fixed path.
#[derive(Debug, Clone)]
pub struct PorkchopPlotSink {
    output: PathBuf,
    style: HeatmapStyle,
}

impl PorkchopPlotSink {
    pub fn new(output: impl Into<PathBuf>, style: HeatmapStyle) -> Self {
        Self {
            output: output.into(),
            style,
        }
    }
}

impl SearchSink for PorkchopPlotSink {
    fn consume(&mut self, outcome: &SearchOutcome) -> Result<(), SinkError> {
        let field = PorkchopField::from_outcome(outcome);
        if field.minimum().is_none() {
            info!("skipping porkchop plot {}: no feasible cells", self.output.display());
            return Ok(());
        }
        render_porkchop(&self.output, &field, &self.style)?;
        info!("wrote porkchop plot {}", self.output.display());
        Ok(())
    }
}

fn span(coords: &[f64]) -> std::ops::Range<f64> {
    let (lo, _) = cell_bounds(coords, 0);
    let (_, hi) = cell_bounds(coords, coords.len() - 1);
    lo..hi
}

/// Gutter left of the plot: tick labels plus the rotated axis description.
fn y_label_area_size(axis: SecondAxis) -> u32 {
    match axis {
        // "YYYY-MM-DD" at 18 px needs about 100 px before the description.
        SecondAxis::ArrivalEpoch => 150,
        SecondAxis::FlightDays => 90,
    }
}

fn date_label(mjd2000: f64) -> String {
    format_date(mjd2000).unwrap_or_else(|_| format!("{mjd2000:.0}"))
}

fn draw_contours<DB: DrawingBackend>(
    chart: &mut ChartContext<DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    grid: &[Vec<f64>],
    x_coords: &[f64],
    y_coords: &[f64],
    levels: &[f64],
    vmin: f64,
    vmax: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    if x_coords.len() < 2 || y_coords.len() < 2 {
        return Ok(());
    }
    for &level in levels {
        let color = turbo_color((level - vmin) / (vmax - vmin)).mix(0.8);
        let mut segments = Vec::new();
        for i in 0..y_coords.len() - 1 {
            for j in 0..x_coords.len() - 1 {
                let corners = [grid[i][j], grid[i][j + 1], grid[i + 1][j + 1], grid[i + 1][j]];
                if corners.iter().any(|v| !v.is_finite()) {
                    continue;
                }
                let coords = [
                    (x_coords[j], y_coords[i]),
                    (x_coords[j + 1], y_coords[i]),
                    (x_coords[j + 1], y_coords[i + 1]),
                    (x_coords[j], y_coords[i + 1]),
                ];
                segments.extend(marching_square_segments(corners, coords, level));
            }
        }
        chart.draw_series(
            segments
                .into_iter()
                .map(|(a, b)| PathElement::new(vec![a, b], ShapeStyle::from(&color).stroke_width(1))),
        )?;
    }
    Ok(())
}

type Segment = ((f64, f64), (f64, f64));

/// Iso-line pieces of `level` inside one cell; corners run counter-clockwise
/// from the lower left.
pub(crate) fn marching_square_segments(values: [f64; 4], coords: [(f64, f64); 4], level: f64) -> Vec<Segment> {
    let case = values
        .iter()
        .enumerate()
        .fold(0u8, |acc, (k, &v)| if v >= level { acc | (1 << k) } else { acc });

    let edge = |e: usize| -> (f64, f64) {
        let (a, b) = (e, (e + 1) % 4);
        let (va, vb) = (values[a], values[b]);
        let ((xa, ya), (xb, yb)) = (coords[a], coords[b]);
        if (vb - va).abs() < f64::EPSILON {
            return ((xa + xb) * 0.5, (ya + yb) * 0.5);
        }
        let t = (level - va) / (vb - va);
        (xa + t * (xb - xa), ya + t * (yb - ya))
    };

    let pairs: &[(usize, usize)] = match case {
        1 | 14 => &[(3, 0)],
        2 | 13 => &[(0, 1)],
        3 | 12 => &[(3, 1)],
        4 | 11 => &[(1, 2)],
        5 => &[(3, 2), (0, 1)],
        6 | 9 => &[(0, 2)],
        7 | 8 => &[(3, 2)],
        10 => &[(3, 0), (1, 2)],
        _ => &[],
    };
    pairs.iter().map(|&(a, b)| (edge(a), edge(b))).collect()
}

/// Extent of cell `idx` along an axis: halfway to each neighbour.
pub(crate) fn cell_bounds(coords: &[f64], idx: usize) -> (f64, f64) {
    let center = coords[idx];
    let prev = idx.checked_sub(1).and_then(|i| coords.get(i)).copied();
    let next = coords.get(idx + 1).copied();

    let left = match (prev, next) {
        (Some(prev), _) => 0.5 * (prev + center),
        (None, Some(next)) => center - 0.5 * (next - center),
        (None, None) => center - 0.5,
    };
    let right = match (prev, next) {
        (_, Some(next)) => 0.5 * (center + next),
        (Some(prev), None) => center + 0.5 * (center - prev),
        (None, None) => center + 0.5,
    };
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_bounds_split_between_neighbours() {
        let coords = [0.0, 10.0, 30.0];
        assert_eq!(cell_bounds(&coords, 0), (-5.0, 5.0));
        assert_eq!(cell_bounds(&coords, 1), (5.0, 20.0));
        assert_eq!(cell_bounds(&coords, 2), (20.0, 40.0));
        assert_eq!(cell_bounds(&[7.0], 0), (6.5, 7.5));
    }

    #[test]
    fn single_corner_above_level_yields_one_segment() {
        let coords = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let segments = marching_square_segments([2.0, 0.0, 0.0, 0.0], coords, 1.0);
        assert_eq!(segments, vec![((0.0, 0.5), (0.5, 0.0))]);
        assert!(marching_square_segments([2.0; 4], coords, 1.0).is_empty());
        assert_eq!(marching_square_segments([2.0, 0.0, 2.0, 0.0], coords, 1.0).len(), 2);
    }

    #[test]
    fn axis_labels_match_the_search_axis() {
        for axis in [ArrivalAxis::Epochs(vec![1.0]), ArrivalAxis::FlightDurations(vec![1.0])] {
            let second = SecondAxis::from(&axis);
            assert_eq!(second.label(), axis.label());
            assert_eq!(SecondAxis::from_label(axis.label()), Some(second));
        }
        assert_eq!(SecondAxis::from_label(" Flight_Days "), Some(SecondAxis::FlightDays));
        assert_eq!(SecondAxis::from_label("tof"), None);
    }

    #[test]
    fn date_axis_reserves_room_for_labels_and_description() {
        let label = date_label(9_010.0);
        assert_eq!(label, "2024-09-01");
        // Roughly 10 px per glyph at 18 px, plus the rotated description.
        let needed = 10 * label.len() as u32 + 30;
        assert!(y_label_area_size(SecondAxis::ArrivalEpoch) >= needed);
        assert!(y_label_area_size(SecondAxis::ArrivalEpoch) > y_label_area_size(SecondAxis::FlightDays));
    }

    #[test]
    fn invalid_colour_scale_is_an_error() {
        let field = PorkchopField {
            departures: vec![0.0],
            second: vec![100.0],
            second_axis: SecondAxis::FlightDays,
            values: vec![vec![5.0]],
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("never.png");
        for (vmin, vmax) in [(f64::NAN, 10.0), (0.0, f64::INFINITY), (10.0, 10.0)] {
            let style = HeatmapStyle {
                vmin_km_s: vmin,
                vmax_km_s: vmax,
                ..HeatmapStyle::default()
            };
            assert!(matches!(
                render_porkchop(&output, &field, &style),
                Err(PlotError::InvalidScale { .. })
            ));
        }
        assert!(!output.exists());
    }

    #[test]
    fn field_minimum_skips_nan_and_keeps_first_tie() {
        let field = PorkchopField {
            departures: vec![0.0, 1.0],
            second: vec![100.0, 200.0],
            second_axis: SecondAxis::FlightDays,
            values: vec![vec![f64::NAN, 3.0], vec![3.0, 4.0]],
        };
        assert_eq!(field.minimum(), Some((1, 0, 3.0)));

        let empty = PorkchopField {
            values: vec![vec![f64::NAN; 2]; 2],
            ..field
        };
        assert_eq!(empty.minimum(), None);
    }
}
