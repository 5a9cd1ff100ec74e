//! Top-down (ecliptic x/y) plots of orbits and transfer arcs, in AU.

use std::path::{Path, PathBuf};

use log::{info, warn};
use plotters::prelude::*;
use scout_core::units::km_to_au;
use scout_core::vector::Vector3;
use scout_ephem::Ephemeris;
use scout_transfer::trajectory::{Track, TransferOverlay, overlay};
use scout_transfer::{SearchOutcome, SearchSink, SinkError};

use super::{PlotError, ensure_parent, select_font_family};

const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(214, 39, 40),
    RGBColor(44, 160, 44),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(23, 190, 207),
    RGBColor(255, 127, 14),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
];

/// Colour of the `k`-th track; repeats only after ten tracks.
pub fn track_color(k: usize) -> RGBColor {
    PALETTE[k % PALETTE.len()]
}

fn to_au(position_km: &Vector3) -> (f64, f64) {
    (km_to_au(position_km[0]), km_to_au(position_km[1]))
}

/// A labelled polyline in AU.
#[derive(Debug, Clone, PartialEq)]
pub struct XyTrack {
    pub label: String,
    pub points_au: Vec<(f64, f64)>,
}

impl XyTrack {
    pub fn from_positions<'a>(label: impl Into<String>, positions_km: impl IntoIterator<Item = &'a Vector3>) -> Self {
        Self {
            label: label.into(),
            points_au: positions_km.into_iter().map(to_au).collect(),
        }
    }
}

impl From<&Track> for XyTrack {
    fn from(track: &Track) -> Self {
        XyTrack::from_positions(track.label.clone(), &track.positions_km)
    }
}

/// A single labelled point in AU.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub label: String,
    pub point_au: (f64, f64),
    pub color: RGBColor,
}

/// Render tracks and markers on square, equal-scale axes centred on the origin.
pub fn render_xy(
    output: &Path,
    title: &str,
    tracks: &[XyTrack],
    markers: &[Marker],
    size: u32,
) -> Result<(), PlotError> {
    let extent = tracks
        .iter()
        .flat_map(|t| t.points_au.iter())
        .chain(markers.iter().map(|m| &m.point_au))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .fold(0.0_f64, |acc, (x, y)| acc.max(x.abs()).max(y.abs()));
    if extent == 0.0 {
        return Err(PlotError::Empty("no finite positions"));
    }
    let limit = extent * 1.1;
    let precision = if limit < 0.5 { 4 } else { 1 };

    ensure_parent(output)?;
    let output_str = output.to_str().ok_or(PlotError::InvalidPath)?;
    let root = BitMapBackend::new(output_str, (size, size)).into_drawing_area();
    root.fill(&WHITE)?;

    let font_family = select_font_family();
    let caption_font = FontDesc::new(font_family, 24.0, FontStyle::Bold);
    let label_font = FontDesc::new(font_family, 16.0, FontStyle::Normal);

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, caption_font)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-limit..limit, -limit..limit)?;

    chart
        .configure_mesh()
        .x_desc("x (AU)")
        .y_desc("y (AU)")
        .label_style(label_font.clone())
        .light_line_style(BLACK.mix(0.05))
        .x_label_formatter(&|v| format!("{v:.precision$}"))
        .y_label_formatter(&|v| format!("{v:.precision$}"))
        .draw()?;

    for (k, track) in tracks.iter().enumerate() {
        let color = track_color(k);
        chart
            .draw_series(LineSeries::new(track.points_au.iter().copied(), color.stroke_width(2)))?
            .label(track.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    for marker in markers {
        let color = marker.color;
        chart
            .draw_series(std::iter::once(Circle::new(marker.point_au, 5, color.filled())))?
            .label(marker.label.clone())
            .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .label_font(label_font)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Plots the origin and target paths with the best transfer arc.
pub struct TrajectoryPlotSink<'a> {
    output: PathBuf,
    title: String,
    origin: &'a dyn Ephemeris,
    target: &'a dyn Ephemeris,
    mu_km3_s2: f64,
    impact_epoch: Option<f64>,
    samples: usize,
    size: u32,
}

impl<'a> TrajectoryPlotSink<'a> {
    pub fn new(
        output: impl Into<PathBuf>,
        title: impl Into<String>,
        origin: &'a dyn Ephemeris,
        target: &'a dyn Ephemeris,
        mu_km3_s2: f64,
    ) -> Self {
        Self {
            output: output.into(),
            title: title.into(),
            origin,
            target,
            mu_km3_s2,
            impact_epoch: None,
            samples: 400,
            size: 900,
        }
    }

    /// End the target path at `epoch` (MJD2000) and mark where it is then.
    pub fn with_impact(mut self, epoch: Option<f64>) -> Self {
        self.impact_epoch = epoch;
        self
    }
}

impl SearchSink for TrajectoryPlotSink<'_> {
    fn consume(&mut self, outcome: &SearchOutcome) -> Result<(), SinkError> {
        let overlay = overlay(
            outcome,
            self.origin,
            self.target,
            self.mu_km3_s2,
            self.samples,
            self.impact_epoch,
        )
        .map_err(|e| SinkError::Render(e.to_string()))?;
        let Some(overlay) = overlay else {
            warn!("skipping trajectory plot {}: no feasible transfer", self.output.display());
            return Ok(());
        };

        let tracks = [
            XyTrack::from(&overlay.origin),
            XyTrack::from(&overlay.target),
            XyTrack::from(&overlay.transfer),
        ];
        render_xy(&self.output, &self.title, &tracks, &transfer_markers(&overlay), self.size)?;
        info!("wrote trajectory plot {}", self.output.display());
        Ok(())
    }
}

fn transfer_markers(overlay: &TransferOverlay) -> Vec<Marker> {
    let mut markers = vec![Marker {
        label: "Sun".to_string(),
        point_au: (0.0, 0.0),
        color: RGBColor(255, 165, 0),
    }];
    if let (Some(start), Some(end)) = (overlay.transfer.first(), overlay.transfer.last()) {
        markers.push(Marker {
            label: "Departure".to_string(),
            point_au: to_au(start),
            color: RGBColor(0, 128, 0),
        });
        markers.push(Marker {
            label: "Arrival".to_string(),
            point_au: to_au(end),
            color: RGBColor(128, 0, 0),
        });
    }
    if let Some(impact) = &overlay.impact_km {
        markers.push(Marker {
            label: "Impact".to_string(),
            point_au: to_au(impact),
            color: BLACK,
        });
    }
    markers
}

/// One track per body of an N-body run, in the frame of the run.
pub fn flyby_tracks(trajectories: &scout_nbody::Trajectories) -> Vec<XyTrack> {
    trajectories
        .names
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let positions: Vec<Vector3> = trajectories.positions(k).collect();
            XyTrack::from_positions(name.clone(), &positions)
        })
        .collect()
}

/// Start position of every body of an N-body run, coloured like its track.
pub fn flyby_markers(trajectories: &scout_nbody::Trajectories) -> Vec<Marker> {
    let Some(first) = trajectories.states.first() else {
        return Vec::new();
    };
    trajectories
        .names
        .iter()
        .zip(first)
        .enumerate()
        .map(|(k, (name, state))| Marker {
            label: format!("{name} start"),
            point_au: to_au(&state.position_km),
            color: track_color(k),
        })
        .collect()
}
