//! Bitmap rendering of search results with `plotters`.

pub mod orbits;
pub mod porkchop;

use plotters::prelude::*;
use thiserror::Error;

pub use orbits::{Marker, TrajectoryPlotSink, XyTrack, flyby_markers, flyby_tracks, render_xy, track_color};
pub use porkchop::{HeatmapStyle, PorkchopField, PorkchopPlotSink, SecondAxis, render_porkchop};

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("nothing to plot: {0}")]
    Empty(&'static str),
    #[error("colour scale needs finite limits with vmax > vmin, got {vmin}..{vmax}")]
    InvalidScale { vmin: f64, vmax: f64 },
    #[error("output path contains invalid UTF-8")]
    InvalidPath,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("drawing failed: {0}")]
    Render(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Render(err.to_string())
    }
}

impl From<PlotError> for scout_transfer::SinkError {
    fn from(err: PlotError) -> Self {
        scout_transfer::SinkError::Render(err.to_string())
    }
}

pub(crate) fn select_font_family() -> FontFamily<'static> {
    if cfg!(target_os = "macos") {
        FontFamily::Name("Helvetica")
    } else if cfg!(target_os = "windows") {
        FontFamily::Name("Arial")
    } else {
        FontFamily::Name("DejaVu Sans")
    }
}

/// Polynomial fit of the "turbo" colour map for `t` in [0, 1].
pub fn turbo_color(t_in: f64) -> RGBColor {
    let t = t_in.clamp(0.0, 1.0);
    let r = 0.135_721_38
        + t * (4.615_392_60 + t * (-42.660_322_58 + t * (132.131_082_34 + t * (-152.942_393_96 + t * 59.286_379_43))));
    let g = 0.091_402_61
        + t * (2.194_188_39 + t * (4.842_966_58 + t * (-14.185_033_33 + t * (4.277_298_57 + t * 2.829_566_04))));
    let b = 0.106_673_30
        + t * (12.641_946_08 + t * (-60.582_048_36 + t * (110.362_767_71 + t * (-89.903_109_12 + t * 27.348_249_73))));
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RGBColor(channel(r), channel(g), channel(b))
}

pub(crate) fn ensure_parent(path: &std::path::Path) -> Result<(), PlotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
