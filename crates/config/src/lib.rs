//! Scenario manifests for transfer searches and flyby propagation.
//!
//! Manifests are TOML when the file extension is `.toml` and YAML otherwise.
//! Every day value in a search manifest is relative to its `start_epoch`.

use std::fs::File;
use std::path::{Path, PathBuf};

use scout_core::time::{self, TimeError};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid epoch: {0}")]
    Epoch(#[from] TimeError),
    #[error("invalid scenario `{scenario}`: {reason}")]
    Invalid { scenario: String, reason: String },
    #[error("{}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Evenly spaced sample axis `[start_days, end_days]` with `count` samples.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AxisConfig {
    pub start_days: f64,
    pub end_days: f64,
    pub count: usize,
}

/// How the second grid axis is interpreted.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalMode {
    /// Absolute arrival epochs (days after `start_epoch`).
    Epochs,
    /// Flight durations added to each departure epoch.
    Durations,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ArrivalConfig {
    pub mode: ArrivalMode,
    #[serde(flatten)]
    pub axis: AxisConfig,
}

/// Feasibility filter applied to each (departure, arrival) pair.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct WindowConfig {
    #[serde(default)]
    pub min_transfer_days: f64,
    /// Hard deadline (days after `start_epoch`), e.g. a predicted impact.
    #[serde(default)]
    pub deadline_days: Option<f64>,
    #[serde(default)]
    pub deadline_margin_days: f64,
}

/// Target of the search: a catalogued planet or a constructed Keplerian body.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetConfig {
    Planet {
        name: String,
    },
    /// A body that sits at the position of `anchor` at `anchor_epoch_days`
    /// with the given heliocentric velocity.
    Keplerian {
        name: String,
        anchor: String,
        anchor_epoch_days: f64,
        velocity_km_s: [f64; 3],
    },
}

impl TargetConfig {
    pub fn name(&self) -> &str {
        match self {
            TargetConfig::Planet { name } | TargetConfig::Keplerian { name, .. } => name,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectionConfig {
    #[default]
    Prograde,
    Retrograde,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CostConfig {
    /// Departure burn only (intercept or impact).
    Departure,
    /// Departure plus arrival burns (rendezvous).
    #[default]
    Rendezvous,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolverConfig {
    #[default]
    Izzo,
    Bate,
}

/// Colour-scale limits for porkchop rendering.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PlotConfig {
    #[serde(default)]
    pub vmin_km_s: f64,
    #[serde(default = "default_vmax")]
    pub vmax_km_s: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            vmin_km_s: 0.0,
            vmax_km_s: default_vmax(),
        }
    }
}

fn default_vmax() -> f64 {
    50.0
}

impl PlotConfig {
    /// Both limits finite and `vmax_km_s > vmin_km_s`.
    pub fn check(&self) -> Result<(), String> {
        if !self.vmin_km_s.is_finite() || !self.vmax_km_s.is_finite() {
            return Err(format!(
                "plot limits must be finite, got vmin {} and vmax {}",
                self.vmin_km_s, self.vmax_km_s
            ));
        }
        if self.vmax_km_s <= self.vmin_km_s {
            return Err(format!(
                "plot.vmax_km_s ({}) must exceed plot.vmin_km_s ({})",
                self.vmax_km_s, self.vmin_km_s
            ));
        }
        Ok(())
    }
}

/// Manifest of a Lambert grid search.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SearchScenarioConfig {
    pub name: String,
    /// UTC calendar string; defaults to the MJD2000 origin.
    #[serde(default)]
    pub start_epoch: Option<String>,
    pub origin: String,
    pub target: TargetConfig,
    pub departure: AxisConfig,
    pub arrival: ArrivalConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub max_revolutions: u32,
    #[serde(default)]
    pub direction: DirectionConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub plot: Option<PlotConfig>,
}

impl SearchScenarioConfig {
    /// Reference epoch of the manifest in MJD2000 days.
    pub fn start_epoch_mjd2000(&self) -> Result<f64, ConfigError> {
        match &self.start_epoch {
            Some(epoch) => Ok(time::parse_utc(epoch)?),
            None => Ok(0.0),
        }
    }

    /// Check the manifest for values a search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            scenario: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        self.start_epoch_mjd2000()?;
        validate_axis(&self.departure, "departure").map_err(invalid)?;
        validate_axis(&self.arrival.axis, "arrival").map_err(invalid)?;

        let window = &self.window;
        if !window.min_transfer_days.is_finite() || window.min_transfer_days < 0.0 {
            return Err(invalid(format!(
                "window.min_transfer_days must be finite and non-negative, got {}",
                window.min_transfer_days
            )));
        }
        if !window.deadline_margin_days.is_finite() || window.deadline_margin_days < 0.0 {
            return Err(invalid(format!(
                "window.deadline_margin_days must be finite and non-negative, got {}",
                window.deadline_margin_days
            )));
        }
        if let Some(deadline) = window.deadline_days {
            if !deadline.is_finite() {
                return Err(invalid("window.deadline_days must be finite".into()));
            }
        }

        if let TargetConfig::Keplerian {
            anchor_epoch_days,
            velocity_km_s,
            ..
        } = &self.target
        {
            if !anchor_epoch_days.is_finite() || velocity_km_s.iter().any(|v| !v.is_finite()) {
                return Err(invalid("keplerian target needs a finite anchor epoch and velocity".into()));
            }
        }

        if let Some(plot) = &self.plot {
            plot.check().map_err(invalid)?;
        }

        Ok(())
    }
}

fn validate_axis(axis: &AxisConfig, label: &str) -> Result<(), String> {
    if axis.count == 0 {
        return Err(format!("{label}.count must be at least 1"));
    }
    if !axis.start_days.is_finite() || !axis.end_days.is_finite() {
        return Err(format!("{label} bounds must be finite"));
    }
    if axis.end_days < axis.start_days {
        return Err(format!(
            "{label}.end_days ({}) precedes start_days ({})",
            axis.end_days, axis.start_days
        ));
    }
    Ok(())
}

/// Massive body participating in a flyby integration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BodyConfig {
    pub name: String,
    /// Overrides the catalogue gravitational parameter.
    #[serde(default)]
    pub gm_km3_s2: Option<f64>,
}

/// Massless spacecraft placed relative to one of the bodies.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SpacecraftConfig {
    #[serde(default = "default_spacecraft_name")]
    pub name: String,
    pub relative_to: String,
    pub offset_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

fn default_spacecraft_name() -> String {
    "Spacecraft".to_string()
}

/// Output sampling of a flyby integration, in days relative to `epoch`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SpanConfig {
    pub start_days: f64,
    pub end_days: f64,
    pub samples: usize,
}

/// Manifest of an N-body flyby propagation.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FlybyScenarioConfig {
    pub name: String,
    pub epoch: String,
    pub bodies: Vec<BodyConfig>,
    #[serde(default)]
    pub spacecraft: Option<SpacecraftConfig>,
    pub span: SpanConfig,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_tolerance() -> f64 {
    1e-10
}

impl FlybyScenarioConfig {
    pub fn epoch_mjd2000(&self) -> Result<f64, ConfigError> {
        Ok(time::parse_utc(&self.epoch)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            scenario: self.name.clone(),
            reason,
        };

        self.epoch_mjd2000()?;
        if self.bodies.is_empty() {
            return Err(invalid("at least one body is required".into()));
        }
        if let Some(body) = self
            .bodies
            .iter()
            .find(|b| b.gm_km3_s2.is_some_and(|gm| !gm.is_finite() || gm < 0.0))
        {
            return Err(invalid(format!("body `{}` has an invalid GM", body.name)));
        }
        if let Some(sc) = &self.spacecraft {
            let anchored = self
                .bodies
                .iter()
                .any(|b| b.name.eq_ignore_ascii_case(&sc.relative_to));
            if !anchored {
                return Err(invalid(format!(
                    "spacecraft is relative to `{}`, which is not in the body list",
                    sc.relative_to
                )));
            }
            if sc.offset_km.iter().chain(&sc.velocity_km_s).any(|v| !v.is_finite()) {
                return Err(invalid("spacecraft offset and velocity must be finite".into()));
            }
        }
        if self.span.samples < 2 {
            return Err(invalid("span.samples must be at least 2".into()));
        }
        if self.span.end_days.is_nan() || self.span.end_days <= self.span.start_days {
            return Err(invalid("span.end_days must exceed span.start_days".into()));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(invalid(format!("tolerance must be positive, got {}", self.tolerance)));
        }
        Ok(())
    }
}

/// Load and validate a search manifest.
pub fn load_search_scenario<P: AsRef<Path>>(path: P) -> Result<SearchScenarioConfig, ConfigError> {
    let scenario: SearchScenarioConfig = load_document(path)?;
    scenario.validate()?;
    Ok(scenario)
}

/// Load and validate a flyby manifest.
pub fn load_flyby_scenario<P: AsRef<Path>>(path: P) -> Result<FlybyScenarioConfig, ConfigError> {
    let scenario: FlybyScenarioConfig = load_document(path)?;
    scenario.validate()?;
    Ok(scenario)
}

/// Load every `.toml` search manifest in a directory, sorted by file name.
/// Manifests with a `bodies` table are flyby scenarios and are skipped.
pub fn load_search_catalog<P: AsRef<Path>>(dir: P) -> Result<Vec<SearchScenarioConfig>, ConfigError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();

    let mut scenarios = Vec::new();
    for path in entries {
        let in_file = |err: ConfigError| ConfigError::Manifest {
            path: path.clone(),
            source: Box::new(err),
        };
        let contents = std::fs::read_to_string(&path).map_err(|e| in_file(e.into()))?;
        let document: toml::Table = toml::from_str(&contents).map_err(|e| in_file(e.into()))?;
        // Flyby manifests share the directory.
        if document.contains_key("bodies") {
            continue;
        }
        let scenario: SearchScenarioConfig = toml::from_str(&contents).map_err(|e| in_file(e.into()))?;
        scenario.validate().map_err(in_file)?;
        scenarios.push(scenario);
    }
    Ok(scenarios)
}

fn load_document<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}
