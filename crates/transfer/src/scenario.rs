//! Turning a search manifest into ephemerides, grids and a solver.

use log::debug;
use scout_config::{
    ArrivalMode, ConfigError, CostConfig, DirectionConfig, PlotConfig, SearchScenarioConfig,
    SolverConfig, TargetConfig,
};
use scout_core::constants::MU_SUN_KM3_S2;
use scout_core::grid::linspace;
use scout_ephem::{Ephemeris, EphemerisError, JplLowPrecision, KeplerianOrbit, StateVector};
use scout_impulsive::lambert::{
    Bate, Direction, Izzo, LambertBranch, LambertProblem, LambertSolver, LambertSolverError,
};
use scout_impulsive::transfers::{HohmannEstimate, hohmann, synodic_period_days};
use thiserror::Error;

use crate::search::{
    ArrivalAxis, CostModel, FeasibilityWindow, SearchError, SearchOutcome, SearchRequest, search,
};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

/// Lambert solver selected by the manifest.
#[derive(Debug, Clone, Copy)]
pub enum SolverChoice {
    Izzo(Izzo),
    Bate(Bate),
}

impl LambertSolver for SolverChoice {
    fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
        match self {
            SolverChoice::Izzo(solver) => solver.solve(problem),
            SolverChoice::Bate(solver) => solver.solve(problem),
        }
    }
}

/// Search target: a catalogued planet or a constructed conic.
#[derive(Debug, Clone)]
pub enum TargetBody {
    Planet(JplLowPrecision),
    Keplerian(KeplerianOrbit),
}

impl Ephemeris for TargetBody {
    fn name(&self) -> &str {
        match self {
            TargetBody::Planet(planet) => planet.name(),
            TargetBody::Keplerian(orbit) => orbit.name(),
        }
    }

    fn state_at(&self, epoch_mjd2000: f64) -> Result<StateVector, EphemerisError> {
        match self {
            TargetBody::Planet(planet) => planet.state_at(epoch_mjd2000),
            TargetBody::Keplerian(orbit) => orbit.state_at(epoch_mjd2000),
        }
    }
}

/// A fully resolved search, ready to run.
#[derive(Debug, Clone)]
pub struct SearchScenario {
    pub name: String,
    /// Reference epoch (MJD2000) all manifest day offsets are measured from.
    pub start_epoch: f64,
    pub origin: JplLowPrecision,
    pub target: TargetBody,
    pub departure_epochs: Vec<f64>,
    pub arrival_axis: ArrivalAxis,
    pub window: FeasibilityWindow,
    pub max_revolutions: u32,
    pub direction: Direction,
    pub cost: CostModel,
    pub solver: SolverChoice,
    pub plot: PlotConfig,
}

impl SearchScenario {
    pub fn from_config(config: &SearchScenarioConfig) -> Result<Self, ScenarioError> {
        config.validate()?;
        let start = config.start_epoch_mjd2000()?;
        let origin = JplLowPrecision::by_name(&config.origin)?;

        let target = match &config.target {
            TargetConfig::Planet { name } => TargetBody::Planet(JplLowPrecision::by_name(name)?),
            TargetConfig::Keplerian {
                name,
                anchor,
                anchor_epoch_days,
                velocity_km_s,
            } => {
                let anchor_epoch = start + anchor_epoch_days;
                let anchor_state = JplLowPrecision::by_name(anchor)?.state_at(anchor_epoch)?;
                debug!(
                    "{name} anchored to {anchor} at MJD2000 {anchor_epoch:.3}: r = {:?} km",
                    anchor_state.position_km
                );
                TargetBody::Keplerian(KeplerianOrbit::new(
                    name.clone(),
                    anchor_epoch,
                    anchor_state.position_km,
                    *velocity_km_s,
                    MU_SUN_KM3_S2,
                )?)
            }
        };

        let departure = &config.departure;
        let departure_epochs = linspace(
            start + departure.start_days,
            start + departure.end_days,
            departure.count,
        );

        let arrival = &config.arrival.axis;
        let arrival_axis = match config.arrival.mode {
            ArrivalMode::Epochs => ArrivalAxis::Epochs(linspace(
                start + arrival.start_days,
                start + arrival.end_days,
                arrival.count,
            )),
            ArrivalMode::Durations => ArrivalAxis::FlightDurations(linspace(
                arrival.start_days,
                arrival.end_days,
                arrival.count,
            )),
        };

        Ok(Self {
            name: config.name.clone(),
            start_epoch: start,
            origin,
            target,
            departure_epochs,
            arrival_axis,
            window: FeasibilityWindow {
                min_transfer_days: config.window.min_transfer_days,
                deadline: config.window.deadline_days.map(|d| start + d),
                deadline_margin_days: config.window.deadline_margin_days,
            },
            max_revolutions: config.max_revolutions,
            direction: match config.direction {
                DirectionConfig::Prograde => Direction::Prograde,
                DirectionConfig::Retrograde => Direction::Retrograde,
            },
            cost: match config.cost {
                CostConfig::Departure => CostModel::DepartureOnly,
                CostConfig::Rendezvous => CostModel::Rendezvous,
            },
            solver: match config.solver {
                SolverConfig::Izzo => SolverChoice::Izzo(Izzo::default()),
                SolverConfig::Bate => SolverChoice::Bate(Bate::default()),
            },
            plot: config.plot.unwrap_or_default(),
        })
    }

    pub fn request(&self) -> SearchRequest<'_> {
        SearchRequest {
            origin: &self.origin,
            target: &self.target,
            departure_epochs: self.departure_epochs.clone(),
            arrival_axis: self.arrival_axis.clone(),
            window: self.window,
            mu_km3_s2: MU_SUN_KM3_S2,
            max_revolutions: self.max_revolutions,
            direction: self.direction,
            cost: self.cost,
        }
    }

    pub fn run(&self) -> Result<SearchOutcome, ScenarioError> {
        debug!(
            "{}: {} x {} grid, up to {} revolution(s), {:?}",
            self.name,
            self.departure_epochs.len(),
            self.arrival_axis.len(),
            self.max_revolutions,
            self.cost
        );
        Ok(search(&self.request(), &self.solver)?)
    }

    /// Circular-coplanar Hohmann estimate between the mean orbits of two planets.
    pub fn hohmann_reference(&self) -> Option<HohmannEstimate> {
        let TargetBody::Planet(target) = &self.target else {
            return None;
        };
        hohmann(
            self.origin.planet().mean_semi_major_axis_km(),
            target.planet().mean_semi_major_axis_km(),
            MU_SUN_KM3_S2,
        )
        .ok()
    }

    /// Synodic period of the origin and a planet target, in days.
    pub fn synodic_period_days(&self) -> Option<f64> {
        let TargetBody::Planet(target) = &self.target else {
            return None;
        };
        synodic_period_days(
            self.origin.planet().mean_semi_major_axis_km(),
            target.planet().mean_semi_major_axis_km(),
            MU_SUN_KM3_S2,
        )
    }
}
