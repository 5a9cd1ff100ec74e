//! Minimum delta-v Lambert grid search.
//!
//! The search walks an N×M grid of (departure, arrival) pairs in a fixed
//! order, departure index ascending and then arrival index ascending. Every
//! feasible cell is solved with a [`LambertSolver`]; the cell stores the
//! cheapest branch and the cheapest cell overall becomes the [`BestTransfer`].
//! Cells that are filtered out, whose ephemeris lookups fail, or whose solver
//! returns nothing usable are left as `NaN` and never compete for the best.

use log::{debug, info, warn};
use scout_core::time::{days_to_seconds, seconds_to_days};
use scout_core::vector::{self, Vector3};
use scout_ephem::{Ephemeris, StateVector};
use scout_impulsive::lambert::{
    Direction, LambertBranch, LambertProblem, LambertSolver, LambertSolverError,
};
use serde::Serialize;
use thiserror::Error;

/// Second grid axis: absolute arrival epochs or flight durations.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrivalAxis {
    /// Arrival epochs in MJD2000 days.
    Epochs(Vec<f64>),
    /// Flight durations in days, added to each departure epoch.
    FlightDurations(Vec<f64>),
}

impl ArrivalAxis {
    pub fn values(&self) -> &[f64] {
        match self {
            ArrivalAxis::Epochs(values) | ArrivalAxis::FlightDurations(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Arrival epoch of column `j` for a departure at `departure_epoch`.
    pub fn arrival_epoch(&self, departure_epoch: f64, j: usize) -> f64 {
        match self {
            ArrivalAxis::Epochs(values) => values[j],
            ArrivalAxis::FlightDurations(values) => departure_epoch + values[j],
        }
    }

    /// Axis label used by reports and plots.
    pub fn label(&self) -> &'static str {
        match self {
            ArrivalAxis::Epochs(_) => "arrival_epoch",
            ArrivalAxis::FlightDurations(_) => "flight_days",
        }
    }
}

/// Which burns count towards the cost of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// `|v_origin - v1|`: intercept or impact, no arrival burn.
    DepartureOnly,
    /// `|v_origin - v1| + |v_target - v2|`.
    #[default]
    Rendezvous,
}

/// Feasibility filter on (departure, arrival) pairs, in days.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeasibilityWindow {
    /// Arrival must be strictly later than departure plus this buffer.
    pub min_transfer_days: f64,
    /// Absolute deadline (MJD2000); arrival must precede it by more than the margin.
    pub deadline: Option<f64>,
    pub deadline_margin_days: f64,
}

impl FeasibilityWindow {
    pub fn admits(&self, departure_epoch: f64, arrival_epoch: f64) -> bool {
        if arrival_epoch <= departure_epoch + self.min_transfer_days {
            return false;
        }
        match self.deadline {
            Some(deadline) => arrival_epoch < deadline - self.deadline_margin_days,
            None => true,
        }
    }
}

/// Inputs of one grid search.
pub struct SearchRequest<'a> {
    pub origin: &'a dyn Ephemeris,
    pub target: &'a dyn Ephemeris,
    /// Departure epochs in MJD2000 days.
    pub departure_epochs: Vec<f64>,
    pub arrival_axis: ArrivalAxis,
    pub window: FeasibilityWindow,
    pub mu_km3_s2: f64,
    pub max_revolutions: u32,
    pub direction: Direction,
    pub cost: CostModel,
}

/// N×M matrix of per-cell minimum delta-v (km/s), row-major by departure.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferGrid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl TransferGrid {
    /// Grid with every cell marked infeasible.
    pub fn infeasible(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![f64::NAN; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell value; `NaN` means infeasible.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.cols + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.cols + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(i, j, value)` for every feasible cell in scan order.
    pub fn feasible_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .map(|(k, v)| (k / self.cols, k % self.cols, *v))
    }

    pub fn feasible_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Smallest feasible value, if any.
    pub fn min_feasible(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                Some(current) if v >= current => Some(current),
                _ => Some(v),
            })
    }
}

/// Cost of one Lambert branch against the endpoint body velocities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchCost {
    /// Position of the branch in the solver's output.
    pub index: usize,
    pub branch: LambertBranch,
    pub departure_dv_km_s: f64,
    pub arrival_dv_km_s: f64,
    pub total_dv_km_s: f64,
}

/// Best cell of a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestTransfer {
    pub departure_epoch: f64,
    pub arrival_epoch: f64,
    pub time_of_flight_s: f64,
    pub departure_index: usize,
    pub arrival_index: usize,
    pub branch_index: usize,
    pub revolutions: u32,
    pub r1_km: Vector3,
    pub r2_km: Vector3,
    pub v1_km_s: Vector3,
    pub v2_km_s: Vector3,
    pub origin_velocity_km_s: Vector3,
    pub target_velocity_km_s: Vector3,
    pub departure_dv_km_s: f64,
    /// Relative speed at the target; only part of the total for rendezvous.
    pub arrival_dv_km_s: f64,
    pub total_dv_km_s: f64,
}

impl BestTransfer {
    pub fn time_of_flight_days(&self) -> f64 {
        seconds_to_days(self.time_of_flight_s)
    }
}

/// Counters gathered while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchStats {
    pub cells: usize,
    pub filtered: usize,
    pub ephemeris_failures: usize,
    pub solver_failures: usize,
    /// Solver succeeded but produced no finite branch.
    pub empty_cells: usize,
    pub feasible: usize,
}

/// Result of [`search`].
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub grid: TransferGrid,
    pub departure_epochs: Vec<f64>,
    pub arrival_axis: ArrivalAxis,
    pub best: Option<BestTransfer>,
    pub stats: SearchStats,
}

impl SearchOutcome {
    /// Arrival epoch of cell (i, j).
    pub fn arrival_epoch(&self, i: usize, j: usize) -> f64 {
        self.arrival_axis.arrival_epoch(self.departure_epochs[i], j)
    }
}

/// Malformed search input, reported before any cell is evaluated.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("departure grid is empty")]
    EmptyDepartureGrid,
    #[error("arrival axis is empty")]
    EmptyArrivalAxis,
    #[error("{axis} value at index {index} is not finite ({value})")]
    NonFiniteAxisValue {
        axis: &'static str,
        index: usize,
        value: f64,
    },
    #[error("gravitational parameter must be positive, got {0}")]
    NonPositiveMu(f64),
    #[error("invalid feasibility window: {0}")]
    InvalidWindow(String),
}

/// Evaluate every branch the solver returns for one problem.
///
/// Non-finite branches are dropped. The returned costs keep the solver's
/// branch order.
pub fn branch_costs<S: LambertSolver + ?Sized>(
    solver: &S,
    problem: &LambertProblem,
    origin_velocity_km_s: &Vector3,
    target_velocity_km_s: &Vector3,
    cost: CostModel,
) -> Result<Vec<BranchCost>, LambertSolverError> {
    let branches = solver.solve(problem)?;
    Ok(branches
        .into_iter()
        .enumerate()
        .filter_map(|(index, branch)| {
            let departure = vector::distance(origin_velocity_km_s, &branch.v1_km_s);
            let arrival = vector::distance(target_velocity_km_s, &branch.v2_km_s);
            let total = match cost {
                CostModel::DepartureOnly => departure,
                CostModel::Rendezvous => departure + arrival,
            };
            total.is_finite().then_some(BranchCost {
                index,
                branch,
                departure_dv_km_s: departure,
                arrival_dv_km_s: arrival,
                total_dv_km_s: total,
            })
        })
        .collect())
}

fn validate(request: &SearchRequest<'_>) -> Result<(), SearchError> {
    if request.departure_epochs.is_empty() {
        return Err(SearchError::EmptyDepartureGrid);
    }
    if request.arrival_axis.is_empty() {
        return Err(SearchError::EmptyArrivalAxis);
    }
    if let Some((index, value)) = first_non_finite(&request.departure_epochs) {
        return Err(SearchError::NonFiniteAxisValue {
            axis: "departure",
            index,
            value,
        });
    }
    if let Some((index, value)) = first_non_finite(request.arrival_axis.values()) {
        return Err(SearchError::NonFiniteAxisValue {
            axis: request.arrival_axis.label(),
            index,
            value,
        });
    }
    if request.mu_km3_s2.is_nan() || request.mu_km3_s2 <= 0.0 {
        return Err(SearchError::NonPositiveMu(request.mu_km3_s2));
    }
    let window = &request.window;
    if !window.min_transfer_days.is_finite() || !window.deadline_margin_days.is_finite() {
        return Err(SearchError::InvalidWindow("buffers must be finite".into()));
    }
    if window.deadline.is_some_and(|d| !d.is_finite()) {
        return Err(SearchError::InvalidWindow("deadline must be finite".into()));
    }
    Ok(())
}

fn first_non_finite(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, v)| !v.is_finite())
}

/// Run the grid search.
pub fn search<S: LambertSolver + ?Sized>(
    request: &SearchRequest<'_>,
    solver: &S,
) -> Result<SearchOutcome, SearchError> {
    validate(request)?;

    let rows = request.departure_epochs.len();
    let cols = request.arrival_axis.len();
    let mut grid = TransferGrid::infeasible(rows, cols);
    let mut best: Option<BestTransfer> = None;
    let mut stats = SearchStats {
        cells: rows * cols,
        ..SearchStats::default()
    };

    for (i, &departure_epoch) in request.departure_epochs.iter().enumerate() {
        let origin_state = match request.origin.state_at(departure_epoch) {
            Ok(state) => state,
            Err(err) => {
                debug!(
                    "{} ephemeris unavailable at {departure_epoch:.3}: {err}",
                    request.origin.name()
                );
                stats.ephemeris_failures += cols;
                continue;
            }
        };

        for j in 0..cols {
            let arrival_epoch = request.arrival_axis.arrival_epoch(departure_epoch, j);
            if !request.window.admits(departure_epoch, arrival_epoch) {
                stats.filtered += 1;
                continue;
            }

            let target_state = match request.target.state_at(arrival_epoch) {
                Ok(state) => state,
                Err(err) => {
                    debug!(
                        "{} ephemeris unavailable at {arrival_epoch:.3}: {err}",
                        request.target.name()
                    );
                    stats.ephemeris_failures += 1;
                    continue;
                }
            };

            let problem = LambertProblem {
                r1_km: origin_state.position_km,
                r2_km: target_state.position_km,
                time_of_flight_s: days_to_seconds(arrival_epoch - departure_epoch),
                mu_km3_s2: request.mu_km3_s2,
                max_revolutions: request.max_revolutions,
                direction: request.direction,
            };

            let costs = match branch_costs(
                solver,
                &problem,
                &origin_state.velocity_km_s,
                &target_state.velocity_km_s,
                request.cost,
            ) {
                Ok(costs) => costs,
                Err(err) => {
                    debug!("cell ({i}, {j}) skipped: {err}");
                    stats.solver_failures += 1;
                    continue;
                }
            };

            let Some(cheapest) = cheapest_branch(&costs) else {
                stats.empty_cells += 1;
                continue;
            };

            grid.set(i, j, cheapest.total_dv_km_s);
            stats.feasible += 1;

            if best.is_none_or(|b| cheapest.total_dv_km_s < b.total_dv_km_s) {
                let record = best_record(
                    (i, j),
                    departure_epoch,
                    arrival_epoch,
                    &problem,
                    &origin_state,
                    &target_state,
                    cheapest,
                );
                debug!(
                    "found better delta v {:.3} km/s (branch {}, {} rev) flight {:.1} days",
                    record.total_dv_km_s,
                    record.branch_index,
                    record.revolutions,
                    record.time_of_flight_days()
                );
                best = Some(record);
            }
        }
    }

    match &best {
        Some(record) => info!(
            "{} -> {}: {} of {} cells feasible, minimum {:.3} km/s",
            request.origin.name(),
            request.target.name(),
            stats.feasible,
            stats.cells,
            record.total_dv_km_s
        ),
        None => warn!(
            "{} -> {}: no feasible cell in {} candidates",
            request.origin.name(),
            request.target.name(),
            stats.cells
        ),
    }

    Ok(SearchOutcome {
        grid,
        departure_epochs: request.departure_epochs.clone(),
        arrival_axis: request.arrival_axis.clone(),
        best,
        stats,
    })
}

/// First branch with the smallest total; later equal-cost branches lose.
fn cheapest_branch(costs: &[BranchCost]) -> Option<&BranchCost> {
    costs.iter().fold(None, |acc: Option<&BranchCost>, cost| match acc {
        Some(current) if cost.total_dv_km_s >= current.total_dv_km_s => Some(current),
        _ => Some(cost),
    })
}

fn best_record(
    (departure_index, arrival_index): (usize, usize),
    departure_epoch: f64,
    arrival_epoch: f64,
    problem: &LambertProblem,
    origin: &StateVector,
    target: &StateVector,
    cost: &BranchCost,
) -> BestTransfer {
    BestTransfer {
        departure_epoch,
        arrival_epoch,
        time_of_flight_s: problem.time_of_flight_s,
        departure_index,
        arrival_index,
        branch_index: cost.index,
        revolutions: cost.branch.revolutions,
        r1_km: problem.r1_km,
        r2_km: problem.r2_km,
        v1_km_s: cost.branch.v1_km_s,
        v2_km_s: cost.branch.v2_km_s,
        origin_velocity_km_s: origin.velocity_km_s,
        target_velocity_km_s: target.velocity_km_s,
        departure_dv_km_s: cost.departure_dv_km_s,
        arrival_dv_km_s: cost.arrival_dv_km_s,
        total_dv_km_s: cost.total_dv_km_s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_ephem::EphemerisError;

    struct Fixed(StateVector);

    impl Ephemeris for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn state_at(&self, _epoch: f64) -> Result<StateVector, EphemerisError> {
            Ok(self.0)
        }
    }

    struct Failing;

    impl LambertSolver for Failing {
        fn solve(&self, _problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
            Err(LambertSolverError::Failure("no convergence".into()))
        }
    }

    fn fixed(x: f64) -> Fixed {
        Fixed(StateVector {
            position_km: [x, 0.0, 0.0],
            velocity_km_s: [0.0, 1.0, 0.0],
        })
    }

    #[test]
    fn window_rejects_arrival_inside_buffer_and_margin() {
        let window = FeasibilityWindow {
            min_transfer_days: 10.0,
            deadline: Some(2200.0),
            deadline_margin_days: 30.0,
        };
        assert!(!window.admits(0.0, 10.0));
        assert!(window.admits(0.0, 10.5));
        assert!(window.admits(0.0, 2169.9));
        assert!(!window.admits(0.0, 2170.0));
    }

    #[test]
    fn solver_failures_leave_cells_undefined() {
        let origin = fixed(1.0e8);
        let target = fixed(2.0e8);
        let request = SearchRequest {
            origin: &origin,
            target: &target,
            departure_epochs: vec![0.0, 1.0],
            arrival_axis: ArrivalAxis::FlightDurations(vec![50.0, 60.0, 70.0]),
            window: FeasibilityWindow::default(),
            mu_km3_s2: 1.0e11,
            max_revolutions: 0,
            direction: Direction::Prograde,
            cost: CostModel::Rendezvous,
        };

        let outcome = search(&request, &Failing).expect("valid request");
        assert!(outcome.best.is_none());
        assert!(outcome.grid.values().iter().all(|v| v.is_nan()));
        assert_eq!(outcome.stats.solver_failures, 6);
        assert_eq!(outcome.stats.feasible, 0);
    }

    #[test]
    fn malformed_requests_are_rejected() {
        let origin = fixed(1.0e8);
        let mut request = SearchRequest {
            origin: &origin,
            target: &origin,
            departure_epochs: Vec::new(),
            arrival_axis: ArrivalAxis::Epochs(vec![1.0]),
            window: FeasibilityWindow::default(),
            mu_km3_s2: 1.0,
            max_revolutions: 0,
            direction: Direction::Prograde,
            cost: CostModel::Rendezvous,
        };
        assert!(matches!(search(&request, &Failing), Err(SearchError::EmptyDepartureGrid)));

        request.departure_epochs = vec![0.0, f64::NAN];
        assert!(matches!(
            search(&request, &Failing),
            Err(SearchError::NonFiniteAxisValue { index: 1, .. })
        ));

        request.departure_epochs = vec![0.0];
        request.mu_km3_s2 = 0.0;
        assert!(matches!(search(&request, &Failing), Err(SearchError::NonPositiveMu(_))));
    }

    #[test]
    fn grid_minimum_ignores_nan() {
        let mut grid = TransferGrid::infeasible(2, 2);
        grid.set(0, 1, 4.0);
        grid.set(1, 0, 3.0);
        assert_eq!(grid.min_feasible(), Some(3.0));
        assert_eq!(grid.feasible_count(), 2);
        let cells: Vec<_> = grid.feasible_cells().collect();
        assert_eq!(cells, vec![(0, 1, 4.0), (1, 0, 3.0)]);
    }
}
