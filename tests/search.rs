use approx::assert_abs_diff_eq;
use proptest::collection::vec;
use proptest::prelude::*;
use transfer_scout::core::constants::{AU_KM, MU_SUN_KM3_S2};
use transfer_scout::ephem::{Ephemeris, EphemerisError, KeplerianOrbit, StateVector};
use transfer_scout::impulsive::{
    BranchKind, Izzo, LambertBranch, LambertProblem, LambertSolverError,
};
use transfer_scout::transfer::{
    ArrivalAxis, CostModel, Direction, FeasibilityWindow, LambertSolver, SearchOutcome,
    SearchRequest, search,
};

const ORIGIN_X: f64 = 1.0e8;
const TARGET_X: f64 = 2.0e8;
const ARRIVAL_OFFSET: f64 = 100.0;
const BODY_SPEED: f64 = 30.0;

/// Straight-line test body whose x coordinate encodes the epoch.
struct Marker {
    base_x: f64,
    valid_from: f64,
}

impl Ephemeris for Marker {
    fn name(&self) -> &str {
        "Marker"
    }

    fn state_at(&self, epoch: f64) -> Result<StateVector, EphemerisError> {
        if epoch < self.valid_from {
            return Err(EphemerisError::OutOfRange {
                body: "Marker".into(),
                epoch,
                min: self.valid_from,
                max: f64::INFINITY,
            });
        }
        Ok(StateVector {
            position_km: [self.base_x + 1_000.0 * epoch, 1.0e6, 0.0],
            velocity_km_s: [0.0, BODY_SPEED, 0.0],
        })
    }
}

fn origin() -> Marker {
    Marker {
        base_x: ORIGIN_X,
        valid_from: 0.0,
    }
}

fn target() -> Marker {
    Marker {
        base_x: TARGET_X,
        valid_from: 0.0,
    }
}

/// What the scripted solver does for one cell.
#[derive(Debug, Clone)]
enum CellScript {
    Fail,
    /// Departure delta-v of each branch, in solver order.
    Branches(Vec<f64>),
}

/// Replays a per-cell script, decoding the cell from the endpoint positions.
struct Scripted {
    cols: usize,
    cells: Vec<CellScript>,
}

impl Scripted {
    fn cell(&self, problem: &LambertProblem) -> usize {
        let i = ((problem.r1_km[0] - ORIGIN_X) / 1_000.0).round() as usize;
        let j = ((problem.r2_km[0] - TARGET_X) / 1_000.0 - ARRIVAL_OFFSET).round() as usize;
        i * self.cols + j
    }
}

impl LambertSolver for Scripted {
    fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
        match &self.cells[self.cell(problem)] {
            CellScript::Fail => Err(LambertSolverError::Failure("scripted".into())),
            CellScript::Branches(dvs) => Ok(dvs
                .iter()
                .enumerate()
                .map(|(k, &dv)| LambertBranch {
                    revolutions: k as u32,
                    kind: if k == 0 { BranchKind::Direct } else { BranchKind::Left },
                    v1_km_s: [dv, BODY_SPEED, 0.0],
                    v2_km_s: [0.0, BODY_SPEED, 0.0],
                })
                .collect()),
        }
    }
}

fn request<'a>(origin: &'a Marker, target: &'a Marker, rows: usize, cols: usize) -> SearchRequest<'a> {
    SearchRequest {
        origin,
        target,
        departure_epochs: (0..rows).map(|i| i as f64).collect(),
        arrival_axis: ArrivalAxis::Epochs((0..cols).map(|j| ARRIVAL_OFFSET + j as f64).collect()),
        window: FeasibilityWindow::default(),
        mu_km3_s2: MU_SUN_KM3_S2,
        max_revolutions: 3,
        direction: Direction::Prograde,
        cost: CostModel::DepartureOnly,
    }
}

fn expected_cell(script: &CellScript) -> f64 {
    match script {
        CellScript::Fail => f64::NAN,
        CellScript::Branches(dvs) => dvs
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc }),
    }
}

fn cell_script() -> impl Strategy<Value = CellScript> {
    let dv = prop_oneof![
        4 => (0u8..20).prop_map(|k| f64::from(k) * 0.5),
        1 => Just(f64::NAN),
    ];
    prop_oneof![
        1 => Just(CellScript::Fail),
        5 => vec(dv, 0..4).prop_map(CellScript::Branches),
    ]
}

fn scripted_grid() -> impl Strategy<Value = (usize, usize, Vec<CellScript>)> {
    (1usize..5, 1usize..5).prop_flat_map(|(rows, cols)| (Just(rows), Just(cols), vec(cell_script(), rows * cols)))
}

fn run(rows: usize, cols: usize, cells: Vec<CellScript>) -> (Vec<CellScript>, SearchOutcome) {
    let (o, t) = (origin(), target());
    let solver = Scripted { cols, cells };
    let outcome = search(&request(&o, &t, rows, cols), &solver).expect("valid request");
    (solver.cells, outcome)
}

proptest! {
    #[test]
    fn cells_hold_the_cheapest_branch((rows, cols, cells) in scripted_grid()) {
        let (cells, outcome) = run(rows, cols, cells);
        for i in 0..rows {
            for j in 0..cols {
                let expected = expected_cell(&cells[i * cols + j]);
                let actual = outcome.grid.get(i, j);
                if expected.is_nan() {
                    prop_assert!(actual.is_nan(), "cell ({i}, {j}) should be infeasible, got {actual}");
                } else {
                    prop_assert_eq!(actual, expected);
                }
            }
        }
        prop_assert_eq!(outcome.stats.feasible, outcome.grid.feasible_count());
        prop_assert_eq!(
            outcome.stats.feasible + outcome.stats.solver_failures + outcome.stats.empty_cells,
            rows * cols
        );
    }

    #[test]
    fn best_is_the_earliest_global_minimum((rows, cols, cells) in scripted_grid()) {
        let (_, outcome) = run(rows, cols, cells);
        match (&outcome.best, outcome.grid.min_feasible()) {
            (None, None) => {}
            (Some(best), Some(min)) => {
                prop_assert_eq!(best.total_dv_km_s, min);
                prop_assert_eq!(outcome.grid.get(best.departure_index, best.arrival_index), min);
                let first = outcome
                    .grid
                    .feasible_cells()
                    .find(|&(_, _, v)| v == min)
                    .map(|(i, j, _)| (i, j));
                prop_assert_eq!(Some((best.departure_index, best.arrival_index)), first);
                for (_, _, value) in outcome.grid.feasible_cells() {
                    prop_assert!(best.total_dv_km_s <= value);
                }
            }
            (best, min) => prop_assert!(false, "best {best:?} disagrees with grid minimum {min:?}"),
        }
    }

    #[test]
    fn identical_inputs_give_identical_results((rows, cols, cells) in scripted_grid()) {
        let (cells, first) = run(rows, cols, cells);
        let (_, second) = run(rows, cols, cells);
        let bits = |o: &SearchOutcome| o.grid.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        prop_assert_eq!(bits(&first), bits(&second));
        prop_assert_eq!(first.best, second.best);
        prop_assert_eq!(first.stats, second.stats);
    }
}

#[test]
fn rendezvous_adds_the_arrival_burn() {
    let (o, t) = (origin(), target());
    let solver = Scripted {
        cols: 1,
        cells: vec![CellScript::Branches(vec![2.0])],
    };
    struct Offset<'a>(&'a Scripted);
    impl LambertSolver for Offset<'_> {
        fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
            let mut branches = self.0.solve(problem)?;
            for branch in &mut branches {
                branch.v2_km_s = [0.0, BODY_SPEED + 3.0, 0.0];
            }
            Ok(branches)
        }
    }

    let mut req = request(&o, &t, 1, 1);
    req.cost = CostModel::Rendezvous;
    let outcome = search(&req, &Offset(&solver)).expect("search");
    let best = outcome.best.expect("feasible");
    assert_abs_diff_eq!(best.departure_dv_km_s, 2.0);
    assert_abs_diff_eq!(best.arrival_dv_km_s, 3.0);
    assert_abs_diff_eq!(best.total_dv_km_s, 5.0);

    req.cost = CostModel::DepartureOnly;
    let outcome = search(&req, &Offset(&solver)).expect("search");
    let best = outcome.best.expect("feasible");
    assert_abs_diff_eq!(best.total_dv_km_s, 2.0);
    assert_abs_diff_eq!(best.arrival_dv_km_s, 3.0);
}

#[test]
fn window_excluding_everything_leaves_no_best() {
    let (o, t) = (origin(), target());
    let solver = Scripted {
        cols: 3,
        cells: vec![CellScript::Branches(vec![1.0]); 9],
    };
    let mut req = request(&o, &t, 3, 3);
    req.window.min_transfer_days = 1_000.0;
    let outcome = search(&req, &solver).expect("search");
    assert!(outcome.best.is_none());
    assert!(outcome.grid.values().iter().all(|v| v.is_nan()));
    assert_eq!(outcome.stats.filtered, 9);
}

#[test]
fn deadline_margin_drops_late_arrivals() {
    let (o, t) = (origin(), target());
    let solver = Scripted {
        cols: 3,
        cells: vec![CellScript::Branches(vec![5.0]), CellScript::Branches(vec![4.0]), CellScript::Branches(vec![1.0])],
    };
    let mut req = request(&o, &t, 1, 3);
    req.window.deadline = Some(ARRIVAL_OFFSET + 12.0);
    req.window.deadline_margin_days = 10.5;
    let outcome = search(&req, &solver).expect("search");
    assert!(outcome.grid.get(0, 2).is_nan());
    assert_eq!(outcome.best.expect("feasible").arrival_index, 1);
    assert_eq!(outcome.stats.filtered, 1);
}

#[test]
fn ephemeris_gaps_blank_whole_rows() {
    let o = Marker {
        base_x: ORIGIN_X,
        valid_from: 1.0,
    };
    let t = target();
    let solver = Scripted {
        cols: 2,
        cells: vec![CellScript::Branches(vec![1.0]); 4],
    };
    let outcome = search(&request(&o, &t, 2, 2), &solver).expect("search");
    assert!(outcome.grid.row(0).iter().all(|v| v.is_nan()));
    assert_eq!(outcome.grid.row(1), &[1.0, 1.0]);
    assert_eq!(outcome.stats.ephemeris_failures, 2);
    assert_eq!(outcome.best.expect("feasible").departure_index, 1);
}

#[test]
fn flight_duration_axis_offsets_each_departure() {
    let axis = ArrivalAxis::FlightDurations(vec![100.0, 200.0]);
    assert_eq!(axis.arrival_epoch(10.0, 1), 210.0);
    assert_eq!(ArrivalAxis::Epochs(vec![100.0, 200.0]).arrival_epoch(10.0, 1), 200.0);
}

#[test]
fn single_cell_on_a_shared_orbit_needs_no_delta_v() {
    let speed = (MU_SUN_KM3_S2 / AU_KM).sqrt();
    let orbit = KeplerianOrbit::new("Ring", 0.0, [AU_KM, 0.0, 0.0], [0.0, speed, 0.0], MU_SUN_KM3_S2)
        .expect("orbit");
    let quarter_days = 0.5 * std::f64::consts::PI * (AU_KM.powi(3) / MU_SUN_KM3_S2).sqrt() / 86_400.0;

    let req = SearchRequest {
        origin: &orbit,
        target: &orbit,
        departure_epochs: vec![0.0],
        arrival_axis: ArrivalAxis::FlightDurations(vec![quarter_days]),
        window: FeasibilityWindow::default(),
        mu_km3_s2: MU_SUN_KM3_S2,
        max_revolutions: 0,
        direction: Direction::Prograde,
        cost: CostModel::Rendezvous,
    };
    let outcome = search(&req, &Izzo::default()).expect("search");
    let best = outcome.best.expect("feasible");
    assert_eq!((best.departure_index, best.arrival_index), (0, 0));
    assert_abs_diff_eq!(best.total_dv_km_s, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(outcome.grid.get(0, 0), best.total_dv_km_s);
}
