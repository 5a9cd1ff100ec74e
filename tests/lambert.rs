use approx::assert_relative_eq;
use transfer_scout::core::constants::{AU_KM, MU_SUN_KM3_S2};
use transfer_scout::core::vector;
use transfer_scout::ephem::StateVector;
use transfer_scout::ephem::kepler::propagate;
use transfer_scout::impulsive::{
    Bate, BranchKind, Direction, Izzo, LambertBranch, LambertProblem, LambertSolver,
    LambertSolverError,
};

fn circular_period_s(radius_km: f64) -> f64 {
    2.0 * std::f64::consts::PI * (radius_km.powi(3) / MU_SUN_KM3_S2).sqrt()
}

fn problem(r2_km: [f64; 3], time_of_flight_s: f64, max_revolutions: u32, direction: Direction) -> LambertProblem {
    LambertProblem {
        r1_km: [AU_KM, 0.0, 0.0],
        r2_km,
        time_of_flight_s,
        mu_km3_s2: MU_SUN_KM3_S2,
        max_revolutions,
        direction,
    }
}

fn assert_reaches_target(problem: &LambertProblem, branch: &LambertBranch) {
    let start = StateVector {
        position_km: problem.r1_km,
        velocity_km_s: branch.v1_km_s,
    };
    let end = propagate(&start, problem.time_of_flight_s, problem.mu_km3_s2).expect("propagates");
    let miss = vector::distance(&end.position_km, &problem.r2_km);
    assert!(
        miss < 1e-6 * AU_KM,
        "branch {:?} with {} revolution(s) misses r2 by {miss} km",
        branch.kind,
        branch.revolutions
    );
    let dv2 = vector::distance(&end.velocity_km_s, &branch.v2_km_s);
    assert!(dv2 < 1e-5, "arrival velocity mismatch {dv2} km/s");
}

#[test]
fn quarter_orbit_matches_circular_velocity() {
    let tof = circular_period_s(AU_KM) / 4.0;
    let p = problem([0.0, AU_KM, 0.0], tof, 0, Direction::Prograde);
    let branches = Izzo::default().solve(&p).expect("lambert solve");

    assert_eq!(branches.len(), 1);
    let branch = &branches[0];
    assert_eq!(branch.kind, BranchKind::Direct);
    assert_eq!(branch.revolutions, 0);

    let expected_speed = (MU_SUN_KM3_S2 / AU_KM).sqrt();
    assert_relative_eq!(branch.v1_km_s[0], 0.0, epsilon = 1e-6);
    assert_relative_eq!(branch.v1_km_s[1], expected_speed, max_relative = 1e-6);
    assert_relative_eq!(branch.v2_km_s[0], -expected_speed, max_relative = 1e-6);
    assert_relative_eq!(branch.v2_km_s[1], 0.0, epsilon = 1e-6);
}

#[test]
fn multi_revolution_branches_come_in_pairs() {
    let tof = 3.5 * circular_period_s(AU_KM);
    let p = problem([0.0, 1.2 * AU_KM, 0.0], tof, 3, Direction::Prograde);
    let branches = Izzo::default().solve(&p).expect("lambert solve");

    assert_eq!(branches.len(), 7, "direct plus two branches per revolution");
    assert_eq!(branches[0].kind, BranchKind::Direct);
    for (n, pair) in branches[1..].chunks(2).enumerate() {
        let revs = n as u32 + 1;
        assert_eq!(pair[0].revolutions, revs);
        assert_eq!(pair[1].revolutions, revs);
        assert_eq!(pair[0].kind, BranchKind::Left);
        assert_eq!(pair[1].kind, BranchKind::Right);
    }
    for branch in &branches {
        assert_reaches_target(&p, branch);
    }
}

#[test]
fn revolution_cap_limits_branches() {
    let tof = 3.5 * circular_period_s(AU_KM);
    let p = problem([0.0, 1.2 * AU_KM, 0.0], tof, 1, Direction::Prograde);
    let branches = Izzo::default().solve(&p).expect("lambert solve");
    assert_eq!(branches.len(), 3);
    assert!(branches.iter().all(|b| b.revolutions <= 1));
}

#[test]
fn izzo_and_bate_agree_on_single_revolution() {
    let r2 = [-1.1 * AU_KM, 0.9 * AU_KM, 0.05 * AU_KM];
    let tof = 230.0 * 86_400.0;
    for direction in [Direction::Prograde, Direction::Retrograde] {
        let p = problem(r2, tof, 0, direction);
        let izzo = Izzo::default().solve(&p).expect("izzo");
        let bate = Bate::default().solve(&p).expect("bate");
        assert_eq!(izzo.len(), 1);
        assert_eq!(bate.len(), 1);
        for k in 0..3 {
            assert_relative_eq!(izzo[0].v1_km_s[k], bate[0].v1_km_s[k], epsilon = 1e-4);
            assert_relative_eq!(izzo[0].v2_km_s[k], bate[0].v2_km_s[k], epsilon = 1e-4);
        }
        assert_reaches_target(&p, &izzo[0]);
    }
}

#[test]
fn retrograde_branch_orbits_clockwise() {
    let tof = 150.0 * 86_400.0;
    let p = problem([0.3 * AU_KM, 1.3 * AU_KM, 0.0], tof, 0, Direction::Retrograde);
    let branches = Izzo::default().solve(&p).expect("lambert solve");
    let h = vector::cross(&p.r1_km, &branches[0].v1_km_s);
    assert!(h[2] < 0.0, "angular momentum should point to -z: {h:?}");
    assert_reaches_target(&p, &branches[0]);
}

#[test]
fn invalid_problems_are_rejected() {
    let solver = Izzo::default();
    let p = problem([0.0, AU_KM, 0.0], 0.0, 0, Direction::Prograde);
    assert!(matches!(solver.solve(&p), Err(LambertSolverError::NonPositiveTimeOfFlight(_))));

    let mut p = problem([0.0, AU_KM, 0.0], 86_400.0, 0, Direction::Prograde);
    p.mu_km3_s2 = -1.0;
    assert!(matches!(solver.solve(&p), Err(LambertSolverError::NonPositiveMu(_))));

    let p = problem([0.0, 0.0, 0.0], 86_400.0, 0, Direction::Prograde);
    assert!(matches!(solver.solve(&p), Err(LambertSolverError::DegenerateGeometry(_))));
}
