use approx::assert_relative_eq;
use transfer_scout::config::{SpanConfig, load_flyby_scenario};
use transfer_scout::core::vector;
use transfer_scout::nbody::{Body, FlybyScenario, NBodySystem};

fn earth_flyby(span: SpanConfig) -> FlybyScenario {
    let mut config = load_flyby_scenario("configs/scenarios/earth_flyby.toml").expect("manifest");
    config.span = span;
    FlybyScenario::from_config(&config).expect("scenario")
}

#[test]
fn spacecraft_passes_closest_at_the_epoch() {
    let scenario = earth_flyby(SpanConfig {
        start_days: -2.0,
        end_days: 2.0,
        samples: 401,
    });
    let (trajectories, summary) = scenario.run().expect("propagates");

    assert_eq!(summary.samples, 401);
    assert_eq!(summary.spacecraft.as_deref(), Some("Spacecraft"));
    assert_eq!(summary.encounter_body.as_deref(), Some("Earth"));
    assert_eq!(trajectories.names.len(), 6);

    let encounter = summary.closest_approach.expect("encounter");
    assert!(encounter.offset_days.abs() < 1e-9, "closest at {} days", encounter.offset_days);
    assert_relative_eq!(encounter.distance_km, 2_000.0, max_relative = 1e-9);
    assert_relative_eq!(encounter.relative_speed_km_s, 43.3, max_relative = 1e-9);

    let change = summary.heliocentric_speed_change_km_s.expect("speed change");
    assert!(change.is_finite());
    assert!(summary.steps_accepted > 0);
}

#[test]
fn hyperbolic_pass_recedes_on_both_sides() {
    let scenario = earth_flyby(SpanConfig {
        start_days: -1.0,
        end_days: 1.0,
        samples: 3,
    });
    let (trajectories, summary) = scenario.run().expect("propagates");
    let (sc, earth) = scenario.spacecraft.expect("spacecraft");
    let separation = |k: usize| {
        vector::distance(
            &trajectories.states[k][sc].position_km,
            &trajectories.states[k][earth].position_km,
        )
    };
    // Over a day at more than 40 km/s the craft ends up millions of km away.
    assert!(separation(0) > 2.0e6);
    assert!(separation(2) > 2.0e6);
    assert_relative_eq!(separation(1), 2_000.0, max_relative = 1e-9);
    assert_eq!(summary.closest_approach.map(|e| e.offset_days), Some(0.0));
}

#[test]
fn energy_is_conserved_over_a_year() {
    let mut config = load_flyby_scenario("configs/scenarios/jupiter_system.toml").expect("manifest");
    config.span = SpanConfig {
        start_days: 0.0,
        end_days: 365.25,
        samples: 2,
    };
    let scenario = FlybyScenario::from_config(&config).expect("scenario");
    let (trajectories, summary) = scenario.run().expect("propagates");
    assert!(summary.closest_approach.is_none());
    assert!(summary.spacecraft.is_none());

    let end = rebuild(&scenario.system, &trajectories.states[1]);
    let start = scenario.system.energy();
    assert_relative_eq!(end.energy(), start, max_relative = 1e-8);
}

#[test]
fn backward_run_retraces_a_forward_run() {
    let scenario = earth_flyby(SpanConfig {
        start_days: 0.0,
        end_days: 10.0,
        samples: 2,
    });
    let forward = scenario
        .system
        .propagate(&[0.0, 10.0], scenario.tolerance)
        .expect("forward");
    let later = rebuild(&scenario.system, &forward.states[1]);
    let back = later.propagate(&[-10.0, 0.0], scenario.tolerance).expect("backward");

    for (initial, retraced) in scenario.system.bodies().iter().zip(&back.states[0]) {
        let miss = vector::distance(&initial.state.position_km, &retraced.position_km);
        assert!(miss < 100.0, "{} misses its start by {miss} km", initial.name);
    }
}

fn rebuild(system: &NBodySystem, states: &[transfer_scout::ephem::StateVector]) -> NBodySystem {
    let bodies = system
        .bodies()
        .iter()
        .zip(states)
        .map(|(body, state)| Body {
            name: body.name.clone(),
            gm_km3_s2: body.gm_km3_s2,
            state: *state,
        })
        .collect();
    NBodySystem::new(bodies).expect("valid system")
}
