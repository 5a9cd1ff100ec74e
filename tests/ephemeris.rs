use approx::assert_relative_eq;
use transfer_scout::core::constants::{AU_KM, MU_SUN_KM3_S2};
use transfer_scout::core::time::{format_utc, parse_utc};
use transfer_scout::core::vector;
use transfer_scout::ephem::planets::VALID_UNTIL_MJD2000;
use transfer_scout::ephem::{Ephemeris, EphemerisError, JplLowPrecision, KeplerianOrbit, Planet};

#[test]
fn earth_sits_near_one_au_at_j2000() {
    let earth = JplLowPrecision::by_name("earth").expect("earth");
    let state = earth.state_at(0.5).expect("state");
    let r = vector::norm(&state.position_km) / AU_KM;
    let v = vector::norm(&state.velocity_km_s);
    assert!((0.98..1.02).contains(&r), "Earth at {r} AU");
    assert!((29.0..31.0).contains(&v), "Earth moving at {v} km/s");
    // Heliocentric longitude is near 100 degrees in early January.
    assert!(state.position_km[0] < 0.0 && state.position_km[1] > 0.0);
}

#[test]
fn mars_stays_between_perihelion_and_aphelion() {
    let mars = JplLowPrecision::new(Planet::Mars);
    for k in 0..24 {
        let epoch = 9_010.0 + 30.0 * k as f64;
        let r = vector::norm(&mars.state_at(epoch).expect("state").position_km) / AU_KM;
        assert!((1.38..1.67).contains(&r), "Mars at {r} AU on day {epoch}");
    }
}

#[test]
fn planet_names_parse_case_insensitively() {
    assert_eq!("JUPITER".parse::<Planet>().expect("jupiter"), Planet::Jupiter);
    assert_eq!(JplLowPrecision::by_name("Venus").expect("venus").name(), "Venus");
    assert!(matches!(
        JplLowPrecision::by_name("Vulcan"),
        Err(EphemerisError::UnknownBody(_))
    ));
}

#[test]
fn epochs_outside_the_fit_are_rejected() {
    let earth = JplLowPrecision::new(Planet::Earth);
    assert!(matches!(
        earth.state_at(VALID_UNTIL_MJD2000 + 1.0),
        Err(EphemerisError::OutOfRange { .. })
    ));
}

#[test]
fn keplerian_orbit_returns_to_reference_after_one_period() {
    let v = (MU_SUN_KM3_S2 / AU_KM).sqrt();
    let orbit = KeplerianOrbit::new("Craft", 100.0, [AU_KM, 0.0, 0.0], [0.0, v * 1.1, 0.1], MU_SUN_KM3_S2)
        .expect("orbit");
    let energy = orbit.specific_energy();
    let a = -MU_SUN_KM3_S2 / (2.0 * energy);
    let period_days = 2.0 * std::f64::consts::PI * (a.powi(3) / MU_SUN_KM3_S2).sqrt() / 86_400.0;

    let at_reference = orbit.state_at(100.0).expect("reference");
    assert_eq!(at_reference.position_km, [AU_KM, 0.0, 0.0]);

    for epoch in [100.0 + period_days, 100.0 - period_days] {
        let state = orbit.state_at(epoch).expect("propagated");
        assert_relative_eq!(state.position_km[0], AU_KM, max_relative = 1e-7);
        assert!(state.position_km[1].abs() < 50.0, "y drift {}", state.position_km[1]);
        assert_relative_eq!(state.velocity_km_s[1], v * 1.1, max_relative = 1e-7);
    }
}

#[test]
fn keplerian_orbit_rejects_bad_reference_states() {
    assert!(KeplerianOrbit::new("Bad", 0.0, [0.0; 3], [1.0, 0.0, 0.0], MU_SUN_KM3_S2).is_err());
    assert!(KeplerianOrbit::new("Bad", 0.0, [AU_KM, 0.0, 0.0], [f64::NAN, 0.0, 0.0], MU_SUN_KM3_S2).is_err());
    assert!(KeplerianOrbit::new("Bad", 0.0, [AU_KM, 0.0, 0.0], [0.0, 30.0, 0.0], 0.0).is_err());
}

#[test]
fn utc_strings_round_trip_through_mjd2000() {
    assert_relative_eq!(parse_utc("2000-01-01 00:00:00").expect("epoch"), 0.0);
    assert_relative_eq!(parse_utc("2000-01-01T12:00:00").expect("epoch"), 0.5);
    let start = parse_utc("2024-09-01").expect("epoch");
    assert_relative_eq!(start, 9_010.0);
    assert_eq!(format_utc(start).expect("format"), "2024-09-01 00:00:00");
    assert!(parse_utc("first of september").is_err());
}
