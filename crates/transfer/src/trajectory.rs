//! Position samples for overlay plots of a best transfer.

use scout_core::grid::linspace;
use scout_core::vector::Vector3;
use scout_ephem::{Ephemeris, EphemerisError, KeplerianOrbit};

use crate::search::{BestTransfer, SearchOutcome};

/// Sampled path of one body or arc.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub label: String,
    pub epochs: Vec<f64>,
    pub positions_km: Vec<Vector3>,
}

impl Track {
    pub fn first(&self) -> Option<&Vector3> {
        self.positions_km.first()
    }

    pub fn last(&self) -> Option<&Vector3> {
        self.positions_km.last()
    }
}

/// Origin orbit, target path and transfer arc of a best transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOverlay {
    pub origin: Track,
    pub target: Track,
    pub transfer: Track,
    /// Target position at the impact epoch, when one was given.
    pub impact_km: Option<Vector3>,
}

/// Sample `body` at `samples` evenly spaced epochs in `[start, end]`.
///
/// Epochs where the ephemeris fails are skipped.
pub fn sample_body(body: &dyn Ephemeris, start: f64, end: f64, samples: usize) -> Track {
    let mut epochs = Vec::with_capacity(samples);
    let mut positions_km = Vec::with_capacity(samples);
    for epoch in linspace(start, end, samples) {
        if let Ok(state) = body.state_at(epoch) {
            epochs.push(epoch);
            positions_km.push(state.position_km);
        }
    }
    Track {
        label: body.name().to_string(),
        epochs,
        positions_km,
    }
}

/// Sample the best Lambert arc by propagating its departure state.
pub fn sample_transfer_arc(
    best: &BestTransfer,
    mu_km3_s2: f64,
    samples: usize,
) -> Result<Track, EphemerisError> {
    let arc = KeplerianOrbit::new("Transfer", best.departure_epoch, best.r1_km, best.v1_km_s, mu_km3_s2)?;
    let epochs = linspace(best.departure_epoch, best.arrival_epoch, samples);
    let positions_km = epochs
        .iter()
        .map(|&epoch| arc.state_at(epoch).map(|state| state.position_km))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Track {
        label: "Transfer".to_string(),
        epochs,
        positions_km,
    })
}

/// Build the overlay for the best transfer of `outcome`.
///
/// Bodies are sampled from the first departure to the latest arrival the
/// grid covers. With an `impact_epoch` the target path stops there instead.
/// Returns `Ok(None)` when the search found nothing.
pub fn overlay(
    outcome: &SearchOutcome,
    origin: &dyn Ephemeris,
    target: &dyn Ephemeris,
    mu_km3_s2: f64,
    samples: usize,
    impact_epoch: Option<f64>,
) -> Result<Option<TransferOverlay>, EphemerisError> {
    let Some(best) = &outcome.best else {
        return Ok(None);
    };

    let start = outcome.departure_epochs.first().copied().unwrap_or(best.departure_epoch);
    let last_departure = outcome.departure_epochs.last().copied().unwrap_or(best.departure_epoch);
    let end = (0..outcome.arrival_axis.len())
        .map(|j| outcome.arrival_axis.arrival_epoch(last_departure, j))
        .fold(best.arrival_epoch, f64::max);

    let (target_end, impact_km) = match impact_epoch {
        Some(epoch) => (epoch, Some(target.state_at(epoch)?.position_km)),
        None => (end, None),
    };

    Ok(Some(TransferOverlay {
        origin: sample_body(origin, start, end, samples),
        target: sample_body(target, start, target_end, samples),
        transfer: sample_transfer_arc(best, mu_km3_s2, samples)?,
        impact_km,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{ArrivalAxis, SearchStats, TransferGrid};
    use scout_core::constants::{AU_KM, MU_SUN_KM3_S2};
    use scout_core::vector;

    fn circular(name: &str, radius_au: f64) -> KeplerianOrbit {
        let r = radius_au * AU_KM;
        let v = (MU_SUN_KM3_S2 / r).sqrt();
        KeplerianOrbit::new(name, 0.0, [r, 0.0, 0.0], [0.0, v, 0.0], MU_SUN_KM3_S2).expect("orbit")
    }

    fn outcome_with_best(departure: f64, arrival: f64) -> SearchOutcome {
        let r = AU_KM;
        let v = (MU_SUN_KM3_S2 / r).sqrt();
        SearchOutcome {
            grid: TransferGrid::infeasible(2, 2),
            departure_epochs: vec![0.0, 100.0],
            arrival_axis: ArrivalAxis::FlightDurations(vec![200.0, 400.0]),
            best: Some(BestTransfer {
                departure_epoch: departure,
                arrival_epoch: arrival,
                time_of_flight_s: (arrival - departure) * 86_400.0,
                departure_index: 0,
                arrival_index: 0,
                branch_index: 0,
                revolutions: 0,
                r1_km: [r, 0.0, 0.0],
                r2_km: [0.0, r, 0.0],
                v1_km_s: [0.0, 1.1 * v, 0.0],
                v2_km_s: [0.0, v, 0.0],
                origin_velocity_km_s: [0.0, v, 0.0],
                target_velocity_km_s: [0.0, v, 0.0],
                departure_dv_km_s: 0.1 * v,
                arrival_dv_km_s: 0.0,
                total_dv_km_s: 0.1 * v,
            }),
            stats: SearchStats::default(),
        }
    }

    #[test]
    fn bodies_span_the_whole_grid_without_an_impact() {
        let origin = circular("Earth", 1.0);
        let target = circular("Comet", 1.5);
        let outcome = outcome_with_best(0.0, 200.0);
        let overlay = overlay(&outcome, &origin, &target, MU_SUN_KM3_S2, 50, None)
            .expect("samples")
            .expect("best transfer");

        assert_eq!(overlay.origin.epochs.first(), Some(&0.0));
        assert_eq!(overlay.origin.epochs.last(), Some(&500.0));
        assert_eq!(overlay.target.epochs.last(), Some(&500.0));
        assert_eq!(overlay.transfer.epochs.last(), Some(&200.0));
        assert!(overlay.impact_km.is_none());
    }

    #[test]
    fn target_path_stops_at_the_impact() {
        let origin = circular("Earth", 1.0);
        let target = circular("Comet", 1.5);
        let outcome = outcome_with_best(0.0, 200.0);
        let overlay = overlay(&outcome, &origin, &target, MU_SUN_KM3_S2, 50, Some(300.0))
            .expect("samples")
            .expect("best transfer");

        assert_eq!(overlay.origin.epochs.last(), Some(&500.0));
        assert_eq!(overlay.target.epochs.last(), Some(&300.0));
        let impact = overlay.impact_km.expect("impact point");
        let expected = target.state_at(300.0).expect("state").position_km;
        assert!(vector::distance(&impact, &expected) < 1e-6);
        let last = overlay.target.last().expect("target samples");
        assert!(vector::distance(last, &impact) < 1e-6);
    }

    #[test]
    fn nothing_to_overlay_without_a_feasible_transfer() {
        let body = circular("Earth", 1.0);
        let mut outcome = outcome_with_best(0.0, 200.0);
        outcome.best = None;
        let overlay = overlay(&outcome, &body, &body, MU_SUN_KM3_S2, 10, Some(300.0)).expect("no error");
        assert!(overlay.is_none());
    }
}
