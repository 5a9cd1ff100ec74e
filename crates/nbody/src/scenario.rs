//! Flyby manifests: build the system at the scenario epoch and summarise the run.

use log::info;
use scout_config::{ConfigError, FlybyScenarioConfig};
use scout_core::constants::MU_SUN_KM3_S2;
use scout_core::grid::linspace;
use scout_core::vector;
use scout_ephem::{Ephemeris, EphemerisError, JplLowPrecision, StateVector};
use serde::Serialize;
use thiserror::Error;

use crate::{Body, Encounter, NBodyError, NBodySystem, Trajectories};

#[derive(Debug, Error)]
pub enum FlybyError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error("propagation error: {0}")]
    Propagation(#[from] NBodyError),
}

/// Resolved flyby manifest.
#[derive(Debug, Clone)]
pub struct FlybyScenario {
    pub name: String,
    /// Epoch of the initial states, MJD2000.
    pub epoch: f64,
    pub system: NBodySystem,
    /// Index of the spacecraft and of the body it was placed relative to.
    pub spacecraft: Option<(usize, usize)>,
    pub offsets_days: Vec<f64>,
    pub tolerance: f64,
}

/// Headline numbers of a flyby run.
#[derive(Debug, Clone, Serialize)]
pub struct FlybySummary {
    pub scenario: String,
    pub epoch_mjd2000: f64,
    pub bodies: Vec<String>,
    pub samples: usize,
    pub spacecraft: Option<String>,
    pub encounter_body: Option<String>,
    pub closest_approach: Option<Encounter>,
    /// Change in spacecraft speed relative to the Sun across the span (km/s).
    pub heliocentric_speed_change_km_s: Option<f64>,
    pub steps_accepted: usize,
    pub steps_rejected: usize,
}

impl FlybyScenario {
    pub fn from_config(config: &FlybyScenarioConfig) -> Result<Self, FlybyError> {
        config.validate()?;
        let epoch = config.epoch_mjd2000()?;

        let mut bodies = Vec::with_capacity(config.bodies.len() + 1);
        for body in &config.bodies {
            let (gm, state) = if body.name.eq_ignore_ascii_case("sun") {
                let at_rest = StateVector {
                    position_km: [0.0; 3],
                    velocity_km_s: [0.0; 3],
                };
                (MU_SUN_KM3_S2, at_rest)
            } else {
                let planet = JplLowPrecision::by_name(&body.name)?;
                (planet.planet().gm_km3_s2(), planet.state_at(epoch)?)
            };
            bodies.push(Body {
                name: body.name.clone(),
                gm_km3_s2: body.gm_km3_s2.unwrap_or(gm),
                state,
            });
        }

        let mut spacecraft = None;
        if let Some(sc) = &config.spacecraft {
            let anchor = bodies
                .iter()
                .position(|b| b.name.eq_ignore_ascii_case(&sc.relative_to))
                .ok_or_else(|| NBodyError::UnknownBody(sc.relative_to.clone()))?;
            let anchor_state = bodies[anchor].state;
            bodies.push(Body {
                name: sc.name.clone(),
                gm_km3_s2: 0.0,
                state: StateVector {
                    position_km: vector::add(&anchor_state.position_km, &sc.offset_km),
                    velocity_km_s: vector::add(&anchor_state.velocity_km_s, &sc.velocity_km_s),
                },
            });
            spacecraft = Some((bodies.len() - 1, anchor));
        }

        let mut system = NBodySystem::new(bodies)?;
        system.move_to_barycenter();

        Ok(Self {
            name: config.name.clone(),
            epoch,
            system,
            spacecraft,
            offsets_days: linspace(config.span.start_days, config.span.end_days, config.span.samples),
            tolerance: config.tolerance,
        })
    }

    pub fn run(&self) -> Result<(Trajectories, FlybySummary), FlybyError> {
        let trajectories = self.system.propagate(&self.offsets_days, self.tolerance)?;
        let summary = self.summarize(&trajectories);
        if let Some(encounter) = &summary.closest_approach {
            info!(
                "{}: closest approach {:.0} km at {:+.3} days, relative speed {:.3} km/s",
                self.name, encounter.distance_km, encounter.offset_days, encounter.relative_speed_km_s
            );
        }
        Ok((trajectories, summary))
    }

    fn summarize(&self, trajectories: &Trajectories) -> FlybySummary {
        let bodies = self.system.bodies();
        let sun = self.system.index_of("sun").ok();
        let (closest_approach, speed_change) = match self.spacecraft {
            Some((sc, anchor)) => (
                trajectories.closest_approach(sc, anchor),
                sun.and_then(|sun| trajectories.speed_change(sc, sun)),
            ),
            None => (None, None),
        };

        FlybySummary {
            scenario: self.name.clone(),
            epoch_mjd2000: self.epoch,
            bodies: bodies.iter().map(|b| b.name.clone()).collect(),
            samples: trajectories.offsets_days.len(),
            spacecraft: self.spacecraft.map(|(sc, _)| bodies[sc].name.clone()),
            encounter_body: self.spacecraft.map(|(_, anchor)| bodies[anchor].name.clone()),
            closest_approach,
            heliocentric_speed_change_km_s: speed_change,
            steps_accepted: trajectories.stats.accepted,
            steps_rejected: trajectories.stats.rejected,
        }
    }
}
