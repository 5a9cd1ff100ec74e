//! Ephemeris providers for heliocentric transfer searches.
//!
//! Every provider answers one question: where is this body, and how fast is it
//! moving, at a given MJD2000 epoch? Positions are in km and velocities in km/s,
//! expressed in the heliocentric ecliptic J2000 frame.

pub mod kepler;
pub mod planets;

use thiserror::Error;

pub use kepler::KeplerianOrbit;
pub use planets::{JplLowPrecision, Planet};

/// Heliocentric position and velocity of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

/// Errors surfaced while evaluating an ephemeris.
#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("epoch {epoch} (MJD2000) outside validity range [{min}, {max}] for `{body}`")]
    OutOfRange {
        body: String,
        epoch: f64,
        min: f64,
        max: f64,
    },
    #[error("unknown body `{0}`")]
    UnknownBody(String),
    #[error("Kepler solver failed to converge after {iterations} iterations")]
    KeplerNonConvergence { iterations: usize },
    #[error("invalid orbital state: {0}")]
    InvalidState(String),
}

/// Capability shared by planets and constructed bodies: state at an epoch.
pub trait Ephemeris {
    /// Display name of the body.
    fn name(&self) -> &str;

    /// Heliocentric state at `epoch_mjd2000` (days since 2000-01-01T00:00:00).
    fn state_at(&self, epoch_mjd2000: f64) -> Result<StateVector, EphemerisError>;
}

impl<T: Ephemeris + ?Sized> Ephemeris for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn state_at(&self, epoch_mjd2000: f64) -> Result<StateVector, EphemerisError> {
        (**self).state_at(epoch_mjd2000)
    }
}

impl<T: Ephemeris + ?Sized> Ephemeris for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn state_at(&self, epoch_mjd2000: f64) -> Result<StateVector, EphemerisError> {
        (**self).state_at(epoch_mjd2000)
    }
}
