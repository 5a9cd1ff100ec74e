//! Porkchop searches, flyby propagation and their artifacts.
//!
//! The numerical work lives in the `scout_*` crates; this crate adds the
//! sinks that turn a finished search into CSV, JSON and PNG files so the
//! command-line front-ends stay thin.

pub mod plot;
pub mod report;

pub use scout_config as config;
pub use scout_core as core;
pub use scout_ephem as ephem;
pub use scout_export as export;
pub use scout_impulsive as impulsive;
pub use scout_nbody as nbody;
pub use scout_transfer as transfer;
