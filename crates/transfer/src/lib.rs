//! Transfer search crate: the Lambert grid search and everything assembled around it.

pub mod scenario;
pub mod search;
pub mod sink;
pub mod trajectory;
pub mod windows;

pub use facade::*;
pub use scout_ephem as ephem;
pub use scout_impulsive as impulsive;

mod facade;
