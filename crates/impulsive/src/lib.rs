//! Impulsive transfer utilities: Lambert boundary-value solvers and classical transfer references.

pub mod lambert;
pub mod transfers;

pub use lambert::{
    Bate, BranchKind, Direction, Izzo, LambertBranch, LambertProblem, LambertSolver,
    LambertSolverError,
};
pub use transfers::{HohmannEstimate, hohmann, synodic_period_days};
