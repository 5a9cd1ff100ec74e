//! Re-exported APIs for consumers of the transfer crate.

pub use crate::scenario::{ScenarioError, SearchScenario, SolverChoice, TargetBody};
pub use crate::search::{
    ArrivalAxis, BestTransfer, BranchCost, CostModel, FeasibilityWindow, SearchError,
    SearchOutcome, SearchRequest, SearchStats, TransferGrid, branch_costs, search,
};
pub use crate::sink::{LogSink, SearchSink, SinkError, dispatch};
pub use crate::trajectory::{Track, TransferOverlay};
pub use crate::windows::{DepartureSample, LaunchWindow, WindowSuggestion};
pub use scout_impulsive::lambert::{Direction, LambertSolver};
