use crate::weights::DemandModeType;

// Request-scoped errors are returned from `find_paths`; errors raised while
// constructing the `Network` or `WeightBook` are fatal to the whole run.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PathfindingError {
    #[error("No path found.")]
    NoPathFound,

    #[error("No weights for ({user_class}, {purpose}, {mode_type:?}, {demand_mode}, {supply_mode}, {weight_name}).")]
    WeightLookupMissing {
        user_class: String,
        purpose: String,
        mode_type: DemandModeType,
        demand_mode: String,
        supply_mode: String,
        // Empty when the whole five-part map is missing rather than one row.
        weight_name: String,
    },

    #[error("Utility dropped to {cost} at stop {stop_id} before the log-sum; raise utils_conversion_factor.")]
    NegativeUtilityDetected { stop_id: String, cost: f64 },

    #[error("Label budget exhausted before any egress label was reached.")]
    BudgetExceeded,

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

pub type PathfindingResult<T> = Result<T, PathfindingError>;
