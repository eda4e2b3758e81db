use crate::error::{PathfindingError, PathfindingResult};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathfindingType {
    Deterministic,
    Stochastic,
    // Paths are loaded from a file by the assignment loop; the core is not
    // invoked.
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapVariable {
    Count,
    Distance,
    Time,
}

// All options the core recognizes. Unknown keys are rejected at load.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub pathfinding_type: PathfindingType,
    // Width of the candidate-trip query window, in minutes.
    pub time_window: f64,
    pub stochastic_dispersion: f64,
    pub stochastic_pathset_size: u32,
    // Per-stop revisit cap for the stochastic labeler; -1 means unlimited.
    pub stochastic_max_stop_process_count: i32,
    pub min_transfer_penalty: f64,
    pub overlap_variable: OverlapVariable,
    pub overlap_scale_parameter: f64,
    pub overlap_split_transit: bool,
    // Pathset size cap; -1 disables pruning.
    pub max_num_paths: i32,
    pub min_path_probability: f64,
    pub transfer_fare_ignore_pathfinding: bool,
    pub transfer_fare_ignore_pathenum: bool,
    pub utils_conversion_factor: f64,
    pub fare_zone_symmetry: bool,
    // Minutes added to a bumped boarding threshold.
    pub bump_buffer: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pathfinding_type: PathfindingType::Stochastic,
            time_window: 30.0,
            stochastic_dispersion: 1.0,
            stochastic_pathset_size: 1000,
            stochastic_max_stop_process_count: 20,
            min_transfer_penalty: 0.1,
            overlap_variable: OverlapVariable::Count,
            overlap_scale_parameter: 1.0,
            overlap_split_transit: false,
            max_num_paths: -1,
            min_path_probability: 0.005,
            transfer_fare_ignore_pathfinding: false,
            transfer_fare_ignore_pathenum: false,
            utils_conversion_factor: 1.0,
            fare_zone_symmetry: false,
            bump_buffer: 5.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> PathfindingResult<()> {
        if !(self.stochastic_dispersion > 0.0) {
            return Err(PathfindingError::InvariantViolation(
                "stochastic_dispersion must be positive".to_owned(),
            ));
        }
        if !(self.utils_conversion_factor > 0.0) {
            return Err(PathfindingError::InvariantViolation(
                "utils_conversion_factor must be positive".to_owned(),
            ));
        }
        if !(self.time_window > 0.0) {
            return Err(PathfindingError::InvariantViolation(
                "time_window must be positive".to_owned(),
            ));
        }
        if self.stochastic_pathset_size == 0 {
            return Err(PathfindingError::InvariantViolation(
                "stochastic_pathset_size must be at least 1".to_owned(),
            ));
        }
        if !(0.0..1.0).contains(&self.min_path_probability) {
            return Err(PathfindingError::InvariantViolation(
                "min_path_probability must be in [0, 1)".to_owned(),
            ));
        }
        if self.bump_buffer < 0.0 {
            return Err(PathfindingError::InvariantViolation(
                "bump_buffer must be non-negative".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn time_window_secs(&self) -> i32 {
        (self.time_window * 60.0).round() as i32
    }

    pub fn bump_buffer_secs(&self) -> i32 {
        (self.bump_buffer * 60.0).round() as i32
    }
}
