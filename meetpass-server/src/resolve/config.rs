//! Tuning for the resolution strategies.

use std::time::Duration;

use crate::domain::Minutes;

/// Configuration for greedy repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairConfig {
    /// Upper bound on repair iterations. The loop stops here even if
    /// conflicts remain.
    pub max_iterations: usize,

    /// Maximum dwell at any single station (minutes).
    /// Need beyond this is applied as a start shift.
    pub dwell_cap_mins: Minutes,
}

impl RepairConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(max_iterations: usize, dwell_cap_mins: Minutes) -> Self {
        Self {
            max_iterations,
            dwell_cap_mins,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            dwell_cap_mins: 20,
        }
    }
}

/// Relative cost of the two ways to delay a train, used to rank
/// suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionCosts {
    /// Cost of one minute of extra dwell.
    pub dwell_per_min: Minutes,

    /// Cost of one minute of start shift.
    pub shift_per_min: Minutes,
}

impl SuggestionCosts {
    pub fn new(dwell_per_min: Minutes, shift_per_min: Minutes) -> Self {
        Self {
            dwell_per_min,
            shift_per_min,
        }
    }
}

impl Default for SuggestionCosts {
    fn default() -> Self {
        Self {
            dwell_per_min: 1,
            shift_per_min: 10,
        }
    }
}

/// Configuration for the constraint optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Minimum gap between two trains' events at the same station (minutes).
    pub node_separation_mins: Minutes,

    /// Upper bound on extra dwell the model may add at a train's anchor
    /// (minutes).
    pub max_extra_dwell_mins: Minutes,

    /// Maximum total dwell at any station (minutes).
    pub dwell_cap_mins: Minutes,

    /// Wall-clock budget for the solver.
    pub time_limit: Duration,

    /// Objective weight of one minute of extra dwell.
    pub weight_dwell: f64,

    /// Objective weight of one minute of absolute start shift.
    pub weight_shift: f64,

    /// Objective weight of the corridor makespan.
    pub weight_span: f64,

    /// Reward for each placed train. Large enough to dominate the other
    /// terms so trains are only dropped when no placement exists.
    pub weight_place: f64,

    /// Penalty on slack in the node separation constraints. Zero disables
    /// the slack variables altogether.
    pub weight_compact: f64,

    /// Let the model drop trains instead of failing outright.
    pub allow_drop: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            node_separation_mins: 1,
            max_extra_dwell_mins: 15,
            dwell_cap_mins: 20,
            time_limit: Duration::from_secs(10),
            weight_dwell: 5.0,
            weight_shift: 50.0,
            weight_span: 1.0,
            weight_place: 1_000_000.0,
            weight_compact: 0.0,
            allow_drop: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let repair = RepairConfig::default();
        assert_eq!(repair.max_iterations, 500);
        assert_eq!(repair.dwell_cap_mins, 20);

        let costs = SuggestionCosts::default();
        assert_eq!(costs.dwell_per_min, 1);
        assert_eq!(costs.shift_per_min, 10);

        let opt = OptimizerConfig::default();
        assert_eq!(opt.node_separation_mins, 1);
        assert_eq!(opt.max_extra_dwell_mins, 15);
        assert_eq!(opt.dwell_cap_mins, 20);
        assert_eq!(opt.time_limit, Duration::from_secs(10));
        assert_eq!(opt.weight_dwell, 5.0);
        assert_eq!(opt.weight_shift, 50.0);
        assert_eq!(opt.weight_span, 1.0);
        assert_eq!(opt.weight_place, 1_000_000.0);
        assert_eq!(opt.weight_compact, 0.0);
        assert!(opt.allow_drop);
    }

    #[test]
    fn custom_config() {
        let repair = RepairConfig::new(1000, 30);
        assert_eq!(repair.max_iterations, 1000);
        assert_eq!(repair.dwell_cap_mins, 30);

        let costs = SuggestionCosts::new(2, 3);
        assert_eq!(costs.dwell_per_min, 2);
        assert_eq!(costs.shift_per_min, 3);
    }
}
