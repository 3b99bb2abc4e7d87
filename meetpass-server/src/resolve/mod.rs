//! Conflict resolution.
//!
//! Two strategies share one delay rule: a greedy loop that repairs the
//! earliest conflict by holding the lower-priority train, and a mixed-integer
//! model that places all trains at once. [`resolve`] chains them. Suggestions
//! use the same rule to describe fixes without applying them.

mod config;
mod delay;
mod greedy;
mod optimizer;
mod pipeline;
mod suggest;
mod worker;

#[cfg(test)]
mod scenario_tests;

pub use config::{OptimizerConfig, RepairConfig, SuggestionCosts};
pub use delay::{DelayPlan, dispatch_key, required_delay};
pub use greedy::{Adjustment, RepairOutcome, repair};
pub use optimizer::{
    DwellChange, OptimizeError, OptimizeOutcome, SolveStatus, apply, optimize, plan,
};
pub use pipeline::{Resolution, Strategy, resolve};
pub use suggest::{Suggestion, suggest};
