//! Combined resolution: optimizer first, greedy repair for whatever is left.

use std::fmt;

use tracing::{info, warn};

use super::config::{OptimizerConfig, RepairConfig};
use super::greedy::{RepairOutcome, repair};
use super::optimizer::{OptimizeError, OptimizeOutcome, optimize};
use crate::schedule::ConflictRules;
use crate::session::Session;

/// A resolution strategy that ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Optimizer,
    Greedy,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Optimizer => f.write_str("optimizer"),
            Strategy::Greedy => f.write_str("greedy"),
        }
    }
}

/// What the pipeline did and where it ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Strategies in the order they ran.
    pub strategies: Vec<Strategy>,
    /// Optimizer result, if the optimizer ran.
    pub optimizer: Option<OptimizeOutcome>,
    /// Why the optimizer was skipped or could not run.
    pub skipped: Option<OptimizeError>,
    /// Greedy repair result, if repair ran.
    pub repair: Option<RepairOutcome>,
    /// Conflicts left on the final state.
    pub remaining: usize,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.remaining == 0
    }
}

/// Resolve the session's conflicts.
///
/// The optimizer runs first when the time table is complete. Its result is
/// kept when usable; greedy repair then clears any conflicts it left, for
/// example against dropped trains. When the optimizer is skipped or its
/// result is unusable, greedy repair starts from the untouched state.
pub fn resolve(
    session: &mut Session,
    rules: &ConflictRules,
    optimizer: &OptimizerConfig,
    repair_config: &RepairConfig,
) -> Resolution {
    let mut resolution = Resolution {
        strategies: Vec::new(),
        optimizer: None,
        skipped: None,
        repair: None,
        remaining: 0,
    };

    match optimize(session, rules, optimizer) {
        Ok(outcome) => {
            resolution.strategies.push(Strategy::Optimizer);
            if !outcome.is_usable() {
                warn!(status = %outcome.status, "optimizer result unusable, falling back to repair");
            }
            resolution.optimizer = Some(outcome);
        }
        Err(e) => {
            info!(reason = %e, "optimizer skipped");
            resolution.skipped = Some(e);
        }
    }

    let remaining = session.conflicts(rules).len();
    if remaining > 0 {
        resolution.strategies.push(Strategy::Greedy);
        let outcome = repair(session, rules, repair_config);
        resolution.remaining = outcome.remaining;
        resolution.repair = Some(outcome);
    }

    info!(
        strategies = ?resolution.strategies,
        remaining = resolution.remaining,
        "resolution finished"
    );
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, RunningTime, RuntimeClass, Station, Train, TrainClass, TrainId};

    fn id(s: &str) -> TrainId {
        TrainId::new(s).unwrap()
    }

    #[test]
    fn incomplete_time_table_goes_straight_to_repair() {
        let mut s = Session::new(
            vec![
                Station::new("A", 0.0),
                Station::new("B", 50.0),
                Station::new("C", 100.0),
            ],
            vec![],
            vec![
                Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0),
                Train::new(id("T2"), TrainClass::Passenger, Direction::Up, "A", 0),
            ],
            vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 60)],
        )
        .unwrap();
        let rules = ConflictRules::new(5, 3, 0);

        let res = resolve(&mut s, &rules, &OptimizerConfig::default(), &RepairConfig::default());

        assert_eq!(res.strategies, vec![Strategy::Greedy]);
        assert!(res.optimizer.is_none());
        assert_eq!(
            res.skipped,
            Some(OptimizeError::IncompleteTimetable { faults: 2 })
        );
        assert!(res.is_resolved());
        assert_eq!(s.train(&id("T2")).unwrap().dwell_at("A"), 5);
    }

    #[test]
    fn nothing_to_do() {
        let mut s = Session::new(
            vec![Station::new("A", 0.0), Station::new("B", 50.0)],
            vec![],
            vec![Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0)],
            vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 60)],
        )
        .unwrap();

        let res = resolve(
            &mut s,
            &ConflictRules::default(),
            &OptimizerConfig::default(),
            &RepairConfig::default(),
        );

        assert_eq!(res.strategies, vec![Strategy::Optimizer]);
        assert!(res.repair.is_none());
        assert!(res.is_resolved());
    }

    #[test]
    fn strategy_display() {
        assert_eq!(Strategy::Optimizer.to_string(), "optimizer");
        assert_eq!(Strategy::Greedy.to_string(), "greedy");
    }
}
