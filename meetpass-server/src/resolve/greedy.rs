//! Greedy conflict repair.
//!
//! Each iteration recomputes the conflicts, takes the earliest one and delays
//! the train that gives way. The delay is absorbed as dwell at one anchor
//! station per train, chosen the first time the train is touched and reused
//! afterwards so that repeated small fixes do not spread dwell along the
//! path. Whatever does not fit under the dwell cap becomes a start shift.
//! No iteration leaves more conflicts behind than it started with.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, trace};

use super::config::RepairConfig;
use super::delay::DelayPlan;
use crate::domain::{Minutes, StationIdx, TrainId, clamp_to_day};
use crate::schedule::{Conflict, ConflictRules};
use crate::session::Session;

/// One change applied by the repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub train: TrainId,
    /// Anchor station the dwell was added at.
    pub station: Option<String>,
    pub dwell_added: Minutes,
    /// Start shift actually applied after clamping to the day.
    pub shift: Minutes,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.station, self.dwell_added, self.shift) {
            (Some(station), d, 0) if d > 0 => {
                write!(f, "{} @ {} +{} min dwell", self.train, station, d)
            }
            (Some(station), d, s) if d > 0 => write!(
                f,
                "{} @ {} +{} min dwell, start +{} min",
                self.train, station, d, s
            ),
            (_, _, s) => write!(f, "{} start +{} min", self.train, s),
        }
    }
}

/// Result of a repair run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    /// Number of adjustments applied.
    pub iterations: usize,
    /// Conflicts left when the loop stopped.
    pub remaining: usize,
    pub adjustments: Vec<Adjustment>,
}

impl RepairOutcome {
    pub fn is_resolved(&self) -> bool {
        self.remaining == 0
    }

    /// The adjustments as log lines.
    pub fn log(&self) -> Vec<String> {
        self.adjustments.iter().map(ToString::to_string).collect()
    }
}

/// Repair conflicts in place.
///
/// Conflicts are tried earliest first. A fix is kept only if the conflict
/// count does not grow; the delayed train first takes dwell at its anchor,
/// then a pure start shift, and if both add conflicts it is put back and the
/// next conflict is tried. The loop stops when no conflicts remain, after
/// `max_iterations` adjustments, or when no conflict admits a fix. The
/// remaining count is always measured on the final state.
pub fn repair(session: &mut Session, rules: &ConflictRules, config: &RepairConfig) -> RepairOutcome {
    let mut anchors: HashMap<TrainId, Option<StationIdx>> = HashMap::new();
    let mut outcome = RepairOutcome::default();
    let mut conflicts = session.conflicts(rules);

    while !conflicts.is_empty() && outcome.iterations < config.max_iterations {
        let mut targets: Vec<&Conflict> = conflicts.iter().collect();
        targets.sort_by_key(|c| c.interval.start);

        let mut step = None;
        for target in targets {
            let Some(plan) = DelayPlan::for_conflict(target, session, rules) else {
                continue;
            };
            let anchor = match anchors.get(&plan.train) {
                Some(&anchor) => anchor,
                None => plan
                    .entry_station(session)
                    .or_else(|| session.path(&plan.train).and_then(|p| p.first())),
            };
            if let Some(found) = attempt(session, rules, config, &plan, anchor, conflicts.len()) {
                anchors.entry(plan.train.clone()).or_insert(anchor);
                step = Some((plan, found));
                break;
            }
            trace!(train = %plan.train, need = plan.need, "fix would add conflicts");
        }

        let Some((plan, (adjustment, next))) = step else {
            debug!(conflicts = conflicts.len(), "repair stalled");
            break;
        };
        debug!(
            adjustment = %adjustment,
            gives_way_to = %plan.other,
            conflicts = next.len(),
            "applied repair"
        );
        outcome.adjustments.push(adjustment);
        outcome.iterations += 1;
        conflicts = next;
    }

    outcome.remaining = conflicts.len();
    info!(
        iterations = outcome.iterations,
        remaining = outcome.remaining,
        "greedy repair finished"
    );
    outcome
}

/// Delay `plan.train`, keeping the change only if at most `limit` conflicts
/// result. Returns the adjustment with the new conflicts, or `None` with the
/// train restored.
fn attempt(
    session: &mut Session,
    rules: &ConflictRules,
    config: &RepairConfig,
    plan: &DelayPlan,
    anchor: Option<StationIdx>,
    limit: usize,
) -> Option<(Adjustment, Vec<Conflict>)> {
    let anchor_name = anchor.map(|idx| session.topology().name(idx).to_string());
    let train = session.train(&plan.train)?;
    let (start, dwell) = (train.start, train.dwell.clone());
    let current = anchor_name.as_deref().map_or(0, |name| train.dwell_at(name));
    let headroom = if anchor_name.is_some() {
        config.dwell_cap_mins.saturating_sub(current).max(0)
    } else {
        0
    };

    let with_dwell = plan.need.min(headroom);
    let variants = if with_dwell > 0 {
        vec![with_dwell, 0]
    } else {
        vec![0]
    };

    for dwell_added in variants {
        let train = session.train_mut(&plan.train).ok()?;
        let station = anchor_name.clone().filter(|_| dwell_added > 0);
        if let Some(name) = &station {
            train.dwell.insert(name.clone(), current.saturating_add(dwell_added));
        }
        train.start = clamp_to_day(start.saturating_add(plan.need - dwell_added));
        let shift = train.start - start;
        if dwell_added == 0 && shift == 0 {
            continue;
        }

        let next = session.conflicts(rules);
        if next.len() <= limit {
            let adjustment = Adjustment {
                train: plan.train.clone(),
                station,
                dwell_added,
                shift,
            };
            return Some((adjustment, next));
        }

        let train = session.train_mut(&plan.train).ok()?;
        train.start = start;
        train.dwell = dwell.clone();
    }
    None
}
