//! Per-conflict fix suggestions.
//!
//! Suggestions are computed against the current state and never applied;
//! each conflict is considered on its own.

use super::config::{RepairConfig, SuggestionCosts};
use super::delay::DelayPlan;
use crate::domain::{Minutes, TrainId};
use crate::schedule::ConflictRules;
use crate::session::Session;

/// The cheapest way to clear one conflict by delaying one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub train: TrainId,
    /// Station where the train enters the conflict segment.
    pub station: Option<String>,
    pub dwell: Minutes,
    pub shift: Minutes,
    pub text: String,
}

/// Propose a fix for every current conflict, earliest first.
///
/// Dwell is only proposed at the delayed train's entry station and only up
/// to the headroom under the dwell cap. Between full dwell, dwell plus shift
/// and pure shift the cheapest option under `costs` wins; ties favour dwell.
pub fn suggest(
    session: &Session,
    rules: &ConflictRules,
    repair: &RepairConfig,
    costs: &SuggestionCosts,
) -> Vec<Suggestion> {
    let mut conflicts = session.conflicts(rules);
    conflicts.sort_by_key(|c| c.interval.start);

    conflicts
        .iter()
        .filter_map(|conflict| {
            let plan = DelayPlan::for_conflict(conflict, session, rules)?;
            let train = session.train(&plan.train)?;
            let station = plan
                .entry_station(session)
                .map(|idx| session.topology().name(idx).to_string());

            let headroom = station
                .as_deref()
                .map(|name| repair.dwell_cap_mins.saturating_sub(train.dwell_at(name)).max(0))
                .unwrap_or(0);
            let (dwell, shift) = split(plan.need, headroom, costs);

            let action = match (&station, dwell, shift) {
                (Some(name), d, 0) => format!("add {d} min dwell at {name}"),
                (Some(name), d, s) if d > 0 => {
                    format!("add {d} min dwell at {name} and shift the start by {s} min")
                }
                _ => format!("shift the start by {shift} min"),
            };
            let text = format!(
                "{}: {} x {}: {} for {}",
                session.topology().describe(conflict.segment),
                conflict.first,
                conflict.second,
                action,
                plan.train
            );

            Some(Suggestion {
                train: plan.train,
                station,
                dwell,
                shift,
                text,
            })
        })
        .collect()
}

/// Split `need` into `(dwell, shift)` minutes. Costs saturate.
fn split(need: Minutes, headroom: Minutes, costs: &SuggestionCosts) -> (Minutes, Minutes) {
    let all_shift = need.saturating_mul(costs.shift_per_min);
    if headroom >= need {
        if need.saturating_mul(costs.dwell_per_min) <= all_shift {
            return (need, 0);
        }
    } else if headroom > 0 {
        let hybrid = headroom
            .saturating_mul(costs.dwell_per_min)
            .saturating_add((need - headroom).saturating_mul(costs.shift_per_min));
        if hybrid <= all_shift {
            return (headroom, need - headroom);
        }
    }
    (0, need)
}
