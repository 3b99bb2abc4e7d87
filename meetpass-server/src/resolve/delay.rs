//! Which train gives way in a conflict, and by how much.

use crate::domain::{Minutes, PhysicalSegment, StationIdx, Train, TrainId};
use crate::schedule::{Conflict, ConflictRules, Interval};
use crate::session::Session;

/// Dispatch order: priority class first, then requested start.
///
/// The train with the greater key is the one that waits.
pub fn dispatch_key(train: &Train) -> (u8, Minutes) {
    (train.class.priority(), train.start)
}

/// The forward delay one train needs to clear a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayPlan {
    /// The train to delay.
    pub train: TrainId,
    /// The train it gives way to.
    pub other: TrainId,
    pub segment: PhysicalSegment,
    /// Minutes of delay, at least one.
    pub need: Minutes,
}

impl DelayPlan {
    /// Pick the train to delay and compute the minimum delay that puts it
    /// behind the other train on the conflict segment.
    ///
    /// Returns `None` if either train is not in the session.
    pub fn for_conflict(conflict: &Conflict, session: &Session, rules: &ConflictRules) -> Option<Self> {
        let first = session.train(&conflict.first)?;
        let second = session.train(&conflict.second)?;

        // On a full tie the second reported train waits.
        let delay_first = dispatch_key(first) > dispatch_key(second);
        let (delayed, other, dw, ow) = if delay_first {
            (first, second, conflict.first_window, conflict.second_window)
        } else {
            (second, first, conflict.second_window, conflict.first_window)
        };

        Some(Self {
            train: delayed.id.clone(),
            other: other.id.clone(),
            segment: conflict.segment,
            need: required_delay(conflict.same_direction, dw, ow, rules),
        })
    }

    /// The station where the delayed train enters the conflict segment.
    pub fn entry_station(&self, session: &Session) -> Option<StationIdx> {
        session.path(&self.train)?.entry_station(self.segment)
    }
}

/// Minutes `delayed` must move forward to sit behind `other`, floored at one.
///
/// Both windows are the slack-trimmed ones, so after the delay the pair
/// satisfies the headway (same direction) or clearance (opposite) exactly.
pub fn required_delay(
    same_direction: bool,
    delayed: Interval,
    other: Interval,
    rules: &ConflictRules,
) -> Minutes {
    let need = if same_direction {
        let h = rules.headway_mins;
        (other.start + h - delayed.start).max(other.end + h - delayed.end)
    } else {
        other.end + rules.clearance_mins - delayed.start
    };
    need.max(1)
}
