//! Conflict detection thresholds.

use crate::domain::Minutes;

/// Separation rules applied when comparing two occupancy windows.
///
/// These are tunable per request rather than fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRules {
    /// Minimum gap between two same-direction trains on a segment (minutes).
    /// Checked at both entry and exit.
    pub headway_mins: Minutes,

    /// Minimum gap between two opposite-direction trains on a segment
    /// (minutes).
    pub clearance_mins: Minutes,

    /// Margin trimmed from both ends of every window before comparison
    /// (minutes).
    pub station_slack_mins: Minutes,
}

impl ConflictRules {
    /// Create a new rule set with the given thresholds.
    pub fn new(headway_mins: Minutes, clearance_mins: Minutes, station_slack_mins: Minutes) -> Self {
        Self {
            headway_mins,
            clearance_mins,
            station_slack_mins,
        }
    }
}

impl Default for ConflictRules {
    fn default() -> Self {
        Self {
            headway_mins: 3,
            clearance_mins: 3,
            station_slack_mins: 1,
        }
    }
}
