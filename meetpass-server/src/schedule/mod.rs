//! Time propagation and conflict detection.
//!
//! Everything here is a pure function of the current trains and running
//! times: the time table, the occupancy windows and the conflict list are
//! rebuilt from scratch on every call and never cached across a mutation.

mod baseline;
mod config;
mod conflict;
mod timetable;

pub use baseline::{Baseline, ShiftViolation};
pub use config::ConflictRules;
pub use conflict::{
    Conflict, Interval, OccupancyWindow, TrainWindows, detect_conflicts, detect_pair,
    occupancy_windows,
};
pub use timetable::{MissingRuntimeFault, Propagation, TimeTable, TrainTimes, propagate};
