//! Domain types for the meet/pass scheduler.
//!
//! This module contains the validated corridor model: stations ordered along
//! the line, trains with their class and running direction, and the running
//! time table. Types enforce their invariants at construction time; missing
//! data (an unknown station, an absent running time) is representable and is
//! handled by the schedule layer rather than rejected here.

mod error;
mod path;
mod runtime;
mod station;
mod time;
mod topology;
mod train;

pub use error::DomainError;
pub use path::Path;
pub use runtime::{RunningTime, RunningTimes, RuntimeClass};
pub use station::{Station, StationIdx};
pub use time::{DAY_MINUTES, Minutes, TimeError, clamp_to_day, format_hhmm, parse_hhmm};
pub use topology::{PhysicalSegment, Topology};
pub use train::{
    Direction, InvalidDirection, InvalidTrainClass, InvalidTrainId, Train, TrainClass, TrainId,
};

pub(crate) use station::normalize_name;
