//! Running times between stations.

use std::collections::HashMap;
use std::fmt;

use super::error::DomainError;
use super::station::normalize_name;
use super::time::{DAY_MINUTES, Minutes};

/// Which running-time table a train reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuntimeClass {
    Passenger,
    Freight,
}

impl fmt::Display for RuntimeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeClass::Passenger => f.write_str("P"),
            RuntimeClass::Freight => f.write_str("F"),
        }
    }
}

/// One row of the running-time table: minutes from `from` to `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningTime {
    pub from: String,
    pub to: String,
    pub class: RuntimeClass,
    pub minutes: Minutes,
}

impl RunningTime {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        class: RuntimeClass,
        minutes: Minutes,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            class,
            minutes,
        }
    }
}

/// Running times keyed by `(class, from, to)`.
///
/// Each direction of an edge may be supplied independently; lookups fall
/// back to the reverse orientation. Station names are matched after
/// normalization, so a table can mention stations the topology lacks.
#[derive(Debug, Clone, Default)]
pub struct RunningTimes {
    table: HashMap<(RuntimeClass, String, String), Minutes>,
}

impl RunningTimes {
    /// Build the table from rows. Later rows replace earlier ones with the
    /// same key. Durations must lie within `[0, 1440]`.
    pub fn from_rows(rows: impl IntoIterator<Item = RunningTime>) -> Result<Self, DomainError> {
        let mut times = Self::default();
        for row in rows {
            if row.minutes < 0 {
                return Err(DomainError::NegativeRuntime {
                    from: row.from,
                    to: row.to,
                });
            }
            if row.minutes > DAY_MINUTES {
                return Err(DomainError::RuntimeTooLong {
                    from: row.from,
                    to: row.to,
                    minutes: row.minutes,
                });
            }
            times.insert(row);
        }
        Ok(times)
    }

    fn insert(&mut self, row: RunningTime) {
        let key = (
            row.class,
            normalize_name(&row.from),
            normalize_name(&row.to),
        );
        self.table.insert(key, row.minutes);
    }

    /// Minutes for `class` between `from` and `to`, trying both orientations.
    pub fn get(&self, class: RuntimeClass, from: &str, to: &str) -> Option<Minutes> {
        let from = normalize_name(from);
        let to = normalize_name(to);
        self.table
            .get(&(class, from.clone(), to.clone()))
            .or_else(|| self.table.get(&(class, to, from)))
            .copied()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
