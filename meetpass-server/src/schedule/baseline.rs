//! Reference start times and shift-limit warnings.
//!
//! A [`Baseline`] is captured when a dataset is loaded and is only refreshed
//! when the user accepts the current start times. Trains whose start has
//! drifted further than their class allows are reported, never blocked.

use std::collections::HashMap;

use crate::domain::{DomainError, Minutes, Train, TrainClass, TrainId};

/// A train whose start moved beyond its class limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftViolation {
    pub train: TrainId,
    pub class: TrainClass,
    /// Current start minus baseline start.
    pub delta: Minutes,
    pub limit: Minutes,
}

/// Snapshot of each train's start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    starts: HashMap<TrainId, Minutes>,
}

impl Baseline {
    /// Record the current start of every train.
    pub fn capture(trains: &[Train]) -> Self {
        Self {
            starts: trains.iter().map(|t| (t.id.clone(), t.start)).collect(),
        }
    }

    pub fn start_of(&self, train: &TrainId) -> Option<Minutes> {
        self.starts.get(train).copied()
    }

    /// Trains whose start differs from the snapshot by more than their
    /// class start-shift limit. Trains absent from the snapshot are ignored.
    pub fn violations(&self, trains: &[Train]) -> Vec<ShiftViolation> {
        trains
            .iter()
            .filter_map(|t| {
                let base = self.start_of(&t.id)?;
                let delta = t.start - base;
                let limit = t.class.start_shift_limit();
                (delta.abs() > limit).then(|| ShiftViolation {
                    train: t.id.clone(),
                    class: t.class,
                    delta,
                    limit,
                })
            })
            .collect()
    }

    /// Accept every train's current start.
    pub fn accept_all(&mut self, trains: &[Train]) {
        *self = Self::capture(trains);
    }

    /// Accept one train's current start.
    pub fn accept(&mut self, trains: &[Train], id: &TrainId) -> Result<(), DomainError> {
        let train = trains
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| DomainError::UnknownTrain(id.to_string()))?;
        self.starts.insert(train.id.clone(), train.start);
        Ok(())
    }
}
