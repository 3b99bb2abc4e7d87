//! The scheduling session.
//!
//! A [`Session`] owns one loaded dataset: the topology, the running-time
//! table and the mutable train collection, together with each train's derived
//! path. Every query recomputes the time table and conflicts from the current
//! state, so a mutation is always visible to the next evaluation.

use std::collections::{BTreeMap, HashMap};

use tracing::{info, warn};

use crate::domain::{
    DAY_MINUTES, DomainError, Minutes, Path, RunningTime, RunningTimes, Station, Topology, Train, TrainId,
    clamp_to_day, normalize_name,
};
use crate::schedule::{
    Conflict, ConflictRules, MissingRuntimeFault, Propagation, TimeTable, TrainWindows,
    detect_conflicts, occupancy_windows, propagate,
};

/// One consistent view of the session: times, faults, windows and conflicts
/// computed from the same state.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub timetable: TimeTable,
    pub faults: Vec<MissingRuntimeFault>,
    pub windows: Vec<TrainWindows>,
    pub conflicts: Vec<Conflict>,
}

impl Evaluation {
    /// True when no train stopped on a missing running time.
    pub fn is_complete(&self) -> bool {
        self.faults.is_empty()
    }
}

/// A loaded dataset and its mutable trains.
#[derive(Debug, Clone, Default)]
pub struct Session {
    topology: Topology,
    segments: Vec<(String, String)>,
    runtimes: RunningTimes,
    trains: Vec<Train>,
    paths: Vec<Path>,
    index: HashMap<TrainId, usize>,
}

impl Session {
    /// Validate and load a dataset.
    ///
    /// Train station references and dwell keys are rewritten to the
    /// topology's spelling where the station is known; unknown names are kept
    /// as given and degrade the train's path instead of failing the load.
    pub fn new(
        stations: Vec<Station>,
        segments: Vec<(String, String)>,
        trains: Vec<Train>,
        runtimes: Vec<RunningTime>,
    ) -> Result<Self, DomainError> {
        let topology = Topology::new(stations)?;
        let runtimes = RunningTimes::from_rows(runtimes)?;

        let mut index = HashMap::with_capacity(trains.len());
        let mut loaded = Vec::with_capacity(trains.len());
        for mut train in trains {
            if index.insert(train.id.clone(), loaded.len()).is_some() {
                return Err(DomainError::DuplicateTrain(train.id.to_string()));
            }
            if !(0..=DAY_MINUTES).contains(&train.start) {
                return Err(DomainError::StartOutOfRange {
                    train: train.id.to_string(),
                    start: train.start,
                });
            }
            for (station, &minutes) in &train.dwell {
                check_dwell(&train.id, station, minutes)?;
            }
            canonicalize(&topology, &mut train);
            loaded.push(train);
        }

        let paths = loaded
            .iter_mut()
            .map(|t| Path::build(&topology, t))
            .collect();

        let session = Self {
            topology,
            segments,
            runtimes,
            trains: loaded,
            paths,
            index,
        };
        info!(
            stations = session.topology.len(),
            trains = session.trains.len(),
            runtimes = session.runtimes.len(),
            "loaded dataset"
        );
        Ok(session)
    }

    /// Replace the whole dataset. On error the session is left unchanged.
    pub fn reload(
        &mut self,
        stations: Vec<Station>,
        segments: Vec<(String, String)>,
        trains: Vec<Train>,
        runtimes: Vec<RunningTime>,
    ) -> Result<(), DomainError> {
        *self = Self::new(stations, segments, trains, runtimes)?;
        Ok(())
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn runtimes(&self) -> &RunningTimes {
        &self.runtimes
    }

    /// The informational segment table as loaded.
    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }

    /// Trains in load order.
    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    pub fn train(&self, id: &TrainId) -> Option<&Train> {
        self.position(id).map(|i| &self.trains[i])
    }

    pub fn path(&self, id: &TrainId) -> Option<&Path> {
        self.position(id).map(|i| &self.paths[i])
    }

    /// Each train with its path, in load order.
    pub fn scheduled(&self) -> impl Iterator<Item = (&Train, &Path)> {
        self.trains.iter().zip(self.paths.iter())
    }

    fn position(&self, id: &TrainId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Mutable access for resolution passes. Only `start` and `dwell` may be
    /// changed through it; paths are not rebuilt.
    pub(crate) fn train_mut(&mut self, id: &TrainId) -> Result<&mut Train, DomainError> {
        let i = self
            .position(id)
            .ok_or_else(|| DomainError::UnknownTrain(id.to_string()))?;
        Ok(&mut self.trains[i])
    }

    /// Recompute the time table.
    pub fn propagate(&self) -> Propagation {
        propagate(&self.topology, &self.runtimes, self.scheduled())
    }

    /// One full recomputation cycle: propagate, derive windows, detect.
    pub fn evaluate(&self, rules: &ConflictRules) -> Evaluation {
        let Propagation { timetable, faults } = self.propagate();
        if !faults.is_empty() {
            warn!(faults = faults.len(), "time table is partial");
        }

        let windows: Vec<TrainWindows> = self
            .trains
            .iter()
            .filter_map(|t| {
                timetable
                    .get(&t.id)
                    .map(|times| occupancy_windows(&self.topology, t, times))
            })
            .collect();
        let conflicts = detect_conflicts(&windows, rules);

        Evaluation {
            timetable,
            faults,
            windows,
            conflicts,
        }
    }

    /// Conflicts of the current state.
    pub fn conflicts(&self, rules: &ConflictRules) -> Vec<Conflict> {
        self.evaluate(rules).conflicts
    }

    /// Move a train's start by `delta` minutes, clamped to the day. Returns
    /// the new start.
    pub fn shift_train(&mut self, id: &TrainId, delta: Minutes) -> Result<Minutes, DomainError> {
        let train = self.train_mut(id)?;
        train.start = clamp_to_day(train.start.saturating_add(delta));
        Ok(train.start)
    }

    /// Set the dwell of a train at one station. Zero removes the entry.
    pub fn set_dwell(
        &mut self,
        id: &TrainId,
        station: &str,
        minutes: Minutes,
    ) -> Result<(), DomainError> {
        check_dwell(id, station.trim(), minutes)?;
        let key = self
            .topology
            .canonical_name(station)
            .unwrap_or(station.trim())
            .to_string();
        let train = self.train_mut(id)?;
        if minutes == 0 {
            train.dwell.remove(&key);
        } else {
            train.dwell.insert(key, minutes);
        }
        Ok(())
    }

    /// Clamp every dwell on each train's path into `[0, cap]`. Returns how
    /// many values changed.
    pub fn clamp_dwells(&mut self, cap: Minutes) -> usize {
        let mut changed = 0;
        for (train, path) in self.trains.iter_mut().zip(self.paths.iter()) {
            for &idx in path.stations() {
                let name = self.topology.name(idx);
                if let Some(d) = train.dwell.get_mut(name) {
                    let clamped = (*d).clamp(0, cap);
                    if clamped != *d {
                        *d = clamped;
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Station names referenced by the segment table or by trains that the
    /// station table does not contain. Sorted, one entry per name ignoring
    /// case.
    pub fn unknown_stations(&self) -> Vec<String> {
        let referenced = self
            .segments
            .iter()
            .flat_map(|(u, v)| [u.as_str(), v.as_str()])
            .chain(self.trains.iter().flat_map(|t| {
                std::iter::once(t.origin.as_str()).chain(t.destination.as_deref())
            }));

        let mut unknown: BTreeMap<String, String> = BTreeMap::new();
        for name in referenced {
            let trimmed = name.trim();
            if trimmed.is_empty() || self.topology.lookup(trimmed).is_some() {
                continue;
            }
            unknown
                .entry(normalize_name(trimmed))
                .or_insert_with(|| trimmed.to_string());
        }
        unknown.into_values().collect()
    }
}

/// Dwell values must lie within `[0, 1440]`.
fn check_dwell(train: &TrainId, station: &str, minutes: Minutes) -> Result<(), DomainError> {
    if minutes < 0 {
        return Err(DomainError::NegativeDwell {
            train: train.to_string(),
            station: station.to_string(),
        });
    }
    if minutes > DAY_MINUTES {
        return Err(DomainError::DwellTooLong {
            train: train.to_string(),
            station: station.to_string(),
            minutes,
        });
    }
    Ok(())
}

fn canonicalize(topology: &Topology, train: &mut Train) {
    if let Some(name) = topology.canonical_name(&train.origin) {
        train.origin = name.to_string();
    }
    if let Some(dest) = train.destination.as_mut() {
        if let Some(name) = topology.canonical_name(dest) {
            *dest = name.to_string();
        }
    }
    train.dwell = std::mem::take(&mut train.dwell)
        .into_iter()
        .map(|(station, minutes)| {
            let key = topology
                .canonical_name(&station)
                .map(str::to_string)
                .unwrap_or(station);
            (key, minutes)
        })
        .collect();
}
