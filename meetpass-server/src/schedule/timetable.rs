//! Forward time propagation along train paths.
//!
//! Every call rebuilds the whole table from the current train and running
//! time state. A missing running time stops the affected train at the last
//! reachable station and is reported as a [`MissingRuntimeFault`]; other
//! trains are unaffected.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::domain::{Minutes, Path, RunningTimes, RuntimeClass, StationIdx, Topology, Train, TrainId};

/// A segment a train could not be propagated across.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRuntimeFault {
    pub train: TrainId,
    pub class: RuntimeClass,
    pub from: String,
    pub to: String,
}

impl fmt::Display for MissingRuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: no {} running time between {} and {}",
            self.train, self.class, self.from, self.to
        )
    }
}

/// Arrival times of one train, in path order.
///
/// The first entry is the requested start at the first path station. When
/// the table is partial the entries stop at the last reachable station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTimes {
    train: TrainId,
    arrivals: Vec<(StationIdx, Minutes)>,
    complete: bool,
}

impl TrainTimes {
    pub fn train(&self) -> &TrainId {
        &self.train
    }

    /// `(station, arrival)` pairs in path order.
    pub fn arrivals(&self) -> &[(StationIdx, Minutes)] {
        &self.arrivals
    }

    pub fn arrival_at(&self, station: StationIdx) -> Option<Minutes> {
        self.arrivals
            .iter()
            .find(|(idx, _)| *idx == station)
            .map(|&(_, t)| t)
    }

    /// Arrival at the last reached station.
    pub fn final_arrival(&self) -> Option<Minutes> {
        self.arrivals.last().map(|&(_, t)| t)
    }

    /// False when propagation stopped on a missing running time.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Arrival times for every train, in session order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeTable {
    trains: Vec<TrainTimes>,
    index: HashMap<TrainId, usize>,
}

impl TimeTable {
    fn push(&mut self, times: TrainTimes) {
        self.index.insert(times.train.clone(), self.trains.len());
        self.trains.push(times);
    }

    pub fn get(&self, train: &TrainId) -> Option<&TrainTimes> {
        self.index.get(train).map(|&i| &self.trains[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainTimes> {
        self.trains.iter()
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }
}

/// Result of one propagation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    pub timetable: TimeTable,
    pub faults: Vec<MissingRuntimeFault>,
}

/// Compute arrival times for each `(train, path)` pair.
///
/// `arrival(v) = arrival(u) + dwell(u) + runtime(u, v)` for each consecutive
/// pair, starting from the train's requested start. Dwell is looked up by the
/// topology's spelling of the station name.
pub fn propagate<'a>(
    topology: &Topology,
    runtimes: &RunningTimes,
    trains: impl IntoIterator<Item = (&'a Train, &'a Path)>,
) -> Propagation {
    let mut out = Propagation::default();

    for (train, path) in trains {
        let class = train.class.runtime_class();
        let mut arrivals = Vec::with_capacity(path.len());
        let mut complete = true;

        if let Some(first) = path.first() {
            arrivals.push((first, train.start));
        }

        let mut current = train.start;
        for (u, v) in path.steps() {
            let (from, to) = (topology.name(u), topology.name(v));
            let Some(run) = runtimes.get(class, from, to) else {
                trace!(train = %train.id, from, to, "missing running time");
                out.faults.push(MissingRuntimeFault {
                    train: train.id.clone(),
                    class,
                    from: from.to_string(),
                    to: to.to_string(),
                });
                complete = false;
                break;
            };
            current = current.saturating_add(train.dwell_at(from).saturating_add(run));
            arrivals.push((v, current));
        }

        out.timetable.push(TrainTimes {
            train: train.id.clone(),
            arrivals,
            complete,
        });
    }

    debug!(
        trains = out.timetable.len(),
        faults = out.faults.len(),
        "propagated time table"
    );
    out
}
