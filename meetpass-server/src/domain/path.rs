//! Station sequences followed by trains.

use super::station::StationIdx;
use super::topology::{PhysicalSegment, Topology};
use super::train::{Direction, Train};

/// Ordered stations a train calls at or passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<StationIdx>);

impl Path {
    pub fn new(stations: Vec<StationIdx>) -> Self {
        Path(stations)
    }

    /// Derive a train's path from its origin, destination and direction.
    ///
    /// With a known origin and a known, distinct destination the path is the
    /// inclusive range between them and the train's direction is overwritten
    /// to match. Otherwise the path is the whole line in the train's stated
    /// direction. Unknown names never fail; they degrade to the full line.
    pub fn build(topology: &Topology, train: &mut Train) -> Self {
        let origin = topology.lookup(&train.origin);
        let destination = train
            .destination
            .as_deref()
            .and_then(|name| topology.lookup(name));

        if let (Some(o), Some(d)) = (origin, destination) {
            if o < d {
                train.direction = Direction::Up;
                return Path((o.0..=d.0).map(StationIdx).collect());
            }
            if d < o {
                train.direction = Direction::Down;
                return Path((d.0..=o.0).rev().map(StationIdx).collect());
            }
        }

        match train.direction {
            Direction::Up => Path(topology.indices().collect()),
            Direction::Down => Path(topology.indices().rev().collect()),
        }
    }

    pub fn stations(&self) -> &[StationIdx] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<StationIdx> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<StationIdx> {
        self.0.last().copied()
    }

    /// Consecutive `(from, to)` pairs along the path.
    pub fn steps(&self) -> impl Iterator<Item = (StationIdx, StationIdx)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    /// The station at which the path enters `segment`, if it traverses it.
    pub fn entry_station(&self, segment: PhysicalSegment) -> Option<StationIdx> {
        self.steps()
            .find(|&(u, v)| PhysicalSegment::new(u, v) == segment)
            .map(|(u, _)| u)
    }
}
