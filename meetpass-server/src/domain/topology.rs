//! Station ordering and name lookup for a single-track line.

use std::collections::HashMap;
use std::fmt;

use super::error::DomainError;
use super::station::{Station, StationIdx, normalize_name};

/// The direction-independent stretch of track between two adjacent stations.
///
/// Built from any orientation of the pair; the lower-positioned station is
/// always stored first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalSegment {
    low: StationIdx,
    high: StationIdx,
}

impl PhysicalSegment {
    pub fn new(a: StationIdx, b: StationIdx) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// The station with the smaller position.
    pub fn low(&self) -> StationIdx {
        self.low
    }

    /// The station with the larger position.
    pub fn high(&self) -> StationIdx {
        self.high
    }
}

impl fmt::Display for PhysicalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}|#{}", self.low.0, self.high.0)
    }
}

/// Stations sorted by linear position, with O(1) lookup by name.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    stations: Vec<Station>,
    index: HashMap<String, StationIdx>,
}

impl Topology {
    /// Sort stations by position and index them by normalized name.
    ///
    /// Stations at equal positions keep their input order.
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Result<Self, DomainError> {
        let mut stations: Vec<Station> = stations.into_iter().collect();
        for station in &stations {
            if station.name().is_empty() {
                return Err(DomainError::EmptyStationName);
            }
            if !station.km().is_finite() {
                return Err(DomainError::InvalidPosition(station.name().to_string()));
            }
        }
        stations.sort_by(|a, b| a.km().total_cmp(&b.km()));

        let mut index = HashMap::with_capacity(stations.len());
        for (i, station) in stations.iter().enumerate() {
            if index
                .insert(normalize_name(station.name()), StationIdx(i))
                .is_some()
            {
                return Err(DomainError::DuplicateStation(station.name().to_string()));
            }
        }

        Ok(Self { stations, index })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations in position order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, idx: StationIdx) -> &Station {
        &self.stations[idx.0]
    }

    pub fn name(&self, idx: StationIdx) -> &str {
        self.stations[idx.0].name()
    }

    /// All station indices in position order.
    pub fn indices(&self) -> impl DoubleEndedIterator<Item = StationIdx> + use<> {
        (0..self.stations.len()).map(StationIdx)
    }

    /// Resolve a station name, ignoring case and surrounding whitespace.
    pub fn lookup(&self, name: &str) -> Option<StationIdx> {
        self.index.get(&normalize_name(name)).copied()
    }

    /// The topology's own spelling of a station name, if it is known.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|idx| self.name(idx))
    }

    /// Render a physical segment as `low-high` station names.
    pub fn describe(&self, segment: PhysicalSegment) -> String {
        format!(
            "{}-{}",
            self.name(segment.low()),
            self.name(segment.high())
        )
    }
}
