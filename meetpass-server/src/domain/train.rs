//! Trains, their classes and running direction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::runtime::RuntimeClass;
use super::time::Minutes;

/// Error returned when a train id is empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid train id: {reason}")]
pub struct InvalidTrainId {
    reason: &'static str,
}

/// A train identifier, unique within a session.
///
/// # Examples
///
/// ```
/// use meetpass_server::domain::TrainId;
///
/// let id = TrainId::new(" 42001 ").unwrap();
/// assert_eq!(id.as_str(), "42001");
///
/// assert!(TrainId::new("   ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrainId(String);

impl TrainId {
    /// Create an id from a string, trimming whitespace.
    ///
    /// Returns an error if nothing is left after trimming.
    pub fn new(s: impl AsRef<str>) -> Result<Self, InvalidTrainId> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(InvalidTrainId {
                reason: "train id cannot be empty",
            });
        }
        Ok(TrainId(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrainId({})", self.0)
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when parsing an unknown train class code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid train class: {0:?}")]
pub struct InvalidTrainClass(pub String);

/// Operational class of a train.
///
/// The class fixes dispatch priority, which running-time table the train
/// uses, and how far repairs may move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainClass {
    /// High-speed passenger service.
    Express,
    /// Regular passenger service.
    Passenger,
    /// Freight.
    Freight,
    /// Heavy freight; runs on the freight running times.
    FreightHeavy,
}

impl TrainClass {
    /// Dispatch priority, lower is more important.
    pub fn priority(self) -> u8 {
        match self {
            TrainClass::Express => 0,
            TrainClass::Passenger => 1,
            TrainClass::Freight | TrainClass::FreightHeavy => 2,
        }
    }

    /// The running-time table this class reads from.
    pub fn runtime_class(self) -> RuntimeClass {
        match self {
            TrainClass::Express | TrainClass::Passenger => RuntimeClass::Passenger,
            TrainClass::Freight | TrainClass::FreightHeavy => RuntimeClass::Freight,
        }
    }

    /// How far the start time may drift from its baseline before it is
    /// flagged, and the optimizer's bound on the start shift.
    pub fn start_shift_limit(self) -> Minutes {
        match self {
            TrainClass::Express | TrainClass::Passenger => 15,
            TrainClass::Freight | TrainClass::FreightHeavy => 45,
        }
    }

    /// Maximum deviation of the final arrival the optimizer accepts.
    pub fn arrival_deviation_limit(self) -> Minutes {
        match self {
            TrainClass::Express => 45,
            TrainClass::Passenger => 60,
            TrainClass::Freight | TrainClass::FreightHeavy => 180,
        }
    }

    /// Short code used in datasets.
    pub fn code(self) -> &'static str {
        match self {
            TrainClass::Express => "H",
            TrainClass::Passenger => "P",
            TrainClass::Freight => "F",
            TrainClass::FreightHeavy => "G",
        }
    }
}

impl FromStr for TrainClass {
    type Err = InvalidTrainClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "H" | "Y" | "YHT" | "HSR" | "EXPRESS" => Ok(TrainClass::Express),
            "P" | "PASSENGER" | "YOLCU" => Ok(TrainClass::Passenger),
            "F" | "FREIGHT" => Ok(TrainClass::Freight),
            "G" | "FREIGHT-HEAVY" | "HEAVY" => Ok(TrainClass::FreightHeavy),
            _ => Err(InvalidTrainClass(s.to_string())),
        }
    }
}

impl fmt::Display for TrainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid direction: {0:?} (expected up or down)")]
pub struct InvalidDirection(pub String);

/// Running direction relative to station order.
///
/// `Up` runs toward increasing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "u" => Ok(Direction::Up),
            "down" | "d" => Ok(Direction::Down),
            _ => Err(InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// A train as owned by a scheduling session.
///
/// `start` and `dwell` are the mutable parts: repair and optimization write
/// them in place. Dwell keys are station names; an absent key means no dwell.
#[derive(Debug, Clone, PartialEq)]
pub struct Train {
    pub id: TrainId,
    pub class: TrainClass,
    pub direction: Direction,
    pub origin: String,
    pub destination: Option<String>,
    /// Requested departure from the first path station.
    pub start: Minutes,
    pub dwell: BTreeMap<String, Minutes>,
}

impl Train {
    /// Create a train without destination or dwell.
    pub fn new(
        id: TrainId,
        class: TrainClass,
        direction: Direction,
        origin: impl Into<String>,
        start: Minutes,
    ) -> Self {
        Self {
            id,
            class,
            direction,
            origin: origin.into().trim().to_string(),
            destination: None,
            start,
            dwell: BTreeMap::new(),
        }
    }

    /// Set the destination. Blank names mean "run to the end of the line".
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        let destination = destination.into().trim().to_string();
        self.destination = (!destination.is_empty()).then_some(destination);
        self
    }

    /// Add a dwell entry.
    pub fn with_dwell(mut self, station: impl Into<String>, minutes: Minutes) -> Self {
        self.dwell.insert(station.into().trim().to_string(), minutes);
        self
    }

    /// Dwell at a station, zero if none is recorded.
    pub fn dwell_at(&self, station: &str) -> Minutes {
        self.dwell.get(station).copied().unwrap_or(0)
    }
}

impl fmt::Display for Train {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{},{}] {}->{} @{}m",
            self.id,
            self.class,
            self.direction,
            self.origin,
            self.destination.as_deref().unwrap_or("END"),
            self.start
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TrainId {
        TrainId::new(s).unwrap()
    }

    #[test]
    fn class_codes_parse_case_insensitively() {
        assert_eq!("p".parse::<TrainClass>(), Ok(TrainClass::Passenger));
        assert_eq!("Yolcu".parse::<TrainClass>(), Ok(TrainClass::Passenger));
        assert_eq!("yht".parse::<TrainClass>(), Ok(TrainClass::Express));
        assert_eq!("F".parse::<TrainClass>(), Ok(TrainClass::Freight));
        assert_eq!(" g ".parse::<TrainClass>(), Ok(TrainClass::FreightHeavy));
        assert_eq!(
            "freight-heavy".parse::<TrainClass>(),
            Ok(TrainClass::FreightHeavy)
        );
        assert!("X".parse::<TrainClass>().is_err());
    }

    #[test]
    fn heavy_freight_collapses_to_freight_runtimes() {
        assert_eq!(
            TrainClass::FreightHeavy.runtime_class(),
            RuntimeClass::Freight
        );
        assert_eq!(TrainClass::Express.runtime_class(), RuntimeClass::Passenger);
    }

    #[test]
    fn priorities_order_express_passenger_freight() {
        assert!(TrainClass::Express.priority() < TrainClass::Passenger.priority());
        assert!(TrainClass::Passenger.priority() < TrainClass::Freight.priority());
        assert_eq!(
            TrainClass::Freight.priority(),
            TrainClass::FreightHeavy.priority()
        );
    }

    #[test]
    fn limits_are_tighter_for_passenger_work() {
        assert_eq!(TrainClass::Passenger.start_shift_limit(), 15);
        assert_eq!(TrainClass::Freight.start_shift_limit(), 45);
        assert_eq!(TrainClass::Express.arrival_deviation_limit(), 45);
        assert_eq!(TrainClass::Passenger.arrival_deviation_limit(), 60);
        assert_eq!(TrainClass::FreightHeavy.arrival_deviation_limit(), 180);
    }

    #[test]
    fn direction_parse() {
        assert_eq!("UP".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!(" down".parse::<Direction>(), Ok(Direction::Down));
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid direction: \"sideways\" (expected up or down)"
        );
    }

    #[test]
    fn blank_destination_is_none() {
        let t = Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0)
            .with_destination("  ");
        assert_eq!(t.destination, None);
    }

    #[test]
    fn dwell_defaults_to_zero() {
        let t = Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0)
            .with_dwell("B", 4);
        assert_eq!(t.dwell_at("B"), 4);
        assert_eq!(t.dwell_at("C"), 0);
    }

    #[test]
    fn display() {
        let t = Train::new(id("T1"), TrainClass::Freight, Direction::Down, "C", 90)
            .with_destination("A");
        assert_eq!(t.to_string(), "T1 [F,down] C->A @90m");
    }

    #[test]
    fn train_id_debug() {
        assert_eq!(format!("{:?}", id("T9")), "TrainId(T9)");
    }
}
