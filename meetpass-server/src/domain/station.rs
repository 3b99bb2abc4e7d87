//! Stations on the corridor.

use std::fmt;

/// A station with its linear position along the line.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    name: String,
    km: f64,
}

impl Station {
    /// Create a station. Surrounding whitespace is stripped from the name.
    pub fn new(name: impl Into<String>, km: f64) -> Self {
        let name = name.into();
        Self {
            name: name.trim().to_string(),
            km,
        }
    }

    /// The display name as supplied (trimmed).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Linear position in kilometres.
    pub fn km(&self) -> f64 {
        self.km
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} km)", self.name, self.km)
    }
}

/// Index of a station in position order.
///
/// Comparing two indices compares line positions, so `a < b` means `a` lies
/// "down" from `b` and a train going from `a` to `b` runs "up".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationIdx(pub usize);

/// Key used for name lookups: trimmed and case-folded.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
