//! Minute-of-day handling.
//!
//! The corridor runs on a single wrapped day of 1440 minutes with no date
//! dimension. Times are plain minute counts; arrivals past midnight are legal
//! values (a train leaving at 23:30 with a 60 minute run arrives at 1470) and
//! are only wrapped when rendered as a clock time.

use chrono::{NaiveTime, Timelike};

/// A count of minutes, either a point on the day timeline or a duration.
pub type Minutes = i64;

/// Length of the scheduling day.
pub const DAY_MINUTES: Minutes = 1440;

/// Error returned when parsing an invalid clock time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Clamp a requested start time into the day, `[0, 1440]`.
pub fn clamp_to_day(minutes: Minutes) -> Minutes {
    minutes.clamp(0, DAY_MINUTES)
}

/// Render a minute value as `HH:MM`, wrapping around midnight.
///
/// # Examples
///
/// ```
/// use meetpass_server::domain::format_hhmm;
///
/// assert_eq!(format_hhmm(0), "00:00");
/// assert_eq!(format_hhmm(845), "14:05");
/// assert_eq!(format_hhmm(1470), "00:30");
/// assert_eq!(format_hhmm(-30), "23:30");
/// ```
pub fn format_hhmm(minutes: Minutes) -> String {
    let wrapped = minutes.rem_euclid(DAY_MINUTES);
    let hour = (wrapped / 60) as u32;
    let minute = (wrapped % 60) as u32;
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(time) => time.format("%H:%M").to_string(),
        None => format!("{hour:02}:{minute:02}"),
    }
}

/// Parse an `HH:MM` clock time into minutes after midnight.
///
/// # Examples
///
/// ```
/// use meetpass_server::domain::parse_hhmm;
///
/// assert_eq!(parse_hhmm("00:00"), Ok(0));
/// assert_eq!(parse_hhmm("23:59"), Ok(1439));
/// assert!(parse_hhmm("24:00").is_err());
/// assert!(parse_hhmm("1430").is_err());
/// ```
pub fn parse_hhmm(s: &str) -> Result<Minutes, TimeError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(TimeError::new("empty time"));
    }
    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|_| TimeError::new("expected HH:MM format"))?;
    Ok(Minutes::from(time.hour()) * 60 + Minutes::from(time.minute()))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every minute of the day survives a render/parse round trip.
        #[test]
        fn clock_roundtrip(m in 0i64..DAY_MINUTES) {
            prop_assert_eq!(parse_hhmm(&format_hhmm(m)), Ok(m));
        }

        /// Rendering only depends on the minute modulo the day length.
        #[test]
        fn format_is_periodic(m in -5000i64..5000, days in -3i64..3) {
            prop_assert_eq!(format_hhmm(m), format_hhmm(m + days * DAY_MINUTES));
        }
    }
}
