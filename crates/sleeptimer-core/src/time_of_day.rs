//! Minute-of-day time values and the two adjustment policies.
//!
//! Relative `+`/`-` adjustment wraps across midnight in either direction
//! (`adjust`); direct numeric entry clamps out-of-range components instead
//! (`normalize`). The two are deliberately distinct operations -- collapsing
//! them would change observable behavior.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// A normalized wall-clock time of day.
///
/// Invariant: `hour` is 0-23 and `minute` is 0-59 after construction.
/// Fields are private so every path in (constructors, serde) enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeOfDayWire", into = "TimeOfDayWire")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { hour: 0, minute: 0 };

    /// Strict constructor; rejects out-of-range components.
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(ValidationError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    /// Clamping constructor used by direct numeric entry.
    ///
    /// Out-of-range components are clamped, not wrapped: entering hour 25
    /// yields 23:xx, entering minute -5 yields xx:00.
    pub fn normalize(hour: i32, minute: i32) -> Self {
        Self {
            hour: hour.clamp(0, 23) as u8,
            minute: minute.clamp(0, 59) as u8,
        }
    }

    /// Shift by a signed number of minutes, wrapping across midnight.
    ///
    /// Only the time of day survives -- wrapping to the previous or next day
    /// loses no day count because none is kept. Total for any delta and
    /// never fails.
    pub fn adjust(self, delta_minutes: i32) -> Self {
        let total = (self.total_minutes() as i32 + delta_minutes).rem_euclid(MINUTES_PER_DAY);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Minutes since midnight, 0-1439.
    pub fn total_minutes(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Serde shadow so deserialization cannot bypass range validation.
#[derive(Serialize, Deserialize)]
struct TimeOfDayWire {
    hour: u8,
    minute: u8,
}

impl TryFrom<TimeOfDayWire> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(wire: TimeOfDayWire) -> Result<Self, Self::Error> {
        TimeOfDay::new(wire.hour, wire.minute)
    }
}

impl From<TimeOfDay> for TimeOfDayWire {
    fn from(t: TimeOfDay) -> Self {
        Self {
            hour: t.hour,
            minute: t.minute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(hour: u8, minute: u8) -> TimeOfDay {
        TimeOfDay::new(hour, minute).unwrap()
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(TimeOfDay::new(24, 0).is_err());
        assert!(TimeOfDay::new(0, 60).is_err());
        assert!(TimeOfDay::new(23, 59).is_ok());
    }

    #[test]
    fn adjust_wraps_to_previous_day() {
        assert_eq!(TimeOfDay::MIDNIGHT.adjust(-5), t(23, 55));
    }

    #[test]
    fn adjust_wraps_to_next_day() {
        assert_eq!(t(23, 50).adjust(20), t(0, 10));
    }

    #[test]
    fn adjust_zero_is_identity() {
        assert_eq!(t(12, 34).adjust(0), t(12, 34));
    }

    #[test]
    fn adjust_handles_multi_day_deltas() {
        assert_eq!(t(10, 0).adjust(MINUTES_PER_DAY * 3 + 30), t(10, 30));
        assert_eq!(t(10, 0).adjust(-(MINUTES_PER_DAY * 2) - 30), t(9, 30));
    }

    #[test]
    fn normalize_clamps_not_wraps() {
        assert_eq!(TimeOfDay::normalize(25, 30), t(23, 30));
        assert_eq!(TimeOfDay::normalize(-1, 30), t(0, 30));
        assert_eq!(TimeOfDay::normalize(12, 75), t(12, 59));
        assert_eq!(TimeOfDay::normalize(12, -10), t(12, 0));
        assert_eq!(TimeOfDay::normalize(8, 15), t(8, 15));
    }

    #[test]
    fn display_pads_components() {
        assert_eq!(t(7, 5).to_string(), "07:05");
    }

    #[test]
    fn deserialize_rejects_out_of_range() {
        let err = serde_json::from_str::<TimeOfDay>(r#"{"hour":24,"minute":0}"#);
        assert!(err.is_err());
        let ok: TimeOfDay = serde_json::from_str(r#"{"hour":21,"minute":0}"#).unwrap();
        assert_eq!(ok, t(21, 0));
    }

    proptest! {
        #[test]
        fn adjust_stays_in_range(hour in 0u8..24, minute in 0u8..60, delta in -1439i32..1440) {
            let adjusted = t(hour, minute).adjust(delta);
            prop_assert!(adjusted.hour() <= 23);
            prop_assert!(adjusted.minute() <= 59);
        }

        #[test]
        fn adjust_roundtrips_under_compensating_delta(
            hour in 0u8..24,
            minute in 0u8..60,
            delta in -1439i32..1440,
        ) {
            let original = t(hour, minute);
            prop_assert_eq!(original.adjust(delta).adjust(-delta), original);
        }
    }
}
