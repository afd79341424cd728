//! Entity set shared between the coordinator and the backend facade.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time_of_day::TimeOfDay;

/// The recent-duration list never holds more than this many entries.
pub const MAX_RECENT_TIMERS: usize = 5;

/// Identifier of one of the three fixed daily alarm slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AlarmSlotId(u8);

impl AlarmSlotId {
    pub const FIRST: AlarmSlotId = AlarmSlotId(1);
    pub const SECOND: AlarmSlotId = AlarmSlotId(2);
    pub const THIRD: AlarmSlotId = AlarmSlotId(3);

    pub fn new(slot: u8) -> Result<Self, ValidationError> {
        if (1..=3).contains(&slot) {
            Ok(Self(slot))
        } else {
            Err(ValidationError::SlotOutOfRange(slot))
        }
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for AlarmSlotId {
    type Error = ValidationError;

    fn try_from(slot: u8) -> Result<Self, Self::Error> {
        Self::new(slot)
    }
}

impl From<AlarmSlotId> for u8 {
    fn from(id: AlarmSlotId) -> Self {
        id.0
    }
}

/// One daily alarm. Identity is the slot id keying it; the enabled flag is
/// backend-managed and read-only on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSlot {
    #[serde(flatten)]
    pub time: TimeOfDay,
    pub enabled: bool,
}

/// The three fixed daily alarm slots.
///
/// Serializes to the backend's persisted shape:
/// `{"alarm_1": {"hour": .., "minute": .., "enabled": ..}, ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAlarms {
    #[serde(rename = "alarm_1")]
    slot_1: AlarmSlot,
    #[serde(rename = "alarm_2")]
    slot_2: AlarmSlot,
    #[serde(rename = "alarm_3")]
    slot_3: AlarmSlot,
}

impl DailyAlarms {
    pub fn get(&self, id: AlarmSlotId) -> &AlarmSlot {
        match id.0 {
            1 => &self.slot_1,
            2 => &self.slot_2,
            _ => &self.slot_3,
        }
    }

    pub fn get_mut(&mut self, id: AlarmSlotId) -> &mut AlarmSlot {
        match id.0 {
            1 => &mut self.slot_1,
            2 => &mut self.slot_2,
            _ => &mut self.slot_3,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AlarmSlotId, &AlarmSlot)> {
        [
            (AlarmSlotId::FIRST, &self.slot_1),
            (AlarmSlotId::SECOND, &self.slot_2),
            (AlarmSlotId::THIRD, &self.slot_3),
        ]
        .into_iter()
    }
}

impl Default for DailyAlarms {
    /// The 21:00 / 22:00 / 23:00 evening band, all enabled.
    ///
    /// Used when the initial `get_daily_alarms` pull fails.
    fn default() -> Self {
        let slot = |hour| AlarmSlot {
            time: TimeOfDay::normalize(hour, 0),
            enabled: true,
        };
        Self {
            slot_1: slot(21),
            slot_2: slot(22),
            slot_3: slot(23),
        }
    }
}

/// Which edge of the interval window a relative adjustment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowEdge {
    Start,
    End,
}

/// The recurring reminder window.
///
/// `start` and `end` are independent; `start > end` is legal and means the
/// window spans midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub enabled: bool,
}

impl IntervalWindow {
    pub fn edge(&self, edge: WindowEdge) -> TimeOfDay {
        match edge {
            WindowEdge::Start => self.start,
            WindowEdge::End => self.end,
        }
    }

    pub fn edge_mut(&mut self, edge: WindowEdge) -> &mut TimeOfDay {
        match edge {
            WindowEdge::Start => &mut self.start,
            WindowEdge::End => &mut self.end,
        }
    }

    /// Whether a wall-clock time falls inside the window, ignoring the
    /// enabled flag. Start-inclusive, end-exclusive.
    pub fn contains(&self, at: NaiveTime) -> bool {
        let t = TimeOfDay::normalize(at.hour() as i32, at.minute() as i32);

        // Overnight window (e.g. 22:00 - 07:00).
        if self.start > self.end {
            return t >= self.start || t < self.end;
        }

        t >= self.start && t < self.end
    }
}

impl Default for IntervalWindow {
    fn default() -> Self {
        Self {
            start: TimeOfDay::normalize(21, 0),
            end: TimeOfDay::normalize(23, 0),
            enabled: false,
        }
    }
}
