use chrono::{Duration, NaiveTime};

use crate::model::{
    attendance::{ClockInStatus, ClockOutStatus},
    shift::ShiftDefinition,
};

pub const FALLBACK_START_HOUR: u32 = 9;
pub const FALLBACK_END_HOUR: u32 = 17;
pub const FALLBACK_GRACE_MINUTES: u32 = 0;

/// The timing part of a shift that clock events are judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub grace_minutes: u32,
}

impl ShiftSchedule {
    /// Schedule used when no shift is assigned and the unit has no default.
    pub fn fallback() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(FALLBACK_START_HOUR, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(FALLBACK_END_HOUR, 0, 0).unwrap_or_default(),
            grace_minutes: FALLBACK_GRACE_MINUTES,
        }
    }
}

impl Default for ShiftSchedule {
    fn default() -> Self {
        Self::fallback()
    }
}

impl From<&ShiftDefinition> for ShiftSchedule {
    fn from(shift: &ShiftDefinition) -> Self {
        Self {
            start: shift.start_time,
            end: shift.end_time,
            grace_minutes: shift.grace_minutes,
        }
    }
}

pub fn classify_clock_in(actual: NaiveTime, schedule: &ShiftSchedule) -> ClockInStatus {
    let grace = Duration::minutes(i64::from(schedule.grace_minutes));
    if actual.signed_duration_since(schedule.start) <= grace {
        ClockInStatus::OnTime
    } else {
        ClockInStatus::Late
    }
}

pub fn classify_clock_out(actual: NaiveTime, schedule: &ShiftSchedule) -> ClockOutStatus {
    if actual < schedule.end {
        ClockOutStatus::LeftEarly
    } else {
        ClockOutStatus::OnTime
    }
}
