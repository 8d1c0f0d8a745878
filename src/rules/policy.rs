use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::rules::lateness::ShiftSchedule;

/// UTC+7, the zone attendance dates are computed in unless configured otherwise.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// What to do when the employee's unit has no registered coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UnconfiguredUnitPolicy {
    #[default]
    Block,
    AllowWithWarning,
}

/// What to do with a clock event outside the unit's radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    #[default]
    Block,
    Flag,
}

/// What to do when neither the employee nor the unit provides a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MissingShiftPolicy {
    #[default]
    UseFallback,
    Reject,
}

/// Which classification wins when a day has both attendance and approved leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeavePrecedence {
    #[default]
    LeaveOverridesAttendance,
    AttendanceOverridesLeave,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendancePolicy {
    pub timezone: FixedOffset,
    pub fallback_shift: ShiftSchedule,
    pub unconfigured_unit: UnconfiguredUnitPolicy,
    pub out_of_range: OutOfRangePolicy,
    pub missing_shift: MissingShiftPolicy,
    pub leave_precedence: LeavePrecedence,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            timezone: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
            fallback_shift: ShiftSchedule::fallback(),
            unconfigured_unit: UnconfiguredUnitPolicy::default(),
            out_of_range: OutOfRangePolicy::default(),
            missing_shift: MissingShiftPolicy::default(),
            leave_precedence: LeavePrecedence::default(),
        }
    }
}

/// Parses `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
