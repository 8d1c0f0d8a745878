use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;

use crate::rules::lateness::ShiftSchedule;
use crate::rules::policy::{AttendancePolicy, parse_utc_offset};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Longest date range a single attendance report may cover.
    pub report_max_days: u32,
    pub reference_cache_ttl_secs: u64,

    pub policy: AttendancePolicy,
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{key}={raw:?} is invalid: {e}"))
}

fn time(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<NaiveTime> {
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("{key}={raw:?} must be HH:MM"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source; `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));

        let offset_raw = lookup("ATTENDANCE_UTC_OFFSET").unwrap_or_else(|| "+07:00".to_string());
        let timezone = parse_utc_offset(&offset_raw)
            .with_context(|| format!("ATTENDANCE_UTC_OFFSET={offset_raw:?} must look like +07:00"))?;

        let fallback_shift = ShiftSchedule {
            start: time(&lookup, "FALLBACK_SHIFT_START", "09:00")?,
            end: time(&lookup, "FALLBACK_SHIFT_END", "17:00")?,
            grace_minutes: parsed(&lookup, "FALLBACK_GRACE_MINUTES", "0")?,
        };
        if fallback_shift.start >= fallback_shift.end {
            return Err(anyhow!("FALLBACK_SHIFT_START must be before FALLBACK_SHIFT_END"));
        }

        let policy = AttendancePolicy {
            timezone,
            fallback_shift,
            unconfigured_unit: parsed(&lookup, "GEOFENCE_UNCONFIGURED_UNIT", "block")?,
            out_of_range: parsed(&lookup, "GEOFENCE_OUT_OF_RANGE", "block")?,
            missing_shift: parsed(&lookup, "MISSING_SHIFT", "use_fallback")?,
            leave_precedence: parsed(&lookup, "LEAVE_PRECEDENCE", "leave_overrides_attendance")?,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed(&lookup, "ACCESS_TOKEN_TTL", "900")?, // default 15 min
            refresh_token_ttl: parsed(&lookup, "REFRESH_TOKEN_TTL", "604800")?, // default 7 days

            rate_login_per_min: parsed(&lookup, "RATE_LOGIN_PER_MIN", "60")?,
            rate_refresh_per_min: parsed(&lookup, "RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parsed(&lookup, "RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api/v1".to_string()),

            report_max_days: parsed(&lookup, "REPORT_MAX_DAYS", "62")?,
            reference_cache_ttl_secs: parsed(&lookup, "REFERENCE_CACHE_TTL_SECS", "300")?,

            policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::policy::{
        LeavePrecedence, MissingShiftPolicy, OutOfRangePolicy, UnconfiguredUnitPolicy,
    };
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://localhost/hrm"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_match_documented_policy() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.policy, AttendancePolicy::default());
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.report_max_days, 62);
        assert_eq!(config.api_prefix, "/api/v1");
    }

    #[test]
    fn policy_knobs_are_overridable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("ATTENDANCE_UTC_OFFSET", "+08:00"),
            ("FALLBACK_SHIFT_START", "08:30"),
            ("FALLBACK_GRACE_MINUTES", "15"),
            ("GEOFENCE_UNCONFIGURED_UNIT", "allow_with_warning"),
            ("GEOFENCE_OUT_OF_RANGE", "flag"),
            ("MISSING_SHIFT", "reject"),
            ("LEAVE_PRECEDENCE", "attendance_overrides_leave"),
        ]);
        let policy = Config::from_lookup(lookup(&pairs)).unwrap().policy;

        assert_eq!(policy.timezone.local_minus_utc(), 8 * 3600);
        assert_eq!(policy.fallback_shift.start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(policy.fallback_shift.grace_minutes, 15);
        assert_eq!(policy.unconfigured_unit, UnconfiguredUnitPolicy::AllowWithWarning);
        assert_eq!(policy.out_of_range, OutOfRangePolicy::Flag);
        assert_eq!(policy.missing_shift, MissingShiftPolicy::Reject);
        assert_eq!(policy.leave_precedence, LeavePrecedence::AttendanceOverridesLeave);
    }

    #[test]
    fn missing_required_key_is_reported() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).err().unwrap();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn bad_values_are_reported_with_their_key() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GEOFENCE_OUT_OF_RANGE", "ignore"));
        let err = Config::from_lookup(lookup(&pairs)).err().unwrap();
        assert!(err.to_string().contains("GEOFENCE_OUT_OF_RANGE"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ATTENDANCE_UTC_OFFSET", "Asia/Jakarta"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }
}
