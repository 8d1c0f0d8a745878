use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::model::{
    attendance::{AttendanceRecord, ClockInStatus, DailyStatus},
    leave_request::{LeaveRecord, LeaveStatus},
};
use crate::rules::policy::LeavePrecedence;

/// Civil calendar day of `instant` in the given zone.
pub fn civil_date(instant: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// True when `leave` is approved and `[start_date, end_date]` contains `target`.
pub fn covers(leave: &LeaveRecord, target: NaiveDate) -> bool {
    leave.status == LeaveStatus::Approved && leave.start_date <= target && target <= leave.end_date
}

/// Approved leave records whose inclusive range contains `target`.
pub fn covering(target: NaiveDate, leaves: &[LeaveRecord]) -> Vec<&LeaveRecord> {
    leaves.iter().filter(|leave| covers(leave, target)).collect()
}

pub fn classify_day(
    attendance: Option<&AttendanceRecord>,
    leave: Option<&LeaveRecord>,
    precedence: LeavePrecedence,
) -> DailyStatus {
    let attended = attendance.filter(|a| a.clock_in_at.is_some());

    match (attended, leave) {
        (Some(_), Some(_)) if precedence == LeavePrecedence::LeaveOverridesAttendance => {
            DailyStatus::OnLeave
        }
        (Some(a), _) => match a.clock_in_status {
            ClockInStatus::OnTime => DailyStatus::Present,
            ClockInStatus::Late => DailyStatus::Late,
        },
        (None, Some(_)) => DailyStatus::OnLeave,
        (None, None) => DailyStatus::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{leave_request::LeaveCategory, work_unit::GeoPoint};
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn leave(start: NaiveDate, end: NaiveDate, status: LeaveStatus) -> LeaveRecord {
        LeaveRecord {
            id: 1,
            employee_id: 10,
            start_date: start,
            end_date: end,
            category: LeaveCategory::Sick,
            reason: "flu".into(),
            attachment: None,
            status,
            decided_by: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn attendance(status: ClockInStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            employee_id: 10,
            date: d(2024, 1, 11),
            clock_in_at: Some(Utc.with_ymd_and_hms(2024, 1, 11, 2, 0, 0).unwrap()),
            clock_out_at: None,
            clock_in_point: Some(GeoPoint::new(0.0, 0.0)),
            clock_out_point: None,
            clock_in_distance_m: Some(0.0),
            clock_out_distance_m: None,
            clock_in_photo: None,
            clock_out_photo: None,
            clock_in_status: status,
            clock_out_status: None,
            out_of_range: false,
            geofence_unconfigured: false,
            work_unit_id: 1,
            shift_id: None,
        }
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let l = leave(d(2024, 1, 10), d(2024, 1, 12), LeaveStatus::Approved);
        assert!(!covers(&l, d(2024, 1, 9)));
        assert!(covers(&l, d(2024, 1, 10)));
        assert!(covers(&l, d(2024, 1, 11)));
        assert!(covers(&l, d(2024, 1, 12)));
        assert!(!covers(&l, d(2024, 1, 13)));
    }

    #[test]
    fn single_day_leave_matches_only_that_day() {
        let l = leave(d(2024, 2, 29), d(2024, 2, 29), LeaveStatus::Approved);
        assert!(covers(&l, d(2024, 2, 29)));
        assert!(!covers(&l, d(2024, 2, 28)));
        assert!(!covers(&l, d(2024, 3, 1)));
    }

    #[test]
    fn only_approved_leave_is_returned() {
        let leaves = vec![
            leave(d(2024, 1, 10), d(2024, 1, 12), LeaveStatus::Pending),
            leave(d(2024, 1, 10), d(2024, 1, 12), LeaveStatus::Rejected),
            LeaveRecord { id: 3, ..leave(d(2024, 1, 11), d(2024, 1, 11), LeaveStatus::Approved) },
        ];
        let hits = covering(d(2024, 1, 11), &leaves);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 3);
    }

    #[test]
    fn civil_date_follows_the_configured_offset() {
        let plus7 = FixedOffset::east_opt(7 * 3600).unwrap();
        let late_utc = Utc.with_ymd_and_hms(2024, 1, 10, 18, 30, 0).unwrap();
        assert_eq!(civil_date(late_utc, plus7), d(2024, 1, 11));
        assert_eq!(civil_date(late_utc, FixedOffset::east_opt(0).unwrap()), d(2024, 1, 10));

        let minus5 = FixedOffset::west_opt(5 * 3600).unwrap();
        let early_utc = Utc.with_ymd_and_hms(2024, 1, 10, 3, 0, 0).unwrap();
        assert_eq!(civil_date(early_utc, minus5), d(2024, 1, 9));
    }

    #[test]
    fn approved_leave_without_attendance_is_on_leave() {
        let l = leave(d(2024, 1, 10), d(2024, 1, 12), LeaveStatus::Approved);
        let hits = covering(d(2024, 1, 11), std::slice::from_ref(&l));
        let status = classify_day(None, hits.first().copied(), LeavePrecedence::default());
        assert_eq!(status, DailyStatus::OnLeave);
    }

    #[test]
    fn leave_overrides_attendance_by_default() {
        let l = leave(d(2024, 1, 10), d(2024, 1, 12), LeaveStatus::Approved);
        let a = attendance(ClockInStatus::OnTime);
        assert_eq!(
            classify_day(Some(&a), Some(&l), LeavePrecedence::default()),
            DailyStatus::OnLeave
        );
    }

    #[test]
    fn attendance_can_take_precedence() {
        let l = leave(d(2024, 1, 10), d(2024, 1, 12), LeaveStatus::Approved);
        let a = attendance(ClockInStatus::Late);
        assert_eq!(
            classify_day(Some(&a), Some(&l), LeavePrecedence::AttendanceOverridesLeave),
            DailyStatus::Late
        );
    }

    #[test]
    fn attendance_without_leave() {
        let p = LeavePrecedence::default();
        assert_eq!(classify_day(Some(&attendance(ClockInStatus::OnTime)), None, p), DailyStatus::Present);
        assert_eq!(classify_day(Some(&attendance(ClockInStatus::Late)), None, p), DailyStatus::Late);
        assert_eq!(classify_day(None, None, p), DailyStatus::Absent);
    }
}
