use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::{
    attendance::{AttendanceRecord, DailyStatus},
    leave_request::LeaveRecord,
};
use crate::rules::{leave, policy::AttendancePolicy};
use crate::store::{AttendanceStore, EmployeeScope, LeaveStore, ReferenceStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub scope: EmployeeScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportRow {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: DailyStatus,
    pub leave_id: Option<u64>,
    pub attendance: Option<AttendanceRecord>,
}

/// One row per employee in scope per civil date in `[from, min(to, today)]`.
#[instrument(name = "attendance_report", skip(store, policy))]
pub async fn attendance_report<S>(
    store: &S,
    policy: &AttendancePolicy,
    query: &ReportQuery,
    today: NaiveDate,
    max_days: u32,
) -> Result<Vec<ReportRow>, AppError>
where
    S: ReferenceStore + AttendanceStore + LeaveStore,
{
    if query.from > query.to {
        return Err(AppError::validation("from cannot be after to"));
    }
    let span = (query.to - query.from).num_days() + 1;
    if span > i64::from(max_days) {
        return Err(AppError::validation(format!(
            "report range is limited to {max_days} days"
        )));
    }

    // Days that have not happened yet cannot be absent.
    let to = query.to.min(today);
    if query.from > to {
        return Ok(Vec::new());
    }

    let employees = store.employees_in_scope(&query.scope).await?;
    let attendance = store.attendance_between(query.from, to, &query.scope).await?;
    let leaves = store.approved_leaves_between(query.from, to, &query.scope).await?;
    debug!(
        employees = employees.len(),
        attendance = attendance.len(),
        leaves = leaves.len(),
        "Building attendance report"
    );

    let by_day: HashMap<(u64, NaiveDate), AttendanceRecord> = attendance
        .into_iter()
        .map(|a| ((a.employee_id, a.date), a))
        .collect();
    let mut leaves_by_employee: HashMap<u64, Vec<LeaveRecord>> = HashMap::new();
    for l in leaves {
        leaves_by_employee.entry(l.employee_id).or_default().push(l);
    }

    let mut rows = Vec::new();
    for date in query.from.iter_days().take_while(|d| *d <= to) {
        for employee in &employees {
            let record = by_day.get(&(employee.id, date));
            let own_leaves = leaves_by_employee
                .get(&employee.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let covering = leave::covering(date, own_leaves).into_iter().next();

            rows.push(ReportRow {
                employee_id: employee.id,
                date,
                status: leave::classify_day(record, covering, policy.leave_precedence),
                leave_id: covering.map(|l| l.id),
                attendance: record.cloned(),
            });
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        attendance::ClockEvent,
        employee::Employee,
        leave_request::{LeaveCategory, LeaveDecision},
        work_unit::{GeoPoint, WorkUnit},
    };
    use crate::rules::policy::LeavePrecedence;
    use crate::service::{
        attendance::check_in,
        leave::{LeaveApplication, decide, submit},
    };
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn employee(id: u64, unit: u64) -> Employee {
        Employee {
            id,
            employee_code: format!("EMP-{id}"),
            first_name: "Budi".into(),
            last_name: "Santoso".into(),
            email: format!("e{id}@example.com"),
            phone: None,
            work_unit_id: Some(unit),
            shift_id: None,
            hire_date: d(1),
            status: "active".into(),
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        store.with_state(|s| {
            for unit in [1, 2] {
                s.units.insert(
                    unit,
                    WorkUnit {
                        id: unit,
                        name: format!("unit-{unit}"),
                        latitude: Some(0.0),
                        longitude: Some(0.0),
                        radius_m: 100.0,
                    },
                );
            }
            s.employees.insert(1, employee(1, 1));
            s.employees.insert(2, employee(2, 1));
            s.employees.insert(3, employee(3, 2));
        });
        store
    }

    async fn approved_leave(store: &MemoryStore, employee_id: u64, start: u32, end: u32) -> u64 {
        let leave = submit(
            store,
            employee_id,
            LeaveApplication {
                start_date: d(start),
                end_date: d(end),
                category: LeaveCategory::Sick,
                reason: "flu".into(),
                attachment: None,
            },
        )
        .await
        .unwrap();
        decide(store, leave.id, LeaveDecision::Approve, 100).await.unwrap();
        leave.id
    }

    async fn clock_in(store: &MemoryStore, employee_id: u64, day: u32, hour_local: u32) {
        let at = Utc.with_ymd_and_hms(2024, 1, day, hour_local - 7, 0, 0).unwrap();
        let event = ClockEvent {
            point: GeoPoint::new(0.0, 0.0),
            photo: None,
            at,
        };
        check_in(store, &AttendancePolicy::default(), employee_id, event)
            .await
            .unwrap();
    }

    fn query(from: u32, to: u32, scope: EmployeeScope) -> ReportQuery {
        ReportQuery {
            from: d(from),
            to: d(to),
            scope,
        }
    }

    fn status_of(rows: &[ReportRow], employee_id: u64, day: u32) -> DailyStatus {
        rows.iter()
            .find(|r| r.employee_id == employee_id && r.date == d(day))
            .map(|r| r.status)
            .unwrap()
    }

    #[actix_web::test]
    async fn approved_leave_replaces_absent() {
        let store = store();
        let leave_id = approved_leave(&store, 1, 10, 12).await;

        let scope = EmployeeScope { employee_id: Some(1), work_unit_id: None };
        let rows = attendance_report(&store, &AttendancePolicy::default(), &query(11, 11, scope), d(31), 62)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DailyStatus::OnLeave);
        assert_eq!(rows[0].leave_id, Some(leave_id));
    }

    #[actix_web::test]
    async fn leave_overrides_attendance_on_same_day() {
        let store = store();
        approved_leave(&store, 1, 10, 12).await;
        clock_in(&store, 1, 11, 9).await;

        let rows = attendance_report(
            &store,
            &AttendancePolicy::default(),
            &query(11, 11, EmployeeScope::default()),
            d(31),
            62,
        )
        .await
        .unwrap();
        assert_eq!(status_of(&rows, 1, 11), DailyStatus::OnLeave);

        let policy = AttendancePolicy {
            leave_precedence: LeavePrecedence::AttendanceOverridesLeave,
            ..AttendancePolicy::default()
        };
        let rows = attendance_report(&store, &policy, &query(11, 11, EmployeeScope::default()), d(31), 62)
            .await
            .unwrap();
        assert_eq!(status_of(&rows, 1, 11), DailyStatus::Present);
    }

    #[actix_web::test]
    async fn every_employee_and_day_gets_a_row() {
        let store = store();
        approved_leave(&store, 2, 9, 9).await;
        clock_in(&store, 1, 10, 10).await;

        let rows = attendance_report(
            &store,
            &AttendancePolicy::default(),
            &query(9, 11, EmployeeScope::default()),
            d(31),
            62,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 9);
        assert_eq!(status_of(&rows, 1, 9), DailyStatus::Absent);
        assert_eq!(status_of(&rows, 1, 10), DailyStatus::Late);
        assert_eq!(status_of(&rows, 2, 9), DailyStatus::OnLeave);
        assert_eq!(status_of(&rows, 2, 10), DailyStatus::Absent);
        assert_eq!(status_of(&rows, 3, 11), DailyStatus::Absent);
    }

    #[actix_web::test]
    async fn pending_leave_does_not_excuse_absence() {
        let store = store();
        submit(
            &store,
            1,
            LeaveApplication {
                start_date: d(10),
                end_date: d(12),
                category: LeaveCategory::Other,
                reason: "errand".into(),
                attachment: None,
            },
        )
        .await
        .unwrap();

        let scope = EmployeeScope { employee_id: Some(1), work_unit_id: None };
        let rows = attendance_report(&store, &AttendancePolicy::default(), &query(10, 12, scope), d(31), 62)
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.status == DailyStatus::Absent));
    }

    #[actix_web::test]
    async fn scope_by_work_unit() {
        let store = store();
        let scope = EmployeeScope { employee_id: None, work_unit_id: Some(2) };
        let rows = attendance_report(&store, &AttendancePolicy::default(), &query(10, 10, scope), d(31), 62)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_id, 3);
    }

    #[actix_web::test]
    async fn future_days_are_cut_at_today() {
        let store = store();
        let rows = attendance_report(
            &store,
            &AttendancePolicy::default(),
            &query(10, 20, EmployeeScope::default()),
            d(11),
            62,
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.date <= d(11)));
    }

    #[actix_web::test]
    async fn invalid_ranges_are_rejected() {
        let store = store();
        let policy = AttendancePolicy::default();

        let inverted = attendance_report(&store, &policy, &query(12, 10, EmployeeScope::default()), d(31), 62).await;
        assert!(matches!(inverted, Err(AppError::Validation(_))));

        let too_long = attendance_report(&store, &policy, &query(1, 31, EmployeeScope::default()), d(31), 7).await;
        assert!(matches!(too_long, Err(AppError::Validation(_))));
    }
}
