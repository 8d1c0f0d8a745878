use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::model::{
    attendance::{AttendanceRecord, AttendanceRow, CheckOutUpdate, NewAttendance},
    employee::Employee,
    leave_request::{LeaveRecord, LeaveRow, LeaveStatus, NewLeave},
    shift::ShiftDefinition,
    work_unit::WorkUnit,
};
use crate::store::{
    AttendanceStore, DeletionSummary, EmployeeScope, EmployeeStore, LeaveQuery, LeaveStore, Page,
    ReferenceStore, StoreError, StoreResult,
};

const REFERENCE_CACHE_CAPACITY: u64 = 10_000;

pub const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, \
     work_unit_id, shift_id, hire_date, status";

pub const WORK_UNIT_COLUMNS: &str = "id, name, latitude, longitude, radius_m";

pub const SHIFT_COLUMNS: &str =
    "id, work_unit_id, name, start_time, end_time, grace_minutes, is_default, is_active";

const ATTENDANCE_COLUMNS: &str = "id, employee_id, date, clock_in_at, clock_out_at, \
     clock_in_lat, clock_in_lng, clock_out_lat, clock_out_lng, \
     clock_in_distance_m, clock_out_distance_m, clock_in_photo, clock_out_photo, \
     clock_in_status, clock_out_status, out_of_range, geofence_unconfigured, \
     work_unit_id, shift_id";

const LEAVE_COLUMNS: &str =
    "id, employee_id, start_date, end_date, category, reason, attachment, status, decided_by, created_at";

/// MySQL-backed store. Work units and shifts are read through an in-process
/// cache; admin handlers must call the `forget_*` methods after writes.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    units: Cache<u64, WorkUnit>,
    shifts: Cache<u64, ShiftDefinition>,
}

// Helper enum for typed SQLx binding
pub(crate) enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

pub(crate) fn is_duplicate(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

fn corrupt(table: &'static str) -> impl Fn(strum::ParseError) -> StoreError {
    move |e| StoreError::Corrupt {
        table,
        reason: e.to_string(),
    }
}

fn scope_clause(scope: &EmployeeScope, employee_column: &str, args: &mut Vec<FilterValue<'_>>) -> String {
    let mut sql = String::new();
    if let Some(employee_id) = scope.employee_id {
        sql.push_str(&format!(" AND {employee_column} = ?"));
        args.push(FilterValue::U64(employee_id));
    }
    if let Some(unit_id) = scope.work_unit_id {
        sql.push_str(&format!(
            " AND {employee_column} IN (SELECT id FROM employees WHERE work_unit_id = ?)"
        ));
        args.push(FilterValue::U64(unit_id));
    }
    sql
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, cache_ttl: Duration) -> Self {
        let units = Cache::builder()
            .max_capacity(REFERENCE_CACHE_CAPACITY)
            .time_to_live(cache_ttl)
            .build();
        let shifts = Cache::builder()
            .max_capacity(REFERENCE_CACHE_CAPACITY)
            .time_to_live(cache_ttl)
            .build();

        Self {
            pool,
            units,
            shifts,
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub async fn forget_work_unit(&self, id: u64) {
        self.units.invalidate(&id).await;
    }

    pub async fn forget_shift(&self, id: u64) {
        self.shifts.invalidate(&id).await;
    }

    /// Loads every work unit and active shift into the reference cache.
    pub async fn warmup_reference_cache(&self) -> Result<()> {
        let sql = format!("SELECT {WORK_UNIT_COLUMNS} FROM work_units");
        let mut units = sqlx::query_as::<_, WorkUnit>(&sql).fetch(&self.pool);
        let mut unit_count = 0usize;
        while let Some(row) = units.next().await {
            let unit = row?;
            self.units.insert(unit.id, unit).await;
            unit_count += 1;
        }

        let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE is_active = 1");
        let mut shifts = sqlx::query_as::<_, ShiftDefinition>(&sql).fetch(&self.pool);
        let mut shift_count = 0usize;
        while let Some(row) = shifts.next().await {
            let shift = row?;
            self.shifts.insert(shift.id, shift).await;
            shift_count += 1;
        }

        tracing::info!(
            work_units = unit_count,
            shifts = shift_count,
            "Reference cache warmup complete"
        );
        Ok(())
    }

    async fn fetch_leave(&self, id: u64) -> StoreResult<Option<LeaveRecord>> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LeaveRecord::try_from)
            .transpose()
            .map_err(corrupt("leave_requests"))
    }
}

impl ReferenceStore for MySqlStore {
    async fn employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn work_unit(&self, id: u64) -> StoreResult<Option<WorkUnit>> {
        if let Some(unit) = self.units.get(&id).await {
            return Ok(Some(unit));
        }

        let sql = format!("SELECT {WORK_UNIT_COLUMNS} FROM work_units WHERE id = ?");
        let unit = sqlx::query_as::<_, WorkUnit>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(unit) = &unit {
            self.units.insert(id, unit.clone()).await;
        }
        Ok(unit)
    }

    async fn shift(&self, id: u64) -> StoreResult<Option<ShiftDefinition>> {
        if let Some(shift) = self.shifts.get(&id).await {
            return Ok(Some(shift));
        }

        let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?");
        let shift = sqlx::query_as::<_, ShiftDefinition>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(shift) = &shift {
            self.shifts.insert(id, shift.clone()).await;
        }
        Ok(shift)
    }

    async fn default_shift(&self, work_unit_id: u64) -> StoreResult<Option<ShiftDefinition>> {
        let sql = format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts \
             WHERE work_unit_id = ? AND is_default = 1 AND is_active = 1 \
             ORDER BY id LIMIT 1"
        );
        Ok(sqlx::query_as::<_, ShiftDefinition>(&sql)
            .bind(work_unit_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn employees_in_scope(&self, scope: &EmployeeScope) -> StoreResult<Vec<Employee>> {
        let mut where_sql = String::from(" WHERE status = 'active'");
        let mut args: Vec<u64> = Vec::new();

        if let Some(employee_id) = scope.employee_id {
            where_sql.push_str(" AND id = ?");
            args.push(employee_id);
        }
        if let Some(unit_id) = scope.work_unit_id {
            where_sql.push_str(" AND work_unit_id = ?");
            args.push(unit_id);
        }

        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees{where_sql} ORDER BY id");
        let mut q = sqlx::query_as::<_, Employee>(&sql);
        for arg in args {
            q = q.bind(arg);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }
}

impl AttendanceStore for MySqlStore {
    async fn attendance_on(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AttendanceRecord::try_from)
            .transpose()
            .map_err(corrupt("attendance"))
    }

    async fn insert_attendance(&self, record: NewAttendance) -> StoreResult<AttendanceRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, clock_in_at, clock_in_lat, clock_in_lng,
                 clock_in_distance_m, clock_in_photo, clock_in_status,
                 out_of_range, geofence_unconfigured, work_unit_id, shift_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.clock_in_at)
        .bind(record.clock_in_point.latitude)
        .bind(record.clock_in_point.longitude)
        .bind(record.clock_in_distance_m)
        .bind(record.clock_in_photo.as_deref())
        .bind(record.clock_in_status.as_ref())
        .bind(record.out_of_range)
        .bind(record.geofence_unconfigured)
        .bind(record.work_unit_id)
        .bind(record.shift_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(record.into_record(done.last_insert_id())),
            Err(e) if is_duplicate(&e) => Err(StoreError::Duplicate("attendance")),
            Err(e) => Err(e.into()),
        }
    }

    async fn record_check_out(&self, attendance_id: u64, update: CheckOutUpdate) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET clock_out_at = ?,
                clock_out_lat = ?,
                clock_out_lng = ?,
                clock_out_distance_m = ?,
                clock_out_photo = ?,
                clock_out_status = ?,
                out_of_range = out_of_range OR ?,
                geofence_unconfigured = geofence_unconfigured OR ?
            WHERE id = ?
            AND clock_out_at IS NULL
            "#,
        )
        .bind(update.clock_out_at)
        .bind(update.clock_out_point.latitude)
        .bind(update.clock_out_point.longitude)
        .bind(update.clock_out_distance_m)
        .bind(update.clock_out_photo.as_deref())
        .bind(update.clock_out_status.as_ref())
        .bind(update.out_of_range)
        .bind(update.geofence_unconfigured)
        .bind(attendance_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn attendance_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: &EmployeeScope,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let mut args = Vec::new();
        let scope_sql = scope_clause(scope, "employee_id", &mut args);
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE date BETWEEN ? AND ?{scope_sql} ORDER BY date, employee_id"
        );

        let mut q = sqlx::query_as::<_, AttendanceRow>(&sql).bind(from).bind(to);
        for arg in args {
            q = match arg {
                FilterValue::U64(v) => q.bind(v),
                FilterValue::Str(s) => q.bind(s),
            };
        }

        q.fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| AttendanceRecord::try_from(row).map_err(corrupt("attendance")))
            .collect()
    }
}

impl LeaveStore for MySqlStore {
    async fn insert_leave(&self, leave: NewLeave) -> StoreResult<LeaveRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, start_date, end_date, category, reason, attachment, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', UTC_TIMESTAMP())
            "#,
        )
        .bind(leave.employee_id)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(leave.category.as_ref())
        .bind(&leave.reason)
        .bind(leave.attachment.as_deref())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        self.fetch_leave(id).await?.ok_or_else(|| StoreError::Corrupt {
            table: "leave_requests",
            reason: format!("row {id} vanished after insert"),
        })
    }

    async fn leave(&self, id: u64) -> StoreResult<Option<LeaveRecord>> {
        self.fetch_leave(id).await
    }

    async fn set_leave_status(
        &self,
        id: u64,
        from: LeaveStatus,
        to: LeaveStatus,
        decided_by: u64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, decided_by = ?, decided_at = UTC_TIMESTAMP()
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(to.as_ref())
        .bind(decided_by)
        .bind(id)
        .bind(from.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn approved_leaves_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: &EmployeeScope,
    ) -> StoreResult<Vec<LeaveRecord>> {
        let mut args = Vec::new();
        let scope_sql = scope_clause(scope, "employee_id", &mut args);
        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests \
             WHERE status = 'approved' AND start_date <= ? AND end_date >= ?{scope_sql} \
             ORDER BY start_date, id"
        );

        let mut q = sqlx::query_as::<_, LeaveRow>(&sql).bind(to).bind(from);
        for arg in args {
            q = match arg {
                FilterValue::U64(v) => q.bind(v),
                FilterValue::Str(s) => q.bind(s),
            };
        }

        q.fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| LeaveRecord::try_from(row).map_err(corrupt("leave_requests")))
            .collect()
    }

    async fn list_leaves(&self, query: &LeaveQuery) -> StoreResult<Page<LeaveRecord>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(emp_id) = query.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(emp_id));
        }

        if let Some(status) = &query.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.as_ref()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            where_sql
        );
        let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        let offset = query.offset();
        let items = data_q
            .bind(query.per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| LeaveRecord::try_from(row).map_err(corrupt("leave_requests")))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page { items, total })
    }
}

impl EmployeeStore for MySqlStore {
    async fn delete_employee_cascade(&self, employee_id: u64) -> StoreResult<Option<DeletionSummary>> {
        // Dropping `tx` on any early return rolls every prior delete back.
        let mut tx = self.pool.begin().await?;

        let attendance = sqlx::query("DELETE FROM attendance WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let leave_requests = sqlx::query("DELETE FROM leave_requests WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            r#"
            DELETE rt FROM refresh_tokens rt
            JOIN users u ON rt.user_id = u.id
            WHERE u.employee_id = ?
            "#,
        )
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

        let users = sqlx::query("DELETE FROM users WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let employees = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if employees == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(DeletionSummary {
            attendance,
            leave_requests,
            users,
        }))
    }
}
