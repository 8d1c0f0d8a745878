//! Persistence seams for the attendance workflows.
//!
//! Workflows are generic over these traits; [`mysql::MySqlStore`] is the
//! production implementation.

use std::future::Future;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{
    attendance::{AttendanceRecord, CheckOutUpdate, NewAttendance},
    employee::Employee,
    leave_request::{LeaveRecord, LeaveStatus, NewLeave},
    shift::ShiftDefinition,
    work_unit::WorkUnit,
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which employees a report covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeScope {
    pub employee_id: Option<u64>,
    pub work_unit_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveQuery {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub page: u64,
    pub per_page: u64,
}

impl LeaveQuery {
    /// Rows to skip for `page`. Saturates instead of wrapping on huge pages.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Rows removed by a completed employee deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeletionSummary {
    pub attendance: u64,
    pub leave_requests: u64,
    pub users: u64,
}

pub trait ReferenceStore: Send + Sync {
    fn employee(&self, id: u64) -> impl Future<Output = StoreResult<Option<Employee>>> + Send;
    fn work_unit(&self, id: u64) -> impl Future<Output = StoreResult<Option<WorkUnit>>> + Send;
    fn shift(&self, id: u64) -> impl Future<Output = StoreResult<Option<ShiftDefinition>>> + Send;
    /// The active default shift of a work unit, if one is marked.
    fn default_shift(
        &self,
        work_unit_id: u64,
    ) -> impl Future<Output = StoreResult<Option<ShiftDefinition>>> + Send;
    fn employees_in_scope(
        &self,
        scope: &EmployeeScope,
    ) -> impl Future<Output = StoreResult<Vec<Employee>>> + Send;
}

pub trait AttendanceStore: Send + Sync {
    fn attendance_on(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> impl Future<Output = StoreResult<Option<AttendanceRecord>>> + Send;
    /// Fails with [`StoreError::Duplicate`] when the (employee, date) pair exists.
    fn insert_attendance(
        &self,
        record: NewAttendance,
    ) -> impl Future<Output = StoreResult<AttendanceRecord>> + Send;
    /// Returns `false` when the record is missing or already checked out.
    fn record_check_out(
        &self,
        attendance_id: u64,
        update: CheckOutUpdate,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
    fn attendance_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: &EmployeeScope,
    ) -> impl Future<Output = StoreResult<Vec<AttendanceRecord>>> + Send;
}

pub trait LeaveStore: Send + Sync {
    fn insert_leave(&self, leave: NewLeave) -> impl Future<Output = StoreResult<LeaveRecord>> + Send;
    fn leave(&self, id: u64) -> impl Future<Output = StoreResult<Option<LeaveRecord>>> + Send;
    /// Compare-and-set on the status column; `false` when `from` no longer holds.
    fn set_leave_status(
        &self,
        id: u64,
        from: LeaveStatus,
        to: LeaveStatus,
        decided_by: u64,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
    /// Approved leave intersecting `[from, to]`.
    fn approved_leaves_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: &EmployeeScope,
    ) -> impl Future<Output = StoreResult<Vec<LeaveRecord>>> + Send;
    fn list_leaves(
        &self,
        query: &LeaveQuery,
    ) -> impl Future<Output = StoreResult<Page<LeaveRecord>>> + Send;
}

pub trait EmployeeStore: Send + Sync {
    /// Removes the employee with all dependent rows in one unit of work.
    /// `Ok(None)` means the employee did not exist and nothing was removed.
    fn delete_employee_cascade(
        &self,
        employee_id: u64,
    ) -> impl Future<Output = StoreResult<Option<DeletionSummary>>> + Send;
}
