//! In-memory store for workflow tests. Mirrors the SQL store's contracts:
//! unique (employee, date) attendance, compare-and-set leave decisions and
//! all-or-nothing employee deletion.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    attendance::{AttendanceRecord, CheckOutUpdate, NewAttendance},
    employee::Employee,
    leave_request::{LeaveRecord, LeaveStatus, NewLeave},
    shift::ShiftDefinition,
    work_unit::WorkUnit,
};
use crate::store::{
    AttendanceStore, DeletionSummary, EmployeeScope, EmployeeStore, LeaveQuery, LeaveStore, Page,
    ReferenceStore, StoreError, StoreResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    Attendance,
    LeaveRequests,
    Users,
    Employee,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub employees: BTreeMap<u64, Employee>,
    pub units: BTreeMap<u64, WorkUnit>,
    pub shifts: BTreeMap<u64, ShiftDefinition>,
    pub attendance: Vec<AttendanceRecord>,
    pub leaves: Vec<LeaveRecord>,
    /// (user id, linked employee id)
    pub users: Vec<(u64, Option<u64>)>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_at: Mutex<Option<DeleteStep>>,
    /// A decision (status, user) that lands just before the next status write.
    competing_decision: Mutex<Option<(LeaveStatus, u64)>>,
    now: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            fail_at: Mutex::new(None),
            competing_decision: Mutex::new(None),
            now,
        }
    }

    /// Makes the next cascade delete fail when it reaches `step`.
    pub fn fail_deletion_at(&self, step: DeleteStep) {
        *self.fail_at.lock().unwrap() = Some(step);
    }

    /// Makes another decider win the race against the next `set_leave_status`.
    pub fn decide_concurrently(&self, status: LeaveStatus, decided_by: u64) {
        *self.competing_decision.lock().unwrap() = Some((status, decided_by));
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().unwrap().clone()
    }
}

fn in_scope(state: &MemoryState, scope: &EmployeeScope, employee_id: u64) -> bool {
    scope.employee_id.is_none_or(|id| id == employee_id)
        && scope.work_unit_id.is_none_or(|unit| {
            state
                .employees
                .get(&employee_id)
                .is_some_and(|e| e.work_unit_id == Some(unit))
        })
}

impl ReferenceStore for MemoryStore {
    async fn employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        Ok(self.state.lock().unwrap().employees.get(&id).cloned())
    }

    async fn work_unit(&self, id: u64) -> StoreResult<Option<WorkUnit>> {
        Ok(self.state.lock().unwrap().units.get(&id).cloned())
    }

    async fn shift(&self, id: u64) -> StoreResult<Option<ShiftDefinition>> {
        Ok(self.state.lock().unwrap().shifts.get(&id).cloned())
    }

    async fn default_shift(&self, work_unit_id: u64) -> StoreResult<Option<ShiftDefinition>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .shifts
            .values()
            .find(|s| s.work_unit_id == work_unit_id && s.is_default && s.is_active)
            .cloned())
    }

    async fn employees_in_scope(&self, scope: &EmployeeScope) -> StoreResult<Vec<Employee>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .employees
            .values()
            .filter(|e| e.is_active() && in_scope(&state, scope, e.id))
            .cloned()
            .collect())
    }
}

impl AttendanceStore for MemoryStore {
    async fn attendance_on(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .find(|a| a.employee_id == employee_id && a.date == date)
            .cloned())
    }

    async fn insert_attendance(&self, record: NewAttendance) -> StoreResult<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();
        if state
            .attendance
            .iter()
            .any(|a| a.employee_id == record.employee_id && a.date == record.date)
        {
            return Err(StoreError::Duplicate("attendance"));
        }
        let id = state.next_id();
        let record = record.into_record(id);
        state.attendance.push(record.clone());
        Ok(record)
    }

    async fn record_check_out(&self, attendance_id: u64, update: CheckOutUpdate) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .attendance
            .iter_mut()
            .find(|a| a.id == attendance_id && a.clock_out_at.is_none())
        {
            Some(record) => {
                update.apply_to(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn attendance_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: &EmployeeScope,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .filter(|a| from <= a.date && a.date <= to && in_scope(&state, scope, a.employee_id))
            .cloned()
            .collect())
    }
}

impl LeaveStore for MemoryStore {
    async fn insert_leave(&self, leave: NewLeave) -> StoreResult<LeaveRecord> {
        let mut state = self.state.lock().unwrap();
        let record = LeaveRecord {
            id: state.next_id(),
            employee_id: leave.employee_id,
            start_date: leave.start_date,
            end_date: leave.end_date,
            category: leave.category,
            reason: leave.reason,
            attachment: leave.attachment,
            status: LeaveStatus::Pending,
            decided_by: None,
            created_at: self.now,
        };
        state.leaves.push(record.clone());
        Ok(record)
    }

    async fn leave(&self, id: u64) -> StoreResult<Option<LeaveRecord>> {
        Ok(self.state.lock().unwrap().leaves.iter().find(|l| l.id == id).cloned())
    }

    async fn set_leave_status(
        &self,
        id: u64,
        from: LeaveStatus,
        to: LeaveStatus,
        decided_by: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        if let Some((status, user)) = self.competing_decision.lock().unwrap().take() {
            if let Some(leave) = state.leaves.iter_mut().find(|l| l.id == id) {
                leave.status = status;
                leave.decided_by = Some(user);
            }
        }
        match state.leaves.iter_mut().find(|l| l.id == id && l.status == from) {
            Some(leave) => {
                leave.status = to;
                leave.decided_by = Some(decided_by);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn approved_leaves_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: &EmployeeScope,
    ) -> StoreResult<Vec<LeaveRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .leaves
            .iter()
            .filter(|l| {
                l.status == LeaveStatus::Approved
                    && l.start_date <= to
                    && l.end_date >= from
                    && in_scope(&state, scope, l.employee_id)
            })
            .cloned()
            .collect())
    }

    async fn list_leaves(&self, query: &LeaveQuery) -> StoreResult<Page<LeaveRecord>> {
        let state = self.state.lock().unwrap();
        let mut matching: Vec<LeaveRecord> = state
            .leaves
            .iter()
            .filter(|l| query.employee_id.is_none_or(|id| l.employee_id == id))
            .filter(|l| query.status.is_none_or(|s| l.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.per_page as usize)
            .collect();
        Ok(Page { items, total })
    }
}

impl EmployeeStore for MemoryStore {
    async fn delete_employee_cascade(&self, employee_id: u64) -> StoreResult<Option<DeletionSummary>> {
        let fail_at = self.fail_at.lock().unwrap().take();
        let fail = |step: DeleteStep| -> StoreResult<()> {
            if fail_at == Some(step) {
                Err(StoreError::Database(sqlx::Error::Protocol(format!(
                    "injected failure at {step:?}"
                ))))
            } else {
                Ok(())
            }
        };

        let mut state = self.state.lock().unwrap();
        // Work on a copy and swap it in only when every step succeeded.
        let mut work = state.clone();

        fail(DeleteStep::Attendance)?;
        let before = work.attendance.len();
        work.attendance.retain(|a| a.employee_id != employee_id);
        let attendance = (before - work.attendance.len()) as u64;

        fail(DeleteStep::LeaveRequests)?;
        let before = work.leaves.len();
        work.leaves.retain(|l| l.employee_id != employee_id);
        let leave_requests = (before - work.leaves.len()) as u64;

        fail(DeleteStep::Users)?;
        let before = work.users.len();
        work.users.retain(|(_, linked)| *linked != Some(employee_id));
        let users = (before - work.users.len()) as u64;

        fail(DeleteStep::Employee)?;
        if work.employees.remove(&employee_id).is_none() {
            return Ok(None);
        }

        *state = work;
        Ok(Some(DeletionSummary {
            attendance,
            leave_requests,
            users,
        }))
    }
}
