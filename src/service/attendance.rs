use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{AppError, ConfigurationError};
use crate::model::{
    attendance::{AttendanceRecord, CheckOutUpdate, ClockEvent, NewAttendance},
    employee::Employee,
    work_unit::{GeoPoint, WorkUnit},
};
use crate::rules::{
    geofence::{self, GeofenceFix},
    lateness::{self, ShiftSchedule},
    leave::civil_date,
    policy::{AttendancePolicy, MissingShiftPolicy, OutOfRangePolicy, UnconfiguredUnitPolicy},
};
use crate::store::{AttendanceStore, ReferenceStore, StoreError};

/// Result of a clock event that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClockOutcome {
    Recorded { record: AttendanceRecord },
    /// Outside the unit's radius under the blocking policy; nothing was stored.
    Rejected { distance_m: f64, radius_m: f64 },
}

/// Geofence verdict for one clock event after policies were applied.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Accepted {
        distance_m: Option<f64>,
        out_of_range: bool,
        unconfigured: bool,
    },
    Blocked(GeofenceFix),
}

fn place(point: GeoPoint, unit: &WorkUnit, policy: &AttendancePolicy) -> Result<Placement, AppError> {
    match geofence::evaluate(point, unit) {
        Ok(fix) if fix.within_range => Ok(Placement::Accepted {
            distance_m: Some(fix.distance_m),
            out_of_range: false,
            unconfigured: false,
        }),
        Ok(fix) => match policy.out_of_range {
            OutOfRangePolicy::Block => Ok(Placement::Blocked(fix)),
            OutOfRangePolicy::Flag => Ok(Placement::Accepted {
                distance_m: Some(fix.distance_m),
                out_of_range: true,
                unconfigured: false,
            }),
        },
        Err(e) => match policy.unconfigured_unit {
            UnconfiguredUnitPolicy::Block => Err(ConfigurationError::from(e).into()),
            UnconfiguredUnitPolicy::AllowWithWarning => {
                warn!(unit_id = unit.id, "Clock event accepted without geofence");
                Ok(Placement::Accepted {
                    distance_m: None,
                    out_of_range: false,
                    unconfigured: true,
                })
            }
        },
    }
}

async fn assigned_unit<S: ReferenceStore>(store: &S, employee: &Employee) -> Result<WorkUnit, AppError> {
    let unit_id = employee
        .work_unit_id
        .ok_or(ConfigurationError::NoWorkUnit {
            employee_id: employee.id,
        })?;

    store
        .work_unit(unit_id)
        .await?
        .ok_or(AppError::NotFound("work unit"))
}

/// Assigned active shift, then the unit's default, then the policy fallback.
pub async fn resolve_shift<S: ReferenceStore>(
    store: &S,
    employee: &Employee,
    unit_id: u64,
    policy: &AttendancePolicy,
) -> Result<(Option<u64>, ShiftSchedule), AppError> {
    if let Some(shift_id) = employee.shift_id {
        match store.shift(shift_id).await? {
            Some(shift) if shift.is_active => {
                return Ok((Some(shift.id), ShiftSchedule::from(&shift)));
            }
            _ => warn!(employee_id = employee.id, shift_id, "Assigned shift missing or inactive"),
        }
    }

    if let Some(shift) = store.default_shift(unit_id).await? {
        return Ok((Some(shift.id), ShiftSchedule::from(&shift)));
    }

    match policy.missing_shift {
        MissingShiftPolicy::UseFallback => Ok((None, policy.fallback_shift)),
        MissingShiftPolicy::Reject => Err(ConfigurationError::NoShift {
            employee_id: employee.id,
        }
        .into()),
    }
}

#[instrument(name = "check_in", skip(store, policy, event), fields(at = %event.at))]
pub async fn check_in<S>(
    store: &S,
    policy: &AttendancePolicy,
    employee_id: u64,
    event: ClockEvent,
) -> Result<ClockOutcome, AppError>
where
    S: ReferenceStore + AttendanceStore,
{
    let employee = store
        .employee(employee_id)
        .await?
        .ok_or(AppError::NotFound("employee"))?;
    if !employee.is_active() {
        warn!(status = %employee.status, "Check-in by inactive employee");
        return Err(AppError::Forbidden("Employee is not active"));
    }
    let unit = assigned_unit(store, &employee).await?;

    let date = civil_date(event.at, policy.timezone);
    if store.attendance_on(employee_id, date).await?.is_some() {
        return Err(AppError::AlreadyCheckedIn { date });
    }

    let (distance_m, out_of_range, unconfigured) = match place(event.point, &unit, policy)? {
        Placement::Blocked(fix) => {
            info!(distance_m = fix.distance_m, radius_m = fix.radius_m, "Check-in outside geofence");
            return Ok(ClockOutcome::Rejected {
                distance_m: fix.distance_m,
                radius_m: fix.radius_m,
            });
        }
        Placement::Accepted {
            distance_m,
            out_of_range,
            unconfigured,
        } => (distance_m, out_of_range, unconfigured),
    };

    let (shift_id, schedule) = resolve_shift(store, &employee, unit.id, policy).await?;
    let local_time = event.at.with_timezone(&policy.timezone).time();
    let status = lateness::classify_clock_in(local_time, &schedule);

    let record = store
        .insert_attendance(NewAttendance {
            employee_id,
            date,
            clock_in_at: event.at,
            clock_in_point: event.point,
            clock_in_distance_m: distance_m,
            clock_in_photo: event.photo,
            clock_in_status: status,
            out_of_range,
            geofence_unconfigured: unconfigured,
            work_unit_id: unit.id,
            shift_id,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => AppError::AlreadyCheckedIn { date },
            other => other.into(),
        })?;

    info!(attendance_id = record.id, status = %status, "Checked in");
    Ok(ClockOutcome::Recorded { record })
}

#[instrument(name = "check_out", skip(store, policy, event), fields(at = %event.at))]
pub async fn check_out<S>(
    store: &S,
    policy: &AttendancePolicy,
    employee_id: u64,
    event: ClockEvent,
) -> Result<ClockOutcome, AppError>
where
    S: ReferenceStore + AttendanceStore,
{
    let date = civil_date(event.at, policy.timezone);
    let mut record = match store.attendance_on(employee_id, date).await? {
        Some(r) if r.clock_in_at.is_some() && r.clock_out_at.is_none() => r,
        _ => return Err(AppError::NoActiveCheckIn { date }),
    };

    let unit = store
        .work_unit(record.work_unit_id)
        .await?
        .ok_or(AppError::NotFound("work unit"))?;

    let (distance_m, out_of_range, unconfigured) = match place(event.point, &unit, policy)? {
        Placement::Blocked(fix) => {
            info!(distance_m = fix.distance_m, radius_m = fix.radius_m, "Check-out outside geofence");
            return Ok(ClockOutcome::Rejected {
                distance_m: fix.distance_m,
                radius_m: fix.radius_m,
            });
        }
        Placement::Accepted {
            distance_m,
            out_of_range,
            unconfigured,
        } => (distance_m, out_of_range, unconfigured),
    };

    // Judge the check-out against the shift that was in effect at check-in.
    let schedule = match record.shift_id {
        Some(shift_id) => match store.shift(shift_id).await? {
            Some(shift) => ShiftSchedule::from(&shift),
            None => policy.fallback_shift,
        },
        None => policy.fallback_shift,
    };
    let local_time = event.at.with_timezone(&policy.timezone).time();
    let status = lateness::classify_clock_out(local_time, &schedule);

    let update = CheckOutUpdate {
        clock_out_at: event.at,
        clock_out_point: event.point,
        clock_out_distance_m: distance_m,
        clock_out_photo: event.photo,
        clock_out_status: status,
        out_of_range,
        geofence_unconfigured: unconfigured,
    };

    if !store.record_check_out(record.id, update.clone()).await? {
        return Err(AppError::NoActiveCheckIn { date });
    }
    update.apply_to(&mut record);

    info!(attendance_id = record.id, status = %status, "Checked out");
    Ok(ClockOutcome::Recorded { record })
}
