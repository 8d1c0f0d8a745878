use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        attendance::ClockEvent,
        work_unit::GeoPoint,
    },
    rules::leave::civil_date,
    service::{
        attendance::{self as workflow, ClockOutcome},
        report::{self, ReportQuery},
    },
    store::{AttendanceStore, EmployeeScope, mysql::MySqlStore},
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ClockRequest {
    #[schema(example = -6.2)]
    pub latitude: f64,
    #[schema(example = 106.816666)]
    pub longitude: f64,
    /// Reference to an uploaded selfie; stored as given
    #[schema(example = "uploads/selfie/2026-01-05-1000.jpg")]
    pub photo: Option<String>,
}

impl ClockRequest {
    fn into_event(self) -> Result<ClockEvent, AppError> {
        let point = GeoPoint::new(self.latitude, self.longitude);
        if !point.is_valid() {
            return Err(AppError::validation(
                "latitude must be within [-90, 90] and longitude within [-180, 180]",
            ));
        }
        Ok(ClockEvent {
            point,
            photo: self.photo.filter(|p| !p.trim().is_empty()),
            at: Utc::now(),
        })
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReportFilter {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    /// First civil date, inclusive
    pub from: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    /// Last civil date, inclusive
    pub to: NaiveDate,
    /// Restrict to one employee
    pub employee_id: Option<u64>,
    /// Restrict to one work unit
    pub work_unit_id: Option<u64>,
}

fn respond(outcome: ClockOutcome) -> HttpResponse {
    match outcome {
        ClockOutcome::Recorded { record } => HttpResponse::Ok().json(record),
        ClockOutcome::Rejected {
            distance_m,
            radius_m,
        } => HttpResponse::BadRequest().json(json!({
            "message": "Outside the work unit radius",
            "distance_m": distance_m,
            "radius_m": radius_m
        })),
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Checked in", body = crate::model::attendance::AttendanceRecord),
        (status = 400, description = "Invalid coordinates or outside the work unit radius", body = Object, example = json!({
            "message": "Outside the work unit radius",
            "distance_m": 250.0,
            "radius_m": 100.0
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "already checked in on 2026-01-05"
        })),
        (status = 422, description = "Work unit or shift is not configured"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
    payload: web::Json<ClockRequest>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.employee_id()?;
    let event = payload.into_inner().into_event()?;

    let outcome = workflow::check_in(store.get_ref(), &config.policy, employee_id, event).await?;
    Ok(respond(outcome))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Checked out", body = crate::model::attendance::AttendanceRecord),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "no active check-in found for 2026-01-05"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Work unit is not configured"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
    payload: web::Json<ClockRequest>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.employee_id()?;
    let event = payload.into_inner().into_event()?;

    let outcome = workflow::check_out(store.get_ref(), &config.policy, employee_id, event).await?;
    Ok(respond(outcome))
}

/// Today's attendance record of the caller
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    responses(
        (status = 200, description = "Attendance recorded today", body = crate::model::attendance::AttendanceRecord),
        (status = 404, description = "Not checked in today", body = Object, example = json!({
            "message": "attendance record not found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.employee_id()?;
    let date = civil_date(Utc::now(), config.policy.timezone);

    let record = store
        .attendance_on(employee_id, date)
        .await?
        .ok_or(AppError::NotFound("attendance record"))?;

    Ok(HttpResponse::Ok().json(record))
}

/// Daily attendance report; employees only ever see their own rows
#[utoipa::path(
    get,
    path = "/api/v1/attendance/report",
    params(ReportFilter),
    responses(
        (status = 200, description = "One row per employee per day", body = [crate::service::report::ReportRow]),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_report(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
    filter: web::Query<ReportFilter>,
) -> Result<HttpResponse, AppError> {
    let filter = filter.into_inner();

    let scope = if auth.role.is_manager() {
        EmployeeScope {
            employee_id: filter.employee_id,
            work_unit_id: filter.work_unit_id,
        }
    } else {
        let own = auth.employee_id()?;
        if filter.employee_id.is_some_and(|id| id != own) {
            return Err(AppError::Forbidden("Not allowed for this employee"));
        }
        EmployeeScope {
            employee_id: Some(own),
            work_unit_id: None,
        }
    };

    let query = ReportQuery {
        from: filter.from,
        to: filter.to,
        scope,
    };
    let today = civil_date(Utc::now(), config.policy.timezone);

    let rows = report::attendance_report(
        store.get_ref(),
        &config.policy,
        &query,
        today,
        config.report_max_days,
    )
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}
