use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::leave_request::{LeaveCategory, LeaveDecision, LeaveRecord, LeaveStatus},
    service::leave::{self as workflow, LeaveApplication},
    store::{LeaveQuery, mysql::MySqlStore},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub category: LeaveCategory, // enum ensures Swagger dropdown
    #[schema(example = "Flu")]
    pub reason: String,
    /// Reference to a supporting document, e.g. a doctor's note
    pub attachment: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRecord>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID (HR/Admin only)
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status: pending, approved or rejected
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

/// Highest page a listing accepts; larger values are clamped.
pub const MAX_PAGE: u64 = 1_000_000;

impl LeaveFilter {
    fn into_query(self, auth: &AuthUser) -> Result<LeaveQuery, AppError> {
        let employee_id = if auth.role.is_manager() {
            self.employee_id
        } else {
            let own = auth.employee_id()?;
            if self.employee_id.is_some_and(|id| id != own) {
                return Err(AppError::Forbidden("Not allowed for this employee"));
            }
            Some(own)
        };

        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.to_lowercase()
                    .parse::<LeaveStatus>()
                    .map_err(|_| AppError::validation("status must be pending, approved or rejected"))
            })
            .transpose()?;

        Ok(LeaveQuery {
            employee_id,
            status,
            page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: self.per_page.unwrap_or(10).clamp(1, 100),
        })
    }
}

/// Submit a leave request for the caller
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRecord),
        (status = 400, description = "Bad request", body = Object, example = json!({
            "message": "start_date cannot be after end_date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.employee_id()?;
    let payload = payload.into_inner();

    let record = workflow::submit(
        store.get_ref(),
        employee_id,
        LeaveApplication {
            start_date: payload.start_date,
            end_date: payload.end_date,
            category: payload.category,
            reason: payload.reason,
            attachment: payload.attachment,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(record))
}

async fn decide(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    leave_id: u64,
    decision: LeaveDecision,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    info!(leave_id, ?decision, decided_by = %auth.username, "Leave decision requested");

    let record = workflow::decide(store.get_ref(), leave_id, decision, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Approve a pending leave request (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRecord),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided", body = Object, example = json!({
            "message": "leave request 1 already finalized as rejected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    decide(auth, store, path.into_inner(), LeaveDecision::Approve).await
}

/// Reject a pending leave request (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRecord),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided", body = Object, example = json!({
            "message": "leave request 1 already finalized as approved"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    decide(auth, store, path.into_inner(), LeaveDecision::Reject).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRecord),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let leave = workflow::get(store.get_ref(), path.into_inner()).await?;
    auth.require_self_or_manager(leave.employee_id)?;

    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    filter: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    let query = filter.into_inner().into_query(&auth)?;
    let page = workflow::list(store.get_ref(), &query).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: page.items,
        page: query.page,
        per_page: query.per_page,
        total: page.total,
    }))
}
