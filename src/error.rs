use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

use crate::model::leave_request::{LeaveStatus, LeaveTransitionError};
use crate::rules::geofence::GeofenceError;
use crate::store::StoreError;

/// Setup problems that make an attendance rule impossible to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("employee {employee_id} is not assigned to a work unit")]
    NoWorkUnit { employee_id: u64 },

    #[error("work unit {unit_id} has no registered coordinates")]
    UnitNotConfigured { unit_id: u64 },

    #[error("employee {employee_id} has no shift assignment")]
    NoShift { employee_id: u64 },
}

impl From<GeofenceError> for ConfigurationError {
    fn from(err: GeofenceError) -> Self {
        match err {
            GeofenceError::UnitNotConfigured { unit_id } => {
                ConfigurationError::UnitNotConfigured { unit_id }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("leave request {leave_id} already finalized as {status}")]
    AlreadyFinalized { leave_id: u64, status: LeaveStatus },

    #[error("already checked in on {date}")]
    AlreadyCheckedIn { date: NaiveDate },

    #[error("no active check-in found for {date}")]
    NoActiveCheckIn { date: NaiveDate },

    #[error("deletion of employee {employee_id} aborted, no partial state persisted")]
    DeletionAborted { employee_id: u64 },

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn finalized(leave_id: u64, err: LeaveTransitionError) -> Self {
        match err {
            LeaveTransitionError::AlreadyFinalized(status) => {
                AppError::AlreadyFinalized { leave_id, status }
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::NoActiveCheckIn { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_)
            | AppError::AlreadyFinalized { .. }
            | AppError::AlreadyCheckedIn { .. } => StatusCode::CONFLICT,
            AppError::DeletionAborted { .. } | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "Storage failure");
                "Internal Server Error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
