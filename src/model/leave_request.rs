use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveCategory {
    Sick,
    Vacation,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LeaveTransitionError {
    #[error("leave request already finalized as {0}")]
    AlreadyFinalized(LeaveStatus),
}

impl LeaveStatus {
    /// pending -> approved | rejected; both targets are terminal.
    pub fn apply(self, decision: LeaveDecision) -> Result<LeaveStatus, LeaveTransitionError> {
        match self {
            LeaveStatus::Pending => Ok(match decision {
                LeaveDecision::Approve => LeaveStatus::Approved,
                LeaveDecision::Reject => LeaveStatus::Rejected,
            }),
            finalized => Err(LeaveTransitionError::AlreadyFinalized(finalized)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "start_date": "2024-01-10",
    "end_date": "2024-01-12",
    "category": "sick",
    "reason": "Flu",
    "attachment": null,
    "status": "pending",
    "decided_by": null,
    "created_at": "2024-01-09T02:00:00Z"
}))]
pub struct LeaveRecord {
    pub id: u64,
    pub employee_id: u64,
    /// First day of leave, inclusive.
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    /// Last day of leave, inclusive.
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub category: LeaveCategory,
    pub reason: String,
    pub attachment: Option<String>,
    pub status: LeaveStatus,
    pub decided_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLeave {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: LeaveCategory,
    pub reason: String,
    pub attachment: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRow {
    pub id: u64,
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: String,
    pub reason: String,
    pub attachment: Option<String>,
    pub status: String,
    pub decided_by: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRow> for LeaveRecord {
    type Error = strum::ParseError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRecord {
            id: row.id,
            employee_id: row.employee_id,
            start_date: row.start_date,
            end_date: row.end_date,
            category: row.category.parse()?,
            reason: row.reason,
            attachment: row.attachment,
            status: row.status.parse()?,
            decided_by: row.decided_by,
            created_at: row.created_at,
        })
    }
}
