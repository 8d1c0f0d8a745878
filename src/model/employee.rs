use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Only employees in this status clock in and appear in reports.
pub const ACTIVE_STATUS: &str = "active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+6281234567890",
        "work_unit_id": 1,
        "shift_id": 2,
        "hire_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+6281234567890", nullable = true)]
    pub phone: Option<String>,

    /// Work unit whose geofence applies to this employee's clock events.
    #[schema(example = 1, nullable = true)]
    pub work_unit_id: Option<u64>,

    /// Explicit shift assignment; the unit's default shift applies when absent.
    #[schema(example = 2, nullable = true)]
    pub shift_id: Option<u64>,

    #[schema(
        example = "2024-01-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }
}
