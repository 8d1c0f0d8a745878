use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "work_unit_id": 1,
        "name": "Morning",
        "start_time": "09:00:00",
        "end_time": "17:00:00",
        "grace_minutes": 10,
        "is_default": true,
        "is_active": true
    })
)]
pub struct ShiftDefinition {
    pub id: u64,
    pub work_unit_id: u64,
    pub name: String,
    #[schema(value_type = String, format = "time")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time")]
    pub end_time: NaiveTime,
    /// Minutes after `start_time` that still count as on time.
    pub grace_minutes: u32,
    pub is_default: bool,
    pub is_active: bool,
}
