use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::work_unit::GeoPoint;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClockInStatus {
    OnTime,
    Late,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClockOutStatus {
    OnTime,
    LeftEarly,
}

/// Classification of one employee on one civil date, as shown in reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DailyStatus {
    Present,
    Late,
    Absent,
    OnLeave,
}

/// One clock event as captured by the mobile app.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockEvent {
    pub point: GeoPoint,
    pub photo: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub clock_in_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub clock_out_at: Option<DateTime<Utc>>,
    pub clock_in_point: Option<GeoPoint>,
    pub clock_out_point: Option<GeoPoint>,
    /// Distance from the unit's registered point; absent when the unit had no geofence.
    pub clock_in_distance_m: Option<f64>,
    pub clock_out_distance_m: Option<f64>,
    pub clock_in_photo: Option<String>,
    pub clock_out_photo: Option<String>,
    pub clock_in_status: ClockInStatus,
    pub clock_out_status: Option<ClockOutStatus>,
    /// Set when a clock event outside the radius was accepted under the flag policy.
    pub out_of_range: bool,
    /// Set when a clock event was accepted although the unit has no coordinates.
    pub geofence_unconfigured: bool,
    pub work_unit_id: u64,
    pub shift_id: Option<u64>,
}

/// Insert payload for a check-in; `clock_in_at` is always set.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub clock_in_at: DateTime<Utc>,
    pub clock_in_point: GeoPoint,
    pub clock_in_distance_m: Option<f64>,
    pub clock_in_photo: Option<String>,
    pub clock_in_status: ClockInStatus,
    pub out_of_range: bool,
    pub geofence_unconfigured: bool,
    pub work_unit_id: u64,
    pub shift_id: Option<u64>,
}

impl NewAttendance {
    pub fn into_record(self, id: u64) -> AttendanceRecord {
        AttendanceRecord {
            id,
            employee_id: self.employee_id,
            date: self.date,
            clock_in_at: Some(self.clock_in_at),
            clock_out_at: None,
            clock_in_point: Some(self.clock_in_point),
            clock_out_point: None,
            clock_in_distance_m: self.clock_in_distance_m,
            clock_out_distance_m: None,
            clock_in_photo: self.clock_in_photo,
            clock_out_photo: None,
            clock_in_status: self.clock_in_status,
            clock_out_status: None,
            out_of_range: self.out_of_range,
            geofence_unconfigured: self.geofence_unconfigured,
            work_unit_id: self.work_unit_id,
            shift_id: self.shift_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutUpdate {
    pub clock_out_at: DateTime<Utc>,
    pub clock_out_point: GeoPoint,
    pub clock_out_distance_m: Option<f64>,
    pub clock_out_photo: Option<String>,
    pub clock_out_status: ClockOutStatus,
    pub out_of_range: bool,
    pub geofence_unconfigured: bool,
}

impl CheckOutUpdate {
    /// Applies the check-out fields; range and configuration flags only ever accumulate.
    pub fn apply_to(self, record: &mut AttendanceRecord) {
        record.clock_out_at = Some(self.clock_out_at);
        record.clock_out_point = Some(self.clock_out_point);
        record.clock_out_distance_m = self.clock_out_distance_m;
        record.clock_out_photo = self.clock_out_photo;
        record.clock_out_status = Some(self.clock_out_status);
        record.out_of_range |= self.out_of_range;
        record.geofence_unconfigured |= self.geofence_unconfigured;
    }
}

/// Row shape of the `attendance` table.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub clock_in_at: Option<DateTime<Utc>>,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub clock_in_lat: Option<f64>,
    pub clock_in_lng: Option<f64>,
    pub clock_out_lat: Option<f64>,
    pub clock_out_lng: Option<f64>,
    pub clock_in_distance_m: Option<f64>,
    pub clock_out_distance_m: Option<f64>,
    pub clock_in_photo: Option<String>,
    pub clock_out_photo: Option<String>,
    pub clock_in_status: String,
    pub clock_out_status: Option<String>,
    pub out_of_range: bool,
    pub geofence_unconfigured: bool,
    pub work_unit_id: u64,
    pub shift_id: Option<u64>,
}

fn point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let clock_out_status = row
            .clock_out_status
            .as_deref()
            .map(str::parse::<ClockOutStatus>)
            .transpose()?;

        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            clock_in_at: row.clock_in_at,
            clock_out_at: row.clock_out_at,
            clock_in_point: point(row.clock_in_lat, row.clock_in_lng),
            clock_out_point: point(row.clock_out_lat, row.clock_out_lng),
            clock_in_distance_m: row.clock_in_distance_m,
            clock_out_distance_m: row.clock_out_distance_m,
            clock_in_photo: row.clock_in_photo,
            clock_out_photo: row.clock_out_photo,
            clock_in_status: row.clock_in_status.parse()?,
            clock_out_status,
            out_of_range: row.out_of_range,
            geofence_unconfigured: row.geofence_unconfigured,
            work_unit_id: row.work_unit_id,
            shift_id: row.shift_id,
        })
    }
}
