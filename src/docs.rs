use crate::api::attendance::{ClockRequest, ReportFilter};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::shift::{CreateShift, UpdateShift};
use crate::api::work_unit::{CreateWorkUnit, UpdateWorkUnit};
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceRecord, ClockInStatus, ClockOutStatus, DailyStatus};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveCategory, LeaveRecord, LeaveStatus};
use crate::model::shift::ShiftDefinition;
use crate::model::work_unit::{GeoPoint, WorkUnit};
use crate::models::{LoginReqDto, RefreshReqDto};
use crate::service::report::ReportRow;
use crate::store::DeletionSummary;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance & Leave Rules Service

Geofenced clock-in/clock-out, shift-based lateness, leave requests and
daily attendance reporting for a human resource management system.

### Key Features
- **Attendance**
  - Check-in and check-out validated against the work unit's geofence
  - On-time / late and on-time / left-early classification from the assigned shift
- **Leave Management**
  - Apply for leave, approve/reject once, list and view requests
- **Reporting**
  - One row per employee per day: present, late, absent or on leave
- **Administration**
  - Employees, work units (geofence center and radius) and shifts

### Security
Most endpoints are protected using **JWT Bearer authentication**.
Only **Admin** or **HR** can decide leave and manage reference data.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::attendance_report,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::work_unit::create_work_unit,
        crate::api::work_unit::list_work_units,
        crate::api::work_unit::get_work_unit,
        crate::api::work_unit::update_work_unit,

        crate::api::shift::create_shift,
        crate::api::shift::list_shifts,
        crate::api::shift::get_shift,
        crate::api::shift::update_shift
    ),
    components(
        schemas(
            LoginReqDto,
            RefreshReqDto,
            LoginResponse,
            ClockRequest,
            ReportFilter,
            ReportRow,
            GeoPoint,
            AttendanceRecord,
            ClockInStatus,
            ClockOutStatus,
            DailyStatus,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            LeaveRecord,
            LeaveCategory,
            LeaveStatus,
            CreateEmployee,
            EmployeeQuery,
            Employee,
            EmployeeListResponse,
            DeletionSummary,
            CreateWorkUnit,
            UpdateWorkUnit,
            WorkUnit,
            CreateShift,
            UpdateShift,
            ShiftDefinition
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Attendance", description = "Clock events and attendance reporting"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Work Unit", description = "Work unit and geofence administration"),
        (name = "Shift", description = "Shift administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
