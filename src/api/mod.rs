pub mod attendance;
pub mod employee;
pub mod leave_request;
pub mod shift;
pub mod work_unit;
