//! Pure attendance rules: geofence distance, shift lateness and leave overlap.
//!
//! Nothing in here touches storage or process state; every input arrives as a
//! parameter, including the policy knobs in [`policy::AttendancePolicy`].

pub mod geofence;
pub mod lateness;
pub mod leave;
pub mod policy;
