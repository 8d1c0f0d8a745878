//! Workflows behind the HTTP handlers. Each one takes its store as a
//! parameter and reads the current time from the caller.

pub mod attendance;
pub mod employee;
pub mod leave;
pub mod report;
