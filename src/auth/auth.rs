use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::role::Role;

/// Caller identity placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(AppError::Unauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> Result<(), AppError> {
        if self.role.is_manager() {
            Ok(())
        } else {
            Err(AppError::Forbidden("HR/Admin only"))
        }
    }

    /// The employee profile behind this login, required for clock events and leave.
    pub fn employee_id(&self) -> Result<u64, AppError> {
        self.employee_id
            .ok_or(AppError::Forbidden("No employee profile"))
    }

    /// Managers may act on anyone; employees only on themselves.
    pub fn require_self_or_manager(&self, employee_id: u64) -> Result<(), AppError> {
        if self.role.is_manager() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not allowed for this employee"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn employees_only_see_themselves() {
        let staff = user(Role::Employee, Some(5));
        assert!(staff.require_self_or_manager(5).is_ok());
        assert!(staff.require_self_or_manager(6).is_err());
        assert!(staff.require_hr_or_admin().is_err());

        let hr = user(Role::Hr, None);
        assert!(hr.require_self_or_manager(6).is_ok());
        assert!(matches!(hr.employee_id(), Err(AppError::Forbidden(_))));
    }
}
