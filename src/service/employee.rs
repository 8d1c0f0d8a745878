use tracing::{error, info, instrument};

use crate::error::AppError;
use crate::store::{DeletionSummary, EmployeeStore};

/// Removes an employee together with attendance, leave and login rows.
/// Either everything is removed or nothing is.
#[instrument(name = "delete_employee", skip(store))]
pub async fn delete_employee<S: EmployeeStore>(
    store: &S,
    employee_id: u64,
) -> Result<DeletionSummary, AppError> {
    match store.delete_employee_cascade(employee_id).await {
        Ok(Some(summary)) => {
            info!(
                attendance = summary.attendance,
                leave_requests = summary.leave_requests,
                users = summary.users,
                "Employee deleted"
            );
            Ok(summary)
        }
        Ok(None) => Err(AppError::NotFound("employee")),
        Err(e) => {
            error!(error = %e, "Employee deletion rolled back");
            Err(AppError::DeletionAborted { employee_id })
        }
    }
}
