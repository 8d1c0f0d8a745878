use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::AppError,
    model::{employee::Employee, role::Role},
    service,
    store::{
        ReferenceStore,
        mysql::{EMPLOYEE_COLUMNS, FilterValue, MySqlStore, is_duplicate},
    },
    utils::db_utils::{Column, ColumnKind, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

const MIN_PASSWORD_LEN: usize = 8;

/// Columns a partial employee update may set.
const UPDATABLE: &[Column] = &[
    Column::required("employee_code", ColumnKind::Text),
    Column::required("first_name", ColumnKind::Text),
    Column::required("last_name", ColumnKind::Text),
    Column::required("email", ColumnKind::Text),
    Column::nullable("phone", ColumnKind::Text),
    Column::nullable("work_unit_id", ColumnKind::U64),
    Column::nullable("shift_id", ColumnKind::U64),
    Column::required("hire_date", ColumnKind::Date),
    Column::required("status", ColumnKind::Text),
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Ana")]
    pub first_name: String,
    #[schema(example = "Putri")]
    pub last_name: String,
    #[schema(example = "ana@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+6281234567890")]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub work_unit_id: Option<u64>,
    #[schema(example = 2)]
    pub shift_id: Option<u64>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    /// Creates a linked login with the Employee role when set together with `password`
    #[schema(example = "ana.putri")]
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CreateEmployee {
    fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("employee_code", &self.employee_code),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{field} must not be empty")));
            }
        }
        if !self.email.contains('@') {
            return Err(AppError::validation("email is invalid"));
        }

        match (&self.username, &self.password) {
            (None, None) => Ok(()),
            (Some(username), Some(password)) => {
                if username.trim().is_empty() {
                    Err(AppError::validation("username must not be empty"))
                } else if password.len() < MIN_PASSWORD_LEN {
                    Err(AppError::validation(format!(
                        "password must be at least {MIN_PASSWORD_LEN} characters"
                    )))
                } else {
                    Ok(())
                }
            }
            _ => Err(AppError::validation(
                "username and password must be provided together",
            )),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub work_unit_id: Option<u64>,
    pub status: Option<String>,
    /// Search by name or email
    pub search: Option<String>,
}

impl EmployeeQuery {
    /// `(page, per_page, offset)` with defaults applied. The offset is
    /// computed in `u64` so any `u32` page is representable.
    fn window(&self) -> (u32, u32, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page, u64::from(page - 1) * u64::from(per_page))
    }
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

async fn check_references(
    store: &MySqlStore,
    work_unit_id: Option<u64>,
    shift_id: Option<u64>,
) -> Result<(), AppError> {
    if let Some(unit_id) = work_unit_id {
        if store.work_unit(unit_id).await?.is_none() {
            return Err(AppError::validation(format!("work unit {unit_id} does not exist")));
        }
    }
    if let Some(shift_id) = shift_id {
        let shift = store
            .shift(shift_id)
            .await?
            .ok_or_else(|| AppError::validation(format!("shift {shift_id} does not exist")))?;
        if work_unit_id.is_some_and(|unit_id| unit_id != shift.work_unit_id) {
            return Err(AppError::validation("shift belongs to another work unit"));
        }
    }
    Ok(())
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/v1/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Employee code, email or username already exists", body = Object, example = json!({
            "message": "Username already exists"
        })),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "message": "Internal Server Error"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    payload.validate()?;
    check_references(store.get_ref(), payload.work_unit_id, payload.shift_id).await?;

    let login = match (&payload.username, &payload.password) {
        (Some(username), Some(password)) => {
            let hashed = hash_password(password).map_err(|e| AppError::Internal(e.to_string()))?;
            Some((username.trim().to_lowercase(), hashed))
        }
        _ => None,
    };

    let db_err = |e: sqlx::Error| {
        error!(error = %e, "Failed to create employee");
        AppError::Internal(e.to_string())
    };

    let mut tx = store.pool().begin().await.map_err(db_err)?;

    let employee_id = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, phone, work_unit_id, shift_id, hire_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.as_deref())
    .bind(payload.work_unit_id)
    .bind(payload.shift_id)
    .bind(payload.hire_date)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_duplicate(&e) {
            AppError::Conflict("Employee code or email already exists")
        } else {
            db_err(e)
        }
    })?
    .last_insert_id();

    if let Some((username, hashed)) = &login {
        sqlx::query(
            r#"INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
        )
        .bind(username)
        .bind(hashed)
        .bind(Role::Employee.id())
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_duplicate(&e) {
                AppError::Conflict("Username already exists")
            } else {
                db_err(e)
            }
        })?;
    }

    tx.commit().await.map_err(db_err)?;
    info!(employee_id, with_login = login.is_some(), "Employee created");

    let employee = store
        .employee(employee_id)
        .await?
        .ok_or(AppError::NotFound("employee"))?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/v1/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = query.window();

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<FilterValue> = Vec::new();

    if let Some(work_unit_id) = query.work_unit_id {
        conditions.push("work_unit_id = ?");
        bindings.push(FilterValue::U64(work_unit_id));
    }

    if let Some(status) = query.status.as_deref() {
        conditions.push("status = ?");
        bindings.push(FilterValue::Str(status));
    }

    let like = query.search.as_deref().map(|s| format!("%{}%", s.trim()));
    if let Some(like) = like.as_deref() {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        bindings.extend([FilterValue::Str(like), FilterValue::Str(like), FilterValue::Str(like)]);
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM employees {}", where_clause);
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            FilterValue::U64(v) => count_query.bind(*v),
            FilterValue::Str(s) => count_query.bind(*s),
        };
    }

    let total = count_query.fetch_one(store.pool()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count employees");
        AppError::Internal(e.to_string())
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in bindings {
        data_query = match b {
            FilterValue::U64(v) => data_query.bind(v),
            FilterValue::Str(s) => data_query.bind(s),
        };
    }
    data_query = data_query.bind(per_page).bind(offset);

    let employees = data_query.fetch_all(store.pool()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch employees");
        AppError::Internal(e.to_string())
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/v1/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(
        content = Object,
        description = "Partial update. Allowed fields: employee_code, first_name, last_name, email, phone, work_unit_id, shift_id, hire_date, status",
        content_type = "application/json",
        example = json!({
            "phone": "+62 812 0000 0000",
            "shift_id": 3,
            "status": "inactive"
        })
    ),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "employee not found"
        })),
        (status = 409, description = "Employee code or email already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let current = store
        .employee(employee_id)
        .await?
        .ok_or(AppError::NotFound("employee"))?;

    let update = build_update_sql("employees", &body, UPDATABLE, "id", employee_id)?;

    // Validate the assignment as it will look after the update.
    let pick = |key: &str, current: Option<u64>| match body.get(key) {
        Some(v) => v.as_u64(),
        None => current,
    };
    let work_unit_id = pick("work_unit_id", current.work_unit_id);
    let shift_id = pick("shift_id", current.shift_id);
    check_references(store.get_ref(), work_unit_id, shift_id).await?;

    let affected = execute_update(store.pool(), update).await.map_err(|e| {
        if is_duplicate(&e) {
            AppError::Conflict("Employee code or email already exists")
        } else {
            error!(error = %e, employee_id, "Failed to update employee");
            AppError::Internal(e.to_string())
        }
    })?;

    if affected == 0 {
        return Err(AppError::NotFound("employee"));
    }

    let employee = store
        .employee(employee_id)
        .await?
        .ok_or(AppError::NotFound("employee"))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee together with attendance, leave and linked logins
#[utoipa::path(
    delete,
    path = "/api/v1/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee and dependent records deleted", body = crate::store::DeletionSummary),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "employee not found"
        })),
        (status = 500, description = "Deletion aborted, nothing was removed", body = Object)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let summary = service::employee::delete_employee(store.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/v1/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();
    auth.require_self_or_manager(employee_id)?;

    let employee = store
        .employee(employee_id)
        .await?
        .ok_or(AppError::NotFound("employee"))?;
    Ok(HttpResponse::Ok().json(employee))
}
