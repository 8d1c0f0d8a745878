use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::shift::ShiftDefinition,
    store::{
        ReferenceStore,
        mysql::{MySqlStore, SHIFT_COLUMNS},
    },
    utils::db_utils::parse_clock_time,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::Deserialize;
use sqlx::{MySql, Transaction};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = 1)]
    pub work_unit_id: u64,
    #[schema(example = "Morning")]
    pub name: String,
    #[schema(example = "09:00")]
    pub start_time: String,
    #[schema(example = "17:00")]
    pub end_time: String,
    #[schema(example = 10)]
    #[serde(default)]
    pub grace_minutes: u32,
    /// Marking a shift default clears the unit's previous default
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateShift {
    pub name: Option<String>,
    #[schema(example = "08:30")]
    pub start_time: Option<String>,
    #[schema(example = "16:30")]
    pub end_time: Option<String>,
    pub grace_minutes: Option<u32>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
pub struct ShiftFilter {
    /// Only shifts of this work unit
    pub work_unit_id: Option<u64>,
}

/// A validated shift ready to be written.
#[derive(Debug, Clone, PartialEq)]
struct ShiftDraft {
    name: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    grace_minutes: u32,
    is_default: bool,
    is_active: bool,
}

fn clock(field: &str, raw: &str) -> Result<NaiveTime, AppError> {
    parse_clock_time(raw).ok_or_else(|| AppError::validation(format!("{field} must be HH:MM")))
}

impl ShiftDraft {
    fn validate(self) -> Result<Self, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        // Overnight shifts are not supported; lateness compares times on one civil date.
        if self.start_time >= self.end_time {
            return Err(AppError::validation("start_time must be before end_time"));
        }
        if self.is_default && !self.is_active {
            return Err(AppError::validation("an inactive shift cannot be the default"));
        }
        Ok(self)
    }
}

impl CreateShift {
    fn draft(&self) -> Result<ShiftDraft, AppError> {
        ShiftDraft {
            name: self.name.trim().to_string(),
            start_time: clock("start_time", &self.start_time)?,
            end_time: clock("end_time", &self.end_time)?,
            grace_minutes: self.grace_minutes,
            is_default: self.is_default,
            is_active: self.is_active,
        }
        .validate()
    }
}

impl UpdateShift {
    fn merge(self, current: &ShiftDefinition) -> Result<ShiftDraft, AppError> {
        ShiftDraft {
            name: self
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| current.name.clone()),
            start_time: match self.start_time {
                Some(raw) => clock("start_time", &raw)?,
                None => current.start_time,
            },
            end_time: match self.end_time {
                Some(raw) => clock("end_time", &raw)?,
                None => current.end_time,
            },
            grace_minutes: self.grace_minutes.unwrap_or(current.grace_minutes),
            is_default: self.is_default.unwrap_or(current.is_default),
            is_active: self.is_active.unwrap_or(current.is_active),
        }
        .validate()
    }
}

fn db_error(e: sqlx::Error) -> AppError {
    error!(error = %e, "Shift query failed");
    AppError::Internal(e.to_string())
}

/// Clears the current default of a unit, returning the shifts that lost the flag.
async fn clear_default(
    tx: &mut Transaction<'_, MySql>,
    work_unit_id: u64,
    keep: Option<u64>,
) -> Result<Vec<u64>, sqlx::Error> {
    let previous: Vec<u64> =
        sqlx::query_scalar::<_, u64>("SELECT id FROM shifts WHERE work_unit_id = ? AND is_default = 1 FOR UPDATE")
            .bind(work_unit_id)
            .fetch_all(&mut **tx)
            .await?
            .into_iter()
            .filter(|id| Some(*id) != keep)
            .collect();

    for id in &previous {
        sqlx::query("UPDATE shifts SET is_default = 0 WHERE id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(previous)
}

/// Define a shift for a work unit (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/shift",
    request_body = CreateShift,
    responses(
        (status = 201, description = "Shift created", body = ShiftDefinition),
        (status = 400, description = "Invalid times or unknown work unit"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<CreateShift>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    let draft = payload.draft()?;
    let work_unit_id = payload.work_unit_id;

    if store.work_unit(work_unit_id).await?.is_none() {
        return Err(AppError::validation(format!(
            "work unit {work_unit_id} does not exist"
        )));
    }

    let mut tx = store.pool().begin().await.map_err(db_error)?;

    let cleared = if draft.is_default {
        clear_default(&mut tx, work_unit_id, None)
            .await
            .map_err(db_error)?
    } else {
        Vec::new()
    };

    let id = sqlx::query(
        r#"
        INSERT INTO shifts
        (work_unit_id, name, start_time, end_time, grace_minutes, is_default, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(work_unit_id)
    .bind(&draft.name)
    .bind(draft.start_time)
    .bind(draft.end_time)
    .bind(draft.grace_minutes)
    .bind(draft.is_default)
    .bind(draft.is_active)
    .execute(&mut *tx)
    .await
    .map_err(db_error)?
    .last_insert_id();

    tx.commit().await.map_err(db_error)?;

    for previous in cleared {
        store.forget_shift(previous).await;
    }
    info!(shift_id = id, work_unit_id, is_default = draft.is_default, "Shift created");

    let shift = store
        .shift(id)
        .await?
        .ok_or(AppError::NotFound("shift"))?;
    Ok(HttpResponse::Created().json(shift))
}

#[utoipa::path(
    get,
    path = "/api/v1/shift",
    params(ShiftFilter),
    responses(
        (status = 200, description = "Shift definitions", body = [ShiftDefinition]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn list_shifts(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    filter: web::Query<ShiftFilter>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let shifts = match filter.work_unit_id {
        Some(unit_id) => {
            let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE work_unit_id = ? ORDER BY start_time, id");
            sqlx::query_as::<_, ShiftDefinition>(&sql)
                .bind(unit_id)
                .fetch_all(store.pool())
                .await
        }
        None => {
            let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY work_unit_id, start_time, id");
            sqlx::query_as::<_, ShiftDefinition>(&sql)
                .fetch_all(store.pool())
                .await
        }
    }
    .map_err(db_error)?;

    Ok(HttpResponse::Ok().json(shifts))
}

#[utoipa::path(
    get,
    path = "/api/v1/shift/{shift_id}",
    params(
        ("shift_id" = u64, Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift found", body = ShiftDefinition),
        (status = 404, description = "Shift not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn get_shift(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let shift = store
        .shift(path.into_inner())
        .await?
        .ok_or(AppError::NotFound("shift"))?;
    Ok(HttpResponse::Ok().json(shift))
}

/// Partially update a shift; cached copies are dropped
#[utoipa::path(
    put,
    path = "/api/v1/shift/{shift_id}",
    params(
        ("shift_id" = u64, Path, description = "Shift ID")
    ),
    request_body = UpdateShift,
    responses(
        (status = 200, description = "Shift updated", body = ShiftDefinition),
        (status = 400, description = "Invalid times"),
        (status = 404, description = "Shift not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
    payload: web::Json<UpdateShift>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let current = store
        .shift(id)
        .await?
        .ok_or(AppError::NotFound("shift"))?;
    let draft = payload.into_inner().merge(&current)?;

    let mut tx = store.pool().begin().await.map_err(db_error)?;

    let cleared = if draft.is_default && !current.is_default {
        clear_default(&mut tx, current.work_unit_id, Some(id))
            .await
            .map_err(db_error)?
    } else {
        Vec::new()
    };

    sqlx::query(
        r#"
        UPDATE shifts
        SET name = ?, start_time = ?, end_time = ?, grace_minutes = ?, is_default = ?, is_active = ?
        WHERE id = ?
        "#,
    )
    .bind(&draft.name)
    .bind(draft.start_time)
    .bind(draft.end_time)
    .bind(draft.grace_minutes)
    .bind(draft.is_default)
    .bind(draft.is_active)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;

    store.forget_shift(id).await;
    for previous in cleared {
        store.forget_shift(previous).await;
    }
    info!(shift_id = id, "Shift updated");

    let shift = store
        .shift(id)
        .await?
        .ok_or(AppError::NotFound("shift"))?;
    Ok(HttpResponse::Ok().json(shift))
}
