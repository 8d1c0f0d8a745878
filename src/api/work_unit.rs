use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::work_unit::{GeoPoint, WorkUnit},
    store::{
        ReferenceStore,
        mysql::{MySqlStore, WORK_UNIT_COLUMNS, is_duplicate},
    },
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateWorkUnit {
    #[schema(example = "Head Office")]
    pub name: String,
    /// Geofence center; latitude and longitude come as a pair or not at all
    #[schema(example = -6.2)]
    pub latitude: Option<f64>,
    #[schema(example = 106.816666)]
    pub longitude: Option<f64>,
    #[schema(example = 100.0)]
    pub radius_m: f64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateWorkUnit {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_m: Option<f64>,
    /// Removes the registered coordinates; clock events then follow the unconfigured-unit policy
    #[serde(default)]
    pub clear_geofence: bool,
}

impl CreateWorkUnit {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        if !(self.radius_m.is_finite() && self.radius_m > 0.0) {
            return Err(AppError::validation("radius_m must be a positive number"));
        }
        match (self.latitude, self.longitude) {
            (None, None) => Ok(()),
            (Some(latitude), Some(longitude)) => {
                if GeoPoint::new(latitude, longitude).is_valid() {
                    Ok(())
                } else {
                    Err(AppError::validation(
                        "latitude must be within [-90, 90] and longitude within [-180, 180]",
                    ))
                }
            }
            _ => Err(AppError::validation(
                "latitude and longitude must be provided together",
            )),
        }
    }
}

impl UpdateWorkUnit {
    /// The unit as it would look after this patch.
    fn merge(self, current: &WorkUnit) -> Result<CreateWorkUnit, AppError> {
        if self.clear_geofence && (self.latitude.is_some() || self.longitude.is_some()) {
            return Err(AppError::validation(
                "clear_geofence cannot be combined with coordinates",
            ));
        }

        let (latitude, longitude) = if self.clear_geofence {
            (None, None)
        } else {
            (
                self.latitude.or(current.latitude),
                self.longitude.or(current.longitude),
            )
        };

        let merged = CreateWorkUnit {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            latitude,
            longitude,
            radius_m: self.radius_m.unwrap_or(current.radius_m),
        };
        merged.validate()?;
        Ok(merged)
    }
}

fn db_error(action: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        if is_duplicate(&e) {
            AppError::Conflict("Work unit name already exists")
        } else {
            error!(error = %e, action, "Work unit query failed");
            AppError::Internal(e.to_string())
        }
    }
}

/// Register a work unit (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/unit",
    request_body = CreateWorkUnit,
    responses(
        (status = 201, description = "Work unit created", body = WorkUnit),
        (status = 400, description = "Invalid coordinates or radius"),
        (status = 409, description = "Work unit name already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Work Unit"
)]
pub async fn create_work_unit(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<CreateWorkUnit>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    payload.validate()?;

    let id = sqlx::query("INSERT INTO work_units (name, latitude, longitude, radius_m) VALUES (?, ?, ?, ?)")
        .bind(payload.name.trim())
        .bind(payload.latitude)
        .bind(payload.longitude)
        .bind(payload.radius_m)
        .execute(store.pool())
        .await
        .map_err(db_error("create"))?
        .last_insert_id();

    info!(work_unit_id = id, geofenced = payload.latitude.is_some(), "Work unit created");

    let unit = store
        .work_unit(id)
        .await?
        .ok_or(AppError::NotFound("work unit"))?;
    Ok(HttpResponse::Created().json(unit))
}

#[utoipa::path(
    get,
    path = "/api/v1/unit",
    responses(
        (status = 200, description = "All work units", body = [WorkUnit]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Work Unit"
)]
pub async fn list_work_units(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let sql = format!("SELECT {WORK_UNIT_COLUMNS} FROM work_units ORDER BY name");
    let units = sqlx::query_as::<_, WorkUnit>(&sql)
        .fetch_all(store.pool())
        .await
        .map_err(db_error("list"))?;

    Ok(HttpResponse::Ok().json(units))
}

#[utoipa::path(
    get,
    path = "/api/v1/unit/{unit_id}",
    params(
        ("unit_id" = u64, Path, description = "Work unit ID")
    ),
    responses(
        (status = 200, description = "Work unit found", body = WorkUnit),
        (status = 404, description = "Work unit not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Work Unit"
)]
pub async fn get_work_unit(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let unit = store
        .work_unit(path.into_inner())
        .await?
        .ok_or(AppError::NotFound("work unit"))?;
    Ok(HttpResponse::Ok().json(unit))
}

/// Partially update a work unit; cached copies are dropped
#[utoipa::path(
    put,
    path = "/api/v1/unit/{unit_id}",
    params(
        ("unit_id" = u64, Path, description = "Work unit ID")
    ),
    request_body = UpdateWorkUnit,
    responses(
        (status = 200, description = "Work unit updated", body = WorkUnit),
        (status = 400, description = "Invalid coordinates or radius"),
        (status = 404, description = "Work unit not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Work Unit"
)]
pub async fn update_work_unit(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
    payload: web::Json<UpdateWorkUnit>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let current = store
        .work_unit(id)
        .await?
        .ok_or(AppError::NotFound("work unit"))?;
    let merged = payload.into_inner().merge(&current)?;

    sqlx::query("UPDATE work_units SET name = ?, latitude = ?, longitude = ?, radius_m = ? WHERE id = ?")
        .bind(merged.name.trim())
        .bind(merged.latitude)
        .bind(merged.longitude)
        .bind(merged.radius_m)
        .bind(id)
        .execute(store.pool())
        .await
        .map_err(db_error("update"))?;

    store.forget_work_unit(id).await;
    info!(work_unit_id = id, "Work unit updated");

    let unit = store
        .work_unit(id)
        .await?
        .ok_or(AppError::NotFound("work unit"))?;
    Ok(HttpResponse::Ok().json(unit))
}
