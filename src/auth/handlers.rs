use crate::{
    auth::{
        jwt::{Subject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::AppError,
    models::{LoginReqDto, RefreshReqDto, TokenType, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(FromRow)]
struct RefreshRecord {
    id: u64,
    user_id: u64,
    revoked: bool,
}

fn db_error(e: sqlx::Error) -> AppError {
    error!(error = %e, "Auth query failed");
    AppError::Internal(e.to_string())
}

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::Internal(format!("token encoding failed: {e}"))
}

/// Issues an access token plus a refresh token whose `jti` is persisted for rotation.
async fn issue_pair(
    conn: &mut sqlx::MySqlConnection,
    subject: &Subject<'_>,
    config: &Config,
) -> Result<LoginResponse, AppError> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl).map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl).map_err(token_error)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(conn)
    .await
    .map_err(db_error)?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Exchange credentials for a token pair
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::validation("Username or password required"));
    }

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_error)?;

    let db_user = match db_user {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthorized("Invalid credentials"));
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    let subject = Subject {
        user_id: db_user.id,
        username: &db_user.username,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };

    let mut conn = pool.acquire().await.map_err(db_error)?;
    let pair = issue_pair(&mut *conn, &subject, &config).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(&mut *conn)
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/// Refresh token from the JSON body, falling back to `Authorization: Bearer`.
fn presented_refresh_token(req: &HttpRequest, body: Option<&RefreshReqDto>) -> Option<String> {
    if let Some(body) = body {
        let token = body.refresh_token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Rotate a refresh token: the presented one is revoked, a new pair is issued
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body(content = RefreshReqDto, description = "Refresh token, or send it as a Bearer header"),
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Missing, expired or revoked refresh token")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshReqDto>>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = presented_refresh_token(&req, body.as_deref())
        .ok_or(AppError::Unauthorized("No token"))?;

    let claims = verify_token(&token, &config.jwt_secret).map_err(|e| {
        debug!(error = %e, "Refresh token rejected");
        AppError::Unauthorized("Invalid or expired token")
    })?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required"));
    }

    let mut tx = pool.begin().await.map_err(db_error)?;

    let record = sqlx::query_as::<_, RefreshRecord>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        FOR UPDATE
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_error)?;

    let record = match record {
        Some(r) if !r.revoked && r.user_id == claims.user_id => r,
        _ => {
            info!(user_id = claims.user_id, "Refresh token unknown or revoked");
            return Err(AppError::Unauthorized("Invalid or expired token"));
        }
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record.id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    let subject = Subject {
        user_id: claims.user_id,
        username: &claims.sub,
        role: claims.role,
        employee_id: claims.employee_id,
    };
    let pair = issue_pair(&mut *tx, &subject, &config).await?;

    tx.commit().await.map_err(db_error)?;

    info!(user_id = claims.user_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn body_token_wins_over_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer from-header"))
            .to_http_request();
        let body = RefreshReqDto {
            refresh_token: "from-body".into(),
        };

        assert_eq!(
            presented_refresh_token(&req, Some(&body)).as_deref(),
            Some("from-body")
        );
        assert_eq!(
            presented_refresh_token(&req, None).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn missing_or_malformed_header_yields_nothing() {
        let bare = TestRequest::default().to_http_request();
        assert!(presented_refresh_token(&bare, None).is_none());

        let basic = TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        let blank = RefreshReqDto {
            refresh_token: "  ".into(),
        };
        assert!(presented_refresh_token(&basic, Some(&blank)).is_none());
    }
}
