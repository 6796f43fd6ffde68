//! Authentication API endpoints.
//!
//! - POST `/register` - Create an account and open a session
//! - POST `/login` - Authenticate by email or employee ID
//! - POST `/refresh-token` - Exchange a refresh token for a new access token
//! - POST `/logout` - Revoke one session grant and clear the cookie
//! - POST `/logout-all` - Revoke every grant of the caller's account
//! - GET `/me` - Current account profile
//! - GET `/status` - Auth status, anonymous callers allowed
//! - GET `/sessions` - The caller's active session grants
//! - DELETE `/sessions/{uuid}` - Admin: revoke all grants of an account

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{
    AdminAuth, Auth, Identity, OptionalAuth, REFRESH_COOKIE_NAME, clear_refresh_cookie,
    get_cookie, refresh_cookie,
};
use crate::db::{AccountProfile, Role};
use crate::error::{ApiError, ResultExt};
use crate::impl_has_auth_state;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};
use crate::session::{Registration, SessionMetadata, SessionService};

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionService,
    pub secure_cookies: bool,
    pub rate_limits: Arc<RateLimitConfig>,
}

impl_has_auth_state!(AuthState);

pub fn router(state: AuthState) -> Router {
    let register_routes = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits.clone(),
            rate_limit_register,
        ));

    let login_routes = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits.clone(),
            rate_limit_login,
        ));

    let session_routes = Router::new()
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/me", get(me))
        .route("/status", get(status))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{uuid}", delete(revoke_account_sessions))
        .with_state(state);

    Router::new()
        .merge(register_routes)
        .merge(login_routes)
        .merge(session_routes)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    role: String,
    #[serde(default)]
    is_admin: bool,
    employee_id: Option<String>,
    email: Option<String>,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    /// Email address or employee ID.
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user: AccountProfile,
    access_token: String,
    refresh_token: String,
}

/// Shape check matching the original's `\S+@\S+\.\S+` email rule.
fn is_valid_email(s: &str) -> bool {
    if s.contains(char::is_whitespace) {
        return false;
    }
    let mut parts = s.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        _ => false,
    }
}

fn validate_registration(payload: &RegisterRequest) -> Result<Registration, ApiError> {
    let name = payload.name.trim();
    if name.len() < 2 {
        return Err(ApiError::bad_request("Name must be at least 2 characters long"));
    }
    if name.len() > 100 {
        return Err(ApiError::bad_request("Name cannot exceed 100 characters"));
    }

    let role = Role::parse(&payload.role).ok_or_else(|| {
        ApiError::bad_request("Role must be one of: user, admin, moderator, employee")
    })?;

    let employee_id = match &payload.employee_id {
        Some(employee_id) => {
            let employee_id = employee_id.trim();
            if employee_id.is_empty() || employee_id.len() > 50 {
                return Err(ApiError::bad_request("Employee ID cannot exceed 50 characters"));
            }
            if !employee_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return Err(ApiError::bad_request(
                    "Employee ID must only contain alphanumeric characters",
                ));
            }
            Some(employee_id.to_string())
        }
        None => None,
    };

    let email = match &payload.email {
        Some(email) => {
            let email = email.trim();
            if !is_valid_email(email) {
                return Err(ApiError::bad_request("Please provide a valid email address"));
            }
            Some(email.to_string())
        }
        None => None,
    };

    if payload.password.len() < 6 {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters long",
        ));
    }
    if payload.password.len() > 128 {
        return Err(ApiError::bad_request("Password cannot exceed 128 characters"));
    }

    Ok(Registration {
        name: name.to_string(),
        role,
        is_admin: payload.is_admin,
        employee_id,
        email,
        password: payload.password.clone(),
    })
}

async fn register(
    State(state): State<AuthState>,
    metadata: SessionMetadata,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = validate_registration(&payload)?;

    let session = state.sessions.register(registration, metadata).await?;

    let cookie = refresh_cookie(
        &session.tokens.refresh_token,
        state.sessions.jwt().refresh_lifetime_secs(),
        state.secure_cookies,
    );

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            user: session.account,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }),
    ))
}

async fn login(
    State(state): State<AuthState>,
    metadata: SessionMetadata,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let session = state
        .sessions
        .login(&payload.email, &payload.password, metadata)
        .await?;

    let cookie = refresh_cookie(
        &session.tokens.refresh_token,
        state.sessions.jwt().refresh_lifetime_secs(),
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            user: session.account,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// The refresh token may arrive in the body or the cookie; body wins.
fn presented_refresh_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    serde_json::from_slice::<RefreshRequest>(body)
        .ok()
        .and_then(|b| b.refresh_token)
        .or_else(|| get_cookie(headers, REFRESH_COOKIE_NAME).map(str::to_string))
}

async fn refresh_token(
    State(state): State<AuthState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = presented_refresh_token(&headers, &body)
        .ok_or_else(|| ApiError::unauthorized("Refresh token is required"))?;

    let access_token = state.sessions.refresh_access_token(&token).await?;

    Ok((StatusCode::OK, Json(RefreshResponse { access_token })))
}

async fn logout(
    State(state): State<AuthState>,
    Auth(_identity): Auth,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = presented_refresh_token(&headers, &body);
    state.sessions.logout(token.as_deref()).await?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "success": true })),
    ))
}

async fn logout_all(
    State(state): State<AuthState>,
    Auth(identity): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state.sessions.logout_all(identity.id).await?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "success": true, "revoked": revoked })),
    ))
}

async fn me(
    State(state): State<AuthState>,
    Auth(identity): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.sessions.validate_user(&identity.uuid).await?;

    Ok(Json(serde_json::json!({ "user": account.profile() })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityContext {
    account_id: String,
    email: Option<String>,
    role: Role,
}

impl From<Identity> for IdentityContext {
    fn from(identity: Identity) -> Self {
        Self {
            account_id: identity.uuid,
            email: identity.email,
            role: identity.role,
        }
    }
}

/// Auth status for anonymous and authenticated callers alike.
async fn status(OptionalAuth(identity): OptionalAuth) -> impl IntoResponse {
    match identity {
        Some(identity) => Json(serde_json::json!({
            "authenticated": true,
            "user": IdentityContext::from(identity),
        })),
        None => Json(serde_json::json!({ "authenticated": false })),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    created_at: String,
    expires_at: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
}

/// List the caller's active session grants. Token values stay server-side.
async fn list_sessions(
    State(state): State<AuthState>,
    Auth(identity): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .sessions
        .db()
        .refresh_tokens()
        .list_active_for_account(identity.id)
        .await
        .db_err("Failed to list sessions")?;

    let sessions: Vec<SessionInfo> = records
        .into_iter()
        .map(|r| SessionInfo {
            created_at: r.created_at,
            expires_at: r.expires_at,
            user_agent: r.user_agent,
            ip_address: r.ip_address,
        })
        .collect();

    Ok(Json(serde_json::json!({ "sessions": sessions })))
}

/// Admin: revoke every session grant of the target account.
async fn revoke_account_sessions(
    State(state): State<AuthState>,
    AdminAuth(_admin): AdminAuth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .sessions
        .db()
        .accounts()
        .find_by_uuid(&uuid)
        .await
        .db_err("Failed to look up account")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let revoked = state.sessions.logout_all(account.id).await?;

    Ok(Json(serde_json::json!({ "success": true, "revoked": revoked })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));

        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("ax.com"));
        assert!(!is_valid_email("a@@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email(""));
    }
}
