//! Axum extractors for authentication and role checks.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::state::HasAuthState;
use crate::db::Role;
use crate::error::ApiError;

/// Minimal identity context attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Internal row ID, for store operations keyed by account.
    pub id: i64,
    /// Public account identifier (the claims subject).
    pub uuid: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Extract the bearer token: Authorization header first, then the
/// access-token cookie.
fn extract_token<'a>(parts: &'a Parts) -> Option<&'a str> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim());
            }
        }
    }

    get_cookie(&parts.headers, ACCESS_COOKIE_NAME)
}

/// Core authentication shared by every auth extractor.
///
/// Verification failures of any kind collapse to one generic 401 so callers
/// cannot distinguish a bad signature from a malformed token or an expired
/// one. Typed results from the user validation (404 gone, 403 soft-deleted)
/// pass through unchanged; store failures also collapse to the generic 401.
async fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<Identity, ApiError>
where
    S: HasAuthState + Send + Sync,
{
    let token =
        extract_token(parts).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let claims = state
        .sessions()
        .jwt()
        .verify_access_token(token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    // Re-validate against the store: a signed token for a deleted account
    // must stop working before its natural expiry.
    let account = state
        .sessions()
        .validate_user(&claims.sub)
        .await
        .map_err(|e| match e {
            ApiError::Internal(_) => ApiError::unauthorized("Invalid or expired token"),
            typed => typed,
        })?;

    Ok(Identity {
        id: account.id,
        uuid: account.uuid,
        email: account.email,
        role: account.role,
    })
}

/// Role authorization: plain set membership, no hierarchy. Runs only on an
/// already-authenticated identity.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You do not have permission to access this resource",
        ))
    }
}

/// Extractor for endpoints that require authentication, any role.
pub struct Auth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state).await.map(Auth)
    }
}

/// Extractor for admin-only endpoints.
pub struct AdminAuth(pub Identity);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = authenticate_request(parts, state).await?;
        authorize(&identity, &[Role::Admin])?;
        Ok(AdminAuth(identity))
    }
}

/// Optional authentication: never fails, swallows every failure silently.
/// For endpoints that behave differently for anonymous callers.
pub struct OptionalAuth(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate_request(parts, state).await.ok()))
    }
}
