//! JWT token generation and validation.
//!
//! Two independent signing contexts: access tokens (short-lived, stateless)
//! and refresh tokens (long-lived, database-tracked). Each context has its
//! own secret and lifetime, so a token signed for one context never
//! verifies in the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::db::Role;

/// Token type claim, distinguishing access from refresh tokens on top of
/// the separate secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by an access token. Stateless: validity is determined by
/// signature and expiry alone, never by a store lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account UUID)
    pub sub: String,
    /// Account email, when one is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account role
    pub role: Role,
    #[serde(rename = "typ")]
    pub token_kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Claims carried by a refresh token. The `jti` makes every refresh token
/// unique even when two sessions for the same account start within the
/// same second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID (unique per session grant)
    pub jti: String,
    /// Subject (account UUID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(rename = "typ")]
    pub token_kind: TokenKind,
    pub iat: u64,
    pub exp: u64,
}

/// A freshly signed token together with its timestamps.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// The compact JWT string
    pub token: String,
    /// Issued at (Unix seconds)
    pub issued_at: u64,
    /// Expiration (Unix seconds)
    pub expires_at: u64,
}

struct SigningContext {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl SigningContext {
    fn new(secret: &[u8], lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime,
        }
    }
}

/// Configuration for JWT operations. Holds both signing contexts.
pub struct JwtConfig {
    access: SigningContext,
    refresh: SigningContext,
}

impl JwtConfig {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_lifetime: Duration,
        refresh_lifetime: Duration,
    ) -> Self {
        Self {
            access: SigningContext::new(access_secret, access_lifetime),
            refresh: SigningContext::new(refresh_secret, refresh_lifetime),
        }
    }

    /// Lifetime of access tokens, in seconds.
    pub fn access_lifetime_secs(&self) -> u64 {
        self.access.lifetime.as_secs()
    }

    /// Lifetime of refresh tokens, in seconds. Used for the cookie max-age
    /// and the stored expiry of refresh-token records.
    pub fn refresh_lifetime_secs(&self) -> u64 {
        self.refresh.lifetime.as_secs()
    }

    /// Sign an access token for an account.
    pub fn sign_access_token(
        &self,
        account_uuid: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<SignedToken, JwtError> {
        let now = unix_now()?;
        let exp = now + self.access.lifetime.as_secs();

        let claims = AccessClaims {
            sub: account_uuid.to_string(),
            email: email.map(str::to_string),
            role,
            token_kind: TokenKind::Access,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(SignedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Sign a refresh token for an account.
    pub fn sign_refresh_token(
        &self,
        account_uuid: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<SignedToken, JwtError> {
        let now = unix_now()?;
        let exp = now + self.refresh.lifetime.as_secs();

        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: account_uuid.to_string(),
            email: email.map(str::to_string),
            role,
            token_kind: TokenKind::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(SignedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Verify and decode an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = verify(token, &self.access.decoding_key)?;
        if claims.token_kind != TokenKind::Access {
            return Err(JwtError::WrongTokenKind);
        }
        Ok(claims)
    }

    /// Verify and decode a refresh token.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = verify(token, &self.refresh.decoding_key)?;
        if claims.token_kind != TokenKind::Refresh {
            return Err(JwtError::WrongTokenKind);
        }
        Ok(claims)
    }
}

fn verify<T: serde::de::DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    jsonwebtoken::decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e),
        })
}

/// Decode a token's payload without any signature or expiry check.
/// Diagnostics only: the result must never feed an authorization decision.
pub fn decode_unverified(token: &str) -> Option<serde_json::Value> {
    use base64::Engine;
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Parse a duration shorthand like "15m", "7d", "1h" or "30s".
/// Unknown unit suffixes are a configuration error, not a silent fallback.
pub fn parse_duration(spec: &str) -> Result<Duration, JwtError> {
    let spec = spec.trim();
    let (value, unit) = spec.split_at(spec.len().saturating_sub(1));
    let value: u64 = value
        .parse()
        .map_err(|_| JwtError::BadDuration(spec.to_string()))?;

    let secs = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 60 * 60,
        "d" => value * 24 * 60 * 60,
        _ => return Err(JwtError::BadDuration(spec.to_string())),
    };

    Ok(Duration::from_secs(secs))
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Signature mismatch, malformed token, or wrong claim shape
    Invalid(jsonwebtoken::errors::Error),
    /// Token past its embedded expiry
    Expired,
    /// Wrong token type (e.g., a refresh token presented as an access token)
    WrongTokenKind,
    /// Unparseable duration shorthand
    BadDuration(String),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Invalid(e) => write!(f, "Invalid token: {}", e),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::WrongTokenKind => write!(f, "Wrong token type"),
            JwtError::BadDuration(s) => write!(f, "Unparseable duration: {}", s),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
