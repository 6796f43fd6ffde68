//! Session lifecycle: registration, login, token refresh, logout.
//!
//! A session starts as an access/refresh token pair minted at login or
//! registration. The access token authenticates requests statelessly until
//! it expires; the refresh token is the only revocation control point and
//! must survive a store lookup before it can mint a replacement access
//! token. Logout revokes one grant, logout-all revokes every grant of an
//! account.

use std::sync::Arc;

use tracing::info;

use crate::db::{Account, AccountProfile, Database, NewAccount, Role};
use crate::error::{ApiError, ResultExt};
use crate::jwt::JwtConfig;
use crate::password::PasswordHasher;

/// Request metadata recorded with each session grant.
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Validated registration input, constructed field by field by the handler.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub role: Role,
    pub is_admin: bool,
    pub employee_id: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// A freshly minted token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful registration or login.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub account: AccountProfile,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionService {
    db: Database,
    jwt: Arc<JwtConfig>,
    hasher: PasswordHasher,
}

impl SessionService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, hasher: PasswordHasher) -> Self {
        Self { db, jwt, hasher }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Register a new account and immediately open a session for it.
    ///
    /// Email uniqueness is enforced against every existing row, soft-deleted
    /// or not. A missing employee ID is generated from the EMP-NNNNN
    /// sequence.
    pub async fn register(
        &self,
        registration: Registration,
        metadata: SessionMetadata,
    ) -> Result<AuthenticatedSession, ApiError> {
        let accounts = self.db.accounts();

        if let Some(email) = &registration.email {
            let existing = accounts
                .find_by_email(email)
                .await
                .db_err("Failed to check email")?;
            if existing.is_some() {
                return Err(ApiError::conflict("User with this email already exists"));
            }
        }

        let employee_id = match &registration.employee_id {
            Some(employee_id) => {
                let existing = accounts
                    .find_by_employee_id(employee_id)
                    .await
                    .db_err("Failed to check employee ID")?;
                if existing.is_some() {
                    return Err(ApiError::conflict("Employee ID already exists"));
                }
                employee_id.clone()
            }
            None => accounts
                .next_employee_id()
                .await
                .db_err("Failed to generate employee ID")?,
        };

        let password_hash = self
            .hasher
            .hash(&registration.password)
            .crypto_err("Failed to hash password")?;

        let new_account = NewAccount {
            uuid: uuid::Uuid::new_v4().to_string(),
            name: registration.name,
            role: registration.role,
            is_admin: registration.is_admin,
            employee_id: Some(employee_id),
            email: registration.email,
            password_hash,
        };

        let id = accounts
            .create(&new_account)
            .await
            .db_err("Failed to create account")?;
        let account = accounts
            .find_by_id(id)
            .await
            .db_err("Failed to load account")?
            .ok_or_else(|| ApiError::internal("Account vanished after creation"))?;

        let tokens = self.generate_tokens(&account, &metadata).await?;

        info!(uuid = %account.uuid, "Account registered");

        Ok(AuthenticatedSession {
            account: account.profile(),
            tokens,
        })
    }

    /// Authenticate by email or employee ID plus password.
    ///
    /// An unknown identifier and a wrong password produce the identical
    /// `Unauthorized` error, so callers cannot enumerate accounts. A
    /// soft-deleted account is `Forbidden` even with the correct password.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        metadata: SessionMetadata,
    ) -> Result<AuthenticatedSession, ApiError> {
        let accounts = self.db.accounts();

        let account = accounts
            .find_by_email_or_employee_id(identifier)
            .await
            .db_err("Failed to look up account")?
            .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

        if account.is_deleted {
            return Err(ApiError::forbidden("Account has been deleted"));
        }

        let valid = self
            .hasher
            .verify(password, &account.password_hash)
            .crypto_err("Failed to verify password")?;
        if !valid {
            return Err(ApiError::unauthorized("Invalid credentials"));
        }

        accounts
            .update_last_login(account.id)
            .await
            .db_err("Failed to stamp last login")?;

        let tokens = self.generate_tokens(&account, &metadata).await?;

        info!(uuid = %account.uuid, "Login");

        Ok(AuthenticatedSession {
            account: account.profile(),
            tokens,
        })
    }

    /// Mint an access/refresh pair and persist the refresh grant.
    ///
    /// This is the single place a session grant is created: once per login
    /// or registration, never from refresh.
    pub async fn generate_tokens(
        &self,
        account: &Account,
        metadata: &SessionMetadata,
    ) -> Result<TokenPair, ApiError> {
        let access = self
            .jwt
            .sign_access_token(&account.uuid, account.email.as_deref(), account.role)
            .crypto_err("Failed to sign access token")?;
        let refresh = self
            .jwt
            .sign_refresh_token(&account.uuid, account.email.as_deref(), account.role)
            .crypto_err("Failed to sign refresh token")?;

        self.db
            .refresh_tokens()
            .create(
                account.id,
                &refresh.token,
                refresh.expires_at,
                metadata.user_agent.as_deref(),
                metadata.ip_address.as_deref(),
            )
            .await
            .db_err("Failed to persist refresh token")?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The token must pass signature and expiry verification AND still have
    /// a live store record: a cryptographically valid token that has been
    /// revoked is rejected, revocation always wins. The refresh token itself
    /// is not rotated.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let claims = self
            .jwt
            .verify_refresh_token(refresh_token)
            .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;

        self.db
            .refresh_tokens()
            .find_by_token(refresh_token)
            .await
            .db_err("Failed to look up refresh token")?
            .ok_or_else(|| {
                ApiError::unauthorized("Refresh token not found or has been revoked")
            })?;

        // Re-fetch the account fresh: role changes and soft deletion must
        // take effect on the next refresh, not at natural expiry.
        let account = self.validate_user(&claims.sub).await?;

        let access = self
            .jwt
            .sign_access_token(&account.uuid, account.email.as_deref(), account.role)
            .crypto_err("Failed to sign access token")?;

        Ok(access.token)
    }

    /// Revoke a single session grant. A missing token is not an error.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), ApiError> {
        if let Some(token) = refresh_token {
            self.db
                .refresh_tokens()
                .revoke(token)
                .await
                .db_err("Failed to revoke refresh token")?;
        }
        Ok(())
    }

    /// Revoke every session grant of an account. Returns the revoked count.
    pub async fn logout_all(&self, account_id: i64) -> Result<u64, ApiError> {
        let revoked = self
            .db
            .refresh_tokens()
            .revoke_all_for_account(account_id)
            .await
            .db_err("Failed to revoke refresh tokens")?;

        info!(account_id, revoked, "Logged out everywhere");
        Ok(revoked)
    }

    /// Trust-boundary check: the account must exist and not be soft-deleted.
    /// Reused by the auth guard and by `me`.
    pub async fn validate_user(&self, account_uuid: &str) -> Result<Account, ApiError> {
        let account = self
            .db
            .accounts()
            .find_by_uuid(account_uuid)
            .await
            .db_err("Failed to look up account")?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if account.is_deleted {
            return Err(ApiError::forbidden("Account has been deleted"));
        }

        Ok(account)
    }
}
