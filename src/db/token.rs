//! Refresh token storage.
//!
//! Only refresh tokens are persisted; access tokens are stateless. A record
//! is usable iff it is not revoked and not past its expiry. Revocation is a
//! flag rather than a row deletion, so a revoked grant stays auditable until
//! the expiry sweep removes it.

use sqlx::sqlite::SqlitePool;

/// A single long-lived session grant.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub account_id: i64,
    pub token: String,
    pub expires_at: String,
    pub revoked: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    account_id: i64,
    token: String,
    expires_at: String,
    revoked: i32,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: String,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            token: row.token,
            expires_at: row.expires_at,
            revoked: row.revoked != 0,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            created_at: row.created_at,
        }
    }
}

const TOKEN_COLUMNS: &str =
    "id, account_id, token, expires_at, revoked, user_agent, ip_address, created_at";

/// Store for refresh token records.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a refresh token record with its session metadata.
    pub async fn create(
        &self,
        account_id: i64,
        token: &str,
        expires_at: u64,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let expires_at_str = timestamp_to_datetime(expires_at);

        let result = sqlx::query(
            "INSERT INTO refresh_tokens (account_id, token, expires_at, user_agent, ip_address)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(token)
        .bind(&expires_at_str)
        .bind(user_agent)
        .bind(ip_address)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Look up a token by its value. Revoked records are filtered out here;
    /// a revoked token is indistinguishable from an absent one.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token = ? AND revoked = 0"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    /// Revoke a single token by value.
    pub async fn revoke(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every non-revoked token of an account ("sign out everywhere").
    pub async fn revoke_all_for_account(&self, account_id: i64) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE account_id = ? AND revoked = 0")
                .bind(account_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// List the usable (non-revoked, unexpired) session grants of an account.
    pub async fn list_active_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<RefreshTokenRecord>, sqlx::Error> {
        let rows: Vec<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens
             WHERE account_id = ? AND revoked = 0 AND expires_at >= datetime('now')
             ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RefreshTokenRecord::from).collect())
    }

    /// Delete all expired records, revoked or not.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Convert a Unix timestamp to an ISO 8601 datetime string for SQLite.
fn timestamp_to_datetime(timestamp: u64) -> String {
    let days_since_epoch = timestamp / 86400;
    let time_of_day = timestamp % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = days_to_ymd(days_since_epoch as i64);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, month, day, hours, minutes, seconds
    )
}

/// Convert days since Unix epoch to year, month, day.
fn days_to_ymd(days: i64) -> (i32, u32, u32) {
    // Algorithm from http://howardhinnant.github.io/date_algorithms.html
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as i32, m, d)
}
