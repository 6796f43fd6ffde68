use sqlx::sqlite::SqlitePool;

/// Account role for authorization. Checked by set membership, no hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Moderator,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Employee => "employee",
        }
    }

    /// Strict parse for request input.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "moderator" => Some(Role::Moderator),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }

    /// Lenient parse for database reads.
    pub fn from_str(s: &str) -> Self {
        Self::parse(s).unwrap_or(Role::User)
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub role: Role,
    pub is_admin: bool,
    pub employee_id: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_deleted: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    /// Public view of the account. The password hash has no field here, so
    /// it cannot leak into a serialized response.
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            role: self.role,
            is_admin: self.is_admin,
            employee_id: self.employee_id.clone(),
            email: self.email.clone(),
            last_login: self.last_login.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Serialized account shape for API responses.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub uuid: String,
    pub name: String,
    pub role: Role,
    pub is_admin: bool,
    pub employee_id: Option<String>,
    pub email: Option<String>,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Explicit allow-list for account creation. Callers construct this field
/// by field; there is no generic update payload to scrub.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub uuid: String,
    pub name: String,
    pub role: Role,
    pub is_admin: bool,
    pub employee_id: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    uuid: String,
    name: String,
    role: String,
    is_admin: i32,
    employee_id: Option<String>,
    email: Option<String>,
    password_hash: String,
    is_deleted: i32,
    last_login: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            name: row.name,
            role: Role::from_str(&row.role),
            is_admin: row.is_admin != 0,
            employee_id: row.employee_id,
            email: row.email,
            password_hash: row.password_hash,
            is_deleted: row.is_deleted != 0,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "id, uuid, name, role, is_admin, employee_id, email, \
     password_hash, is_deleted, last_login, created_at, updated_at";

/// Store for account records. Finders do not filter soft-deleted rows;
/// callers decide how a deleted account is treated.
#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account. Returns the row ID.
    pub async fn create(&self, account: &NewAccount) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO accounts (uuid, name, role, is_admin, employee_id, email, password_hash)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.uuid)
        .bind(&account.name)
        .bind(account.role.as_str())
        .bind(account.is_admin as i32)
        .bind(&account.employee_id)
        .bind(account.email.as_deref().map(|e| e.to_lowercase()))
        .bind(&account.password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    pub async fn find_by_uuid(&self, uuid: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE uuid = ?"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    pub async fn find_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE employee_id = ?"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Single lookup path for login: the identifier may be an email or an
    /// employee ID, whichever matches.
    pub async fn find_by_email_or_employee_id(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1 OR employee_id = ?2"
        ))
        .bind(identifier.to_lowercase())
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Stamp the last successful login.
    pub async fn update_last_login(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET last_login = datetime('now'), updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark an account logically deleted. The row persists; authentication
    /// treats the account as nonexistent-but-known (403, not 401).
    pub async fn soft_delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET is_deleted = 1, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Generate the next employee ID in the EMP-NNNNN sequence.
    pub async fn next_employee_id(&self) -> Result<String, sqlx::Error> {
        let max: (Option<i64>,) = sqlx::query_as(
            "SELECT MAX(CAST(SUBSTR(employee_id, 5) AS INTEGER)) FROM accounts
             WHERE employee_id LIKE 'EMP-%'",
        )
        .fetch_one(&self.pool)
        .await?;

        let mut next = max.0.unwrap_or(0) + 1;
        loop {
            let candidate = format!("EMP-{:05}", next);
            if self.find_by_employee_id(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            next += 1;
        }
    }
}
