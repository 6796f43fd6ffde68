//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, NewAccount, Role};
use crate::jwt::parse_duration;
use crate::password::{self, PasswordHasher};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

/// Bootstrap admin identity, created by `--create-admin`.
const ADMIN_EMAIL: &str = "admin@bkbs.com";
const ADMIN_EMPLOYEE_ID: &str = "ADMIN001";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bkbs-admin",
    about = "BKBS benefit-card administration backend"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5003")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "bkbs-admin.db")]
    pub database: String,

    /// Access token lifetime (e.g. "15m", "1h")
    #[arg(long, default_value = "15m")]
    pub access_expire: String,

    /// Refresh token lifetime (e.g. "7d")
    #[arg(long, default_value = "7d")]
    pub refresh_expire: String,

    /// Path to file containing the access token secret.
    /// Prefer using the JWT_ACCESS_SECRET env var instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret.
    /// Prefer using the JWT_REFRESH_SECRET env var instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// bcrypt cost factor for password hashing
    #[arg(long, default_value_t = password::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Set the Secure flag on cookies (use behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Create the initial admin account on startup and print its password
    #[arg(long)]
    pub create_admin: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a signing secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking.
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or use a secret file",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Parse a token lifetime argument, logging an error on bad input.
/// Unknown unit suffixes fail here instead of producing a wrong expiry.
pub fn parse_expiry(name: &str, spec: &str) -> Option<Duration> {
    match parse_duration(spec) {
        Ok(duration) => Some(duration),
        Err(e) => {
            error!(setting = %name, value = %spec, error = %e, "Invalid token lifetime");
            None
        }
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Handle the --create-admin flag: create the bootstrap admin account with a
/// generated password, or report the existing one. Idempotent.
pub async fn handle_create_admin(db: &Database, hasher: &PasswordHasher) {
    match db.accounts().find_by_email(ADMIN_EMAIL).await {
        Ok(Some(_)) => {
            println!();
            println!("Admin account already exists: {}", ADMIN_EMAIL);
            println!();
        }
        Ok(None) => {
            use rand::distr::{Alphanumeric, SampleString};
            let password = Alphanumeric.sample_string(&mut rand::rng(), 20);

            let password_hash = match hasher.hash(&password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            let admin = NewAccount {
                uuid: uuid::Uuid::new_v4().to_string(),
                name: "Admin User".to_string(),
                role: Role::Admin,
                is_admin: true,
                employee_id: Some(ADMIN_EMPLOYEE_ID.to_string()),
                email: Some(ADMIN_EMAIL.to_string()),
                password_hash,
            };

            match db.accounts().create(&admin).await {
                Ok(_) => {
                    println!();
                    println!("Admin account created: {}", ADMIN_EMAIL);
                    println!("Password: {}", password);
                    println!("Store this password now; it is not shown again.");
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin account");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    access_expire: Duration,
    refresh_expire: Duration,
    bcrypt_cost: u32,
    secure_cookies: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret,
        refresh_secret,
        access_expire,
        refresh_expire,
        bcrypt_cost,
        secure_cookies,
    }
}
