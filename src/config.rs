//! Configuration loader for the `canal-monitor` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing else in the crate calls `env::var`.
//!
use std::env;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Default sender address when `MAIL_FROM` is not set.
const DEFAULT_MAIL_FROM: &str = "noreply@canal-monitor.local";

/// Default recipient of HIGH alerts when `ALERT_RECIPIENT` is not set.
const DEFAULT_ALERT_RECIPIENT: &str = "admin@canal-monitor.local";

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default verification code lifetime in minutes.
const DEFAULT_CODE_TTL_MINUTES: u32 = 30;

/// Where readings are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL through a sqlx pool.
    Postgres { db_url: String, pool_max: u32 },
    /// Process memory; contents are lost on restart.
    Memory,
}

/// Backend names accepted by `READING_STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    Postgres,
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "memory" => Ok(BackendKind::Memory),
            other => bail!("Invalid READING_STORE: {other:?} (expected postgres or memory)"),
        }
    }
}

/// SMTP relay settings. Absent when `SMTP_HOST` is unset.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Reading persistence backend.
    pub store: StoreBackend,

    /// TCP port the HTTP server listens on.
    pub port: u16,

    /// SMTP relay; `None` means mail is only logged.
    pub smtp: Option<SmtpConfig>,

    /// Sender address of every outgoing message.
    pub mail_from: String,

    /// Fixed recipient of HIGH alert notifications.
    pub alert_recipient: String,

    /// Lifetime of an issued verification code, in minutes.
    pub code_ttl_minutes: u32,

    /// Number of demo readings to ensure at startup (0 disables seeding).
    pub seed_readings: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string (postgres store only)
///
/// Optional:
/// - `READING_STORE` – `postgres` or `memory` (default: postgres)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `APP_PORT` – listen port (default: 8080)
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASSWORD` – mail relay
/// - `MAIL_FROM`, `ALERT_RECIPIENT` – mail addresses
/// - `VERIFICATION_CODE_TTL_MINUTES` – code expiry (default: 30)
/// - `SEED_READINGS` – demo rows to ensure at startup (default: 0)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let kind = match env::var("READING_STORE") {
        Ok(v) => v.parse::<BackendKind>()?,
        Err(_) => BackendKind::Postgres,
    };
    let store = match kind {
        BackendKind::Postgres => StoreBackend::Postgres {
            db_url: require_env!("DATABASE_URL"),
            pool_max: parse_env!("DB_POOL_MAX", u32, 5),
        },
        BackendKind::Memory => StoreBackend::Memory,
    };

    let smtp = match env::var("SMTP_HOST") {
        Ok(host) => Some(SmtpConfig {
            host,
            port: parse_env!("SMTP_PORT", u16, DEFAULT_SMTP_PORT),
            user: env::var("SMTP_USER").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
        }),
        Err(_) => None,
    };

    let code_ttl_minutes = parse_env!(
        "VERIFICATION_CODE_TTL_MINUTES",
        u32,
        DEFAULT_CODE_TTL_MINUTES
    );
    if code_ttl_minutes == 0 {
        bail!("VERIFICATION_CODE_TTL_MINUTES must be at least 1");
    }

    Ok(Config {
        store,
        port: parse_env!("APP_PORT", u16, 8080),
        smtp,
        mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_string()),
        alert_recipient: env::var("ALERT_RECIPIENT")
            .unwrap_or_else(|_| DEFAULT_ALERT_RECIPIENT.to_string()),
        code_ttl_minutes,
        seed_readings: parse_env!("SEED_READINGS", u32, 0),
    })
}

/// Mask the password portion of a connection URL.
fn mask_db_url(db_url: &str) -> String {
    // ---
    let creds_start = db_url.find("://").map_or(0, |p| p + 3);
    if let Some(at_pos) = db_url.rfind('@').filter(|&p| p > creds_start) {
        if let Some(colon_pos) = db_url[creds_start..at_pos].rfind(':') {
            let colon_pos = creds_start + colon_pos;
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database and SMTP passwords.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        match &self.store {
            StoreBackend::Postgres { db_url, pool_max } => {
                tracing::info!("  READING_STORE   : postgres");
                tracing::info!("  DATABASE_URL    : {}", mask_db_url(db_url));
                tracing::info!("  DB_POOL_MAX     : {}", pool_max);
            }
            StoreBackend::Memory => tracing::info!("  READING_STORE   : memory"),
        }
        tracing::info!("  APP_PORT        : {}", self.port);
        match &self.smtp {
            Some(smtp) => tracing::info!(
                "  SMTP            : {}:{} (user: {}, password: {})",
                smtp.host,
                smtp.port,
                smtp.user.as_deref().unwrap_or("-"),
                if smtp.password.is_some() { "****" } else { "-" }
            ),
            None => tracing::info!("  SMTP            : not configured, mail is logged only"),
        }
        tracing::info!("  MAIL_FROM       : {}", self.mail_from);
        tracing::info!("  ALERT_RECIPIENT : {}", self.alert_recipient);
        tracing::info!("  CODE_TTL_MINUTES: {}", self.code_ttl_minutes);
        tracing::info!("  SEED_READINGS   : {}", self.seed_readings);
    }
}
