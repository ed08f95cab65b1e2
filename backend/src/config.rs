//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Seconds in a day, used to turn `RETENTION_DAYS` into a sweep threshold.
const SECS_PER_DAY: u64 = 86_400;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Directory holding merged artifacts
    pub storage_path: String,

    /// The single administrator identity allowed to log in
    pub admin_username: String,

    /// Administrator credential, hashed once when the auth service starts
    pub admin_password: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token expiry in minutes
    pub jwt_access_token_expiry_minutes: i64,

    /// Artifacts older than this many days are removed by the retention sweep
    pub retention_days: u64,

    /// When set, the retention sweep also runs on this interval
    pub retention_sweep_interval_secs: Option<u64>,

    /// Login attempts allowed per client IP per minute
    pub login_rate_limit_per_minute: u32,
}

redacted_debug!(Config {
    redact database_url,
    show bind_address,
    show storage_path,
    show admin_username,
    redact admin_password,
    redact jwt_secret,
    show jwt_access_token_expiry_minutes,
    show retention_days,
    show retention_sweep_interval_secs,
    show login_rate_limit_per_minute,
});

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .or_else(|_| env::var("SECRET_KEY"))
            .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "/tmp/merged".into()),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "password".into()),
            jwt_secret,
            jwt_access_token_expiry_minutes: env::var("JWT_ACCESS_TOKEN_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "480".into())
                .parse()
                .unwrap_or(480),
            retention_days: env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            retention_sweep_interval_secs: env::var("RETENTION_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0),
            login_rate_limit_per_minute: env::var("LOGIN_RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
        })
    }

    /// Age in seconds after which the retention sweep deletes an artifact.
    pub fn retention_threshold_secs(&self) -> u64 {
        self.retention_days.saturating_mul(SECS_PER_DAY)
    }

    /// Configuration suitable for unit tests; no environment is read.
    pub fn for_tests(storage_path: impl Into<String>) -> Self {
        Self {
            database_url: "postgresql://localhost/evidence_test".into(),
            bind_address: "127.0.0.1:0".into(),
            storage_path: storage_path.into(),
            admin_username: "admin".into(),
            admin_password: "password".into(),
            jwt_secret: "test-secret".into(),
            jwt_access_token_expiry_minutes: 30,
            retention_days: 30,
            retention_sweep_interval_secs: None,
            login_rate_limit_per_minute: 30,
        }
    }
}
