//! Configuration module for the DevCamper backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! The resulting [`Config`] is built once at startup and shared through `AppState`.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::AppError;

const ENV_PREFIX: &str = "DEVCAMPER_";

/// SMTP settings. Present only when a relay host is configured.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Geocoding provider settings.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Base URL of the MapQuest-compatible address endpoint
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory served as static files; photos go to `images/` below it
    pub public_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Secret used to sign session tokens. `None` means a per-process secret.
    pub jwt_secret: Option<String>,
    pub jwt_expire_days: i64,
    pub cookie_expire_days: i64,
    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,
    /// Externally visible base URL, used in password-reset links
    pub public_url: String,
    pub max_upload_bytes: usize,
    pub mail_from: String,
    pub smtp: Option<SmtpConfig>,
    pub geocoder: GeocoderConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let bind_addr = parse_var("BIND_ADDR", "127.0.0.1:5000")?;
        let db_path = string_var("DB_PATH", "./data/devcamper.sqlite").into();
        let public_dir = string_var("PUBLIC_DIR", "./public").into();
        let log_level = string_var("LOG_LEVEL", "info");
        let jwt_secret = optional_var("JWT_SECRET");
        let jwt_expire_days = parse_var("JWT_EXPIRE_DAYS", "30")?;
        let cookie_expire_days = parse_var("COOKIE_EXPIRE_DAYS", "30")?;
        let bcrypt_cost = parse_var("BCRYPT_COST", "10")?;
        let public_url = string_var("PUBLIC_URL", "http://localhost:5000");
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", "1000000")?;
        let mail_from = string_var("MAIL_FROM", "DevCamper <noreply@devcamper.io>");

        let smtp = match optional_var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_var("SMTP_PORT", "587")?,
                username: optional_var("SMTP_USER"),
                password: optional_var("SMTP_PASS"),
            }),
            None => None,
        };

        let geocoder = GeocoderConfig {
            url: string_var(
                "GEOCODER_URL",
                "https://www.mapquestapi.com/geocoding/v1/address",
            ),
            api_key: optional_var("GEOCODER_API_KEY"),
            timeout: Duration::from_secs(parse_var("GEOCODER_TIMEOUT_SECS", "10")?),
        };

        Ok(Self {
            bind_addr,
            db_path,
            public_dir,
            log_level,
            jwt_secret,
            jwt_expire_days,
            cookie_expire_days,
            bcrypt_cost,
            public_url,
            max_upload_bytes,
            mail_from,
            smtp,
            geocoder,
        })
    }

    /// Directory where uploaded bootcamp photos are stored.
    pub fn image_dir(&self) -> PathBuf {
        self.public_dir.join("images")
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn string_var(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = string_var(name, default);
    raw.parse().map_err(|e| {
        AppError::Internal(format!("Invalid {ENV_PREFIX}{name} value {raw:?}: {e}"))
    })
}
