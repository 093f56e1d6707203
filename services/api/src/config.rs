//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{Duration, FixedOffset};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

use doctor_finder_core::booking::DEFAULT_CLINIC_UTC_OFFSET_SECS;
use doctor_finder_core::otp::{DEFAULT_OTP_TTL_SECS, DEFAULT_RESEND_COOLDOWN_SECS};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the SMS gateway.
#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Endpoint and template identifiers for the email relay.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub service_id: String,
    pub user_id: String,
    pub otp_template_id: String,
    pub acceptance_template_id: String,
}

/// Timing knobs for verification codes and the cleanup jobs.
#[derive(Clone, Debug)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub resend_cooldown: Duration,
    /// How recent a verification must be for signup to accept it.
    pub verification_window: Duration,
    pub sweep_interval: std::time::Duration,
    pub email_queue_sweep_interval: std::time::Duration,
    pub email_queue_retention: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS),
            resend_cooldown: Duration::seconds(DEFAULT_RESEND_COOLDOWN_SECS),
            verification_window: Duration::minutes(30),
            sweep_interval: std::time::Duration::from_secs(60 * 60),
            email_queue_sweep_interval: std::time::Duration::from_secs(24 * 60 * 60),
            email_queue_retention: Duration::hours(24),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub assistant_model: String,
    pub sms: SmsConfig,
    pub email: EmailConfig,
    pub otp: OtpPolicy,
    pub clinic_offset: FixedOffset,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn positive_secs(name: &str, default: i64) -> Result<i64, ConfigError> {
    let secs = parsed_or(name, default)?;
    if secs <= 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' must be a positive number of seconds", secs),
        ));
    }
    Ok(secs)
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = or_default("CORS_ORIGIN", "http://localhost:8081");

        // --- Assistant (optional: the chat answers with a notice when unset) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let assistant_model = or_default("ASSISTANT_MODEL", "gpt-4o-mini");

        // --- Notification relays ---
        let sms = SmsConfig {
            api_base: or_default("SMS_API_BASE", "https://api.twilio.com"),
            account_sid: required("SMS_ACCOUNT_SID")?,
            auth_token: required("SMS_AUTH_TOKEN")?,
            from_number: required("SMS_FROM_NUMBER")?,
        };

        let email = EmailConfig {
            api_url: or_default("EMAIL_API_URL", "https://api.emailjs.com/api/v1.0/email/send"),
            service_id: required("EMAIL_SERVICE_ID")?,
            user_id: required("EMAIL_USER_ID")?,
            otp_template_id: required("EMAIL_OTP_TEMPLATE_ID")?,
            acceptance_template_id: required("EMAIL_ACCEPTANCE_TEMPLATE_ID")?,
        };

        // --- OTP lifecycle and cleanup schedule ---
        let defaults = OtpPolicy::default();
        let otp = OtpPolicy {
            ttl: Duration::seconds(positive_secs("OTP_TTL_SECS", DEFAULT_OTP_TTL_SECS)?),
            resend_cooldown: Duration::seconds(positive_secs(
                "OTP_RESEND_COOLDOWN_SECS",
                DEFAULT_RESEND_COOLDOWN_SECS,
            )?),
            verification_window: defaults.verification_window,
            sweep_interval: std::time::Duration::from_secs(
                positive_secs("OTP_SWEEP_INTERVAL_SECS", 60 * 60)? as u64,
            ),
            email_queue_sweep_interval: std::time::Duration::from_secs(
                positive_secs("EMAIL_QUEUE_SWEEP_INTERVAL_SECS", 24 * 60 * 60)? as u64,
            ),
            email_queue_retention: Duration::hours(positive_secs(
                "EMAIL_QUEUE_RETENTION_HOURS",
                24,
            )?),
        };

        let offset_minutes = parsed_or(
            "CLINIC_UTC_OFFSET_MINUTES",
            DEFAULT_CLINIC_UTC_OFFSET_SECS / 60,
        )?;
        let clinic_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CLINIC_UTC_OFFSET_MINUTES".to_string(),
                    format!("'{}' is not a valid UTC offset", offset_minutes),
                )
            })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openai_api_key,
            assistant_model,
            sms,
            email,
            otp,
            clinic_offset,
        })
    }
}
