//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use jsonwebtoken::Algorithm;
use std::net::SocketAddr;
use story_tutor_core::StoryCachePolicy;
use tracing::Level;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://localhost:4173,http://localhost:80,http://localhost";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub log_format: LogFormat,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub google_client_id: String,
    pub story_cache_policy: StoryCachePolicy,
    pub words_per_batch: usize,
    pub translation_language: String,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server, Database and Logging ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:8000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let log_format = match or_default("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LOG_FORMAT".to_string(),
                    format!("'{}' is not one of pretty, json", other),
                ))
            }
        };

        // --- Generative Model ---
        let gemini_api_key = required("GEMINI_API_KEY")?;
        let gemini_api_base = or_default("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE);
        let gemini_model = or_default("GEMINI_MODEL", "gemini-1.5-flash");

        // --- Auth ---
        let jwt_secret = required("JWT_SECRET_KEY")?;
        let jwt_algorithm = match or_default("JWT_ALGORITHM", "HS256").to_ascii_uppercase().as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(ConfigError::InvalidValue(
                    "JWT_ALGORITHM".to_string(),
                    format!("'{}' is not one of HS256, HS384, HS512", other),
                ))
            }
        };
        let access_token_expire_minutes = parse_number::<i64>(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            &or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "30"),
        )?;
        let google_client_id = required("GOOGLE_CLIENT_ID")?;

        // --- Content ---
        let policy_str = or_default("STORY_CACHE_POLICY", "cache_first");
        let story_cache_policy = policy_str.parse::<StoryCachePolicy>().map_err(|e| {
            ConfigError::InvalidValue("STORY_CACHE_POLICY".to_string(), e.to_string())
        })?;
        let words_per_batch =
            parse_number::<usize>("WORDS_PER_BATCH", &or_default("WORDS_PER_BATCH", "5"))?;
        if words_per_batch == 0 {
            return Err(ConfigError::InvalidValue(
                "WORDS_PER_BATCH".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let translation_language = or_default("TRANSLATION_LANGUAGE", "Persian");

        let cors_origins = or_default("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            log_format,
            gemini_api_key,
            gemini_api_base,
            gemini_model,
            jwt_secret,
            jwt_algorithm,
            access_token_expire_minutes,
            google_client_id,
            story_cache_policy,
            words_per_batch,
            translation_language,
            cors_origins,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
