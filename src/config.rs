//! Configuration for mapsurvey
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

use crate::auth::JwtValidator;
use crate::types::SurveyError;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Process-local maps; data is lost on restart
    Memory,
    /// MongoDB
    Mongo,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// mapsurvey - questionnaire and geotagged record backend
#[derive(Parser, Debug, Clone)]
#[command(name = "mapsurvey")]
#[command(about = "Questionnaire backend with record merge and nearby matching")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Storage backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value = "memory")]
    pub store: StoreBackend,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "mapsurvey")]
    pub mongodb_db: String,

    /// Secret for signing access tokens (required unless dev mode)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "1800")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (built-in insecure JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Search radius used when a nearby request omits `distance_m`
    #[arg(long, env = "DEFAULT_NEARBY_DISTANCE_M", default_value = "500")]
    pub default_nearby_distance_m: f64,

    /// Default and maximum page size for list endpoints
    #[arg(long, env = "MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: usize,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.max_page_size == 0 {
            return Err("MAX_PAGE_SIZE must be greater than zero".to_string());
        }

        if self.default_nearby_distance_m.is_nan() || self.default_nearby_distance_m <= 0.0 {
            return Err("DEFAULT_NEARBY_DISTANCE_M must be positive".to_string());
        }

        Ok(())
    }

    /// Token issuer/validator for this configuration.
    ///
    /// An explicit secret always wins; dev mode falls back to a fixed one.
    pub fn jwt_validator(&self) -> Result<JwtValidator, SurveyError> {
        match &self.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            None if self.dev_mode => Ok(JwtValidator::new_dev(self.jwt_expiry_seconds)),
            None => Err(SurveyError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["mapsurvey", "--dev-mode"]);
        assert_eq!(args.jwt_expiry_seconds, 1800);
        assert_eq!(args.max_page_size, 100);
        assert_eq!(args.default_nearby_distance_m, 500.0);
        assert!(args.validate().is_ok());
        assert!(args.jwt_validator().is_ok());
    }

    #[test]
    fn test_secret_required_outside_dev_mode() {
        let mut args = Args::parse_from(["mapsurvey", "--dev-mode"]);
        args.dev_mode = false;
        args.jwt_secret = None;
        assert!(args.validate().is_err());
        assert!(args.jwt_validator().is_err());

        args.jwt_secret = Some("a-production-secret-with-at-least-32-chars".into());
        assert!(args.validate().is_ok());
        assert!(args.jwt_validator().is_ok());
    }

    #[test]
    fn test_rejects_bad_limits() {
        let mut args = Args::parse_from(["mapsurvey", "--dev-mode"]);
        args.max_page_size = 0;
        assert!(args.validate().is_err());

        let mut args = Args::parse_from(["mapsurvey", "--dev-mode"]);
        args.default_nearby_distance_m = 0.0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_store_backend_flag() {
        let args = Args::parse_from(["mapsurvey", "--dev-mode", "--store", "mongo"]);
        assert_eq!(args.store, StoreBackend::Mongo);
    }
}
