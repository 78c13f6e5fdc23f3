//! Server configuration module.
//!
//! This module provides configuration loading for the gateway from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`: Shared secret used to sign access tokens (login is refused while unset)
//! - `JWT_ALGORITHM`: Token signing algorithm, one of `HS256`, `HS384`, `HS512` (default: `HS256`)
//! - `ACCESS_TOKEN_EXPIRES_MINUTES`: Access token lifetime in minutes (default: `30`)
//! - `DATABASE_URL`: Credential store location (required). `postgres://` and
//!   `postgresql://` URLs select the Postgres store, `memory:` an in-memory store.
//! - `DB_FALLBACK_PORT_OVERRIDE` / `POSTGRES_PORT`: Port replacing the one in a Postgres `DATABASE_URL`
//! - `LISTEN_HOST`: Address to bind (default: `127.0.0.1`)
//! - `LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `CORS_ALLOW_ORIGINS`: Comma-separated list of allowed origins (default: `*`)
//!
//! # Invariants
//!
//! - `access_token_ttl` is always strictly positive
//! - `database_url` is never empty
//! - `jwt_config`, when present, holds a non-empty secret

use std::net::IpAddr;
use std::time::Duration;

use crate::auth::{JwtAlgorithm, JwtConfig};

/// Server configuration.
///
/// Built once at startup and shared read-only between requests.
///
/// # Post-conditions
///
/// - `access_token_ttl` is at least one minute
/// - `cors_allow_origins` is never empty
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Token signing configuration. `None` when no secret is configured.
    pub jwt_config: Option<JwtConfig>,
    /// Lifetime of issued access tokens.
    pub access_token_ttl: Duration,
    /// Location of the credential store.
    pub database_url: String,
    /// Port replacing the one in a Postgres `database_url`.
    pub database_port_override: Option<u16>,
    /// Address to bind the HTTP listener to.
    pub listen_host: IpAddr,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Origins allowed by the CORS layer. `*` allows any origin.
    pub cors_allow_origins: Vec<String>,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default bind address.
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    /// Default access token lifetime in minutes.
    pub const DEFAULT_TOKEN_EXPIRES_MINUTES: u64 = 30;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is not set or is empty
    /// - any optional variable is set to a value that cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `from_env` delegates here; tests pass a map instead of touching the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_config = Self::load_jwt_config(&lookup)?;
        let access_token_ttl = Self::load_access_token_ttl(&lookup)?;
        let database_url = Self::load_database_url(&lookup)?;
        let database_port_override = Self::load_port_override(&lookup)?;
        let listen_host = Self::load_listen_host(&lookup)?;
        let listen_port = Self::load_listen_port(&lookup)?;
        let cors_allow_origins = Self::load_cors_origins(&lookup);

        Ok(Self {
            jwt_config,
            access_token_ttl,
            database_url,
            database_port_override,
            listen_host,
            listen_port,
            cors_allow_origins,
        })
    }

    /// Load the signing configuration.
    ///
    /// The algorithm is validated even when no secret is set so that a typo
    /// is reported at startup rather than hidden until a secret appears.
    fn load_jwt_config(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Option<JwtConfig>, ConfigError> {
        let algorithm = match lookup("JWT_ALGORITHM") {
            Some(value) => value
                .parse::<JwtAlgorithm>()
                .map_err(|e| ConfigError::InvalidValue {
                    name: "JWT_ALGORITHM".to_string(),
                    message: e.to_string(),
                })?,
            None => JwtAlgorithm::default(),
        };

        match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => {
                let config = JwtConfig::new(algorithm, secret.into_bytes()).map_err(|e| {
                    ConfigError::InvalidValue {
                        name: "JWT_SECRET".to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Some(config))
            }
            _ => Ok(None),
        }
    }

    fn load_access_token_ttl(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Duration, ConfigError> {
        let minutes = match lookup("ACCESS_TOKEN_EXPIRES_MINUTES") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "ACCESS_TOKEN_EXPIRES_MINUTES".to_string(),
                        message: format!("'{value}' is not a positive number of minutes"),
                    });
                }
            },
            None => Self::DEFAULT_TOKEN_EXPIRES_MINUTES,
        };
        Ok(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Load the credential store URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set or is empty.
    fn load_database_url(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        let url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        if url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "DATABASE_URL".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(url.trim().to_string())
    }

    /// `DB_FALLBACK_PORT_OVERRIDE` wins over `POSTGRES_PORT`.
    fn load_port_override(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Option<u16>, ConfigError> {
        for name in ["DB_FALLBACK_PORT_OVERRIDE", "POSTGRES_PORT"] {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                return parse_port(name, &value).map(Some);
            }
        }
        Ok(None)
    }

    fn load_listen_host(lookup: &impl Fn(&str) -> Option<String>) -> Result<IpAddr, ConfigError> {
        let value = lookup("LISTEN_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        value
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "LISTEN_HOST".to_string(),
                message: format!("'{value}' is not a valid IP address"),
            })
    }

    /// Load the listen port.
    ///
    /// Returns the default if not set.
    fn load_listen_port(lookup: &impl Fn(&str) -> Option<String>) -> Result<u16, ConfigError> {
        match lookup("LISTEN_PORT") {
            Some(value) => parse_port("LISTEN_PORT", &value),
            None => Ok(Self::DEFAULT_PORT),
        }
    }

    fn load_cors_origins(lookup: &impl Fn(&str) -> Option<String>) -> Vec<String> {
        let origins: Vec<String> = lookup("CORS_ALLOW_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect();

        if origins.is_empty() {
            vec!["*".to_string()]
        } else {
            origins
        }
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16, ConfigError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a valid port number (must be 1-65535)"),
        }),
    }
}
