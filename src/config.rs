// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

/// Days a board stays live after its predecessor expires.
pub const DEFAULT_BOARD_EXTENSION_DAYS: i64 = 90;

/// Which document store backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Firestore,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "firestore" => Ok(StoreBackend::Firestore),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,
    /// Guard goal completion and reward redemption with conditional writes,
    /// retrying on conflict.
    pub strict_atomic_writes: bool,
    /// Retries after a conditional write loses a race
    pub write_retry_limit: u32,
    /// Lifetime added to a board when it is promoted or extended
    pub board_extension_days: i64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            strict_atomic_writes: false,
            write_retry_limit: 3,
            board_extension_days: DEFAULT_BOARD_EXTENSION_DAYS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        let gcp_project_id = match (store_backend, env::var("GCP_PROJECT_ID")) {
            (_, Ok(id)) => id,
            (StoreBackend::Firestore, Err(_)) => return Err(ConfigError::Missing("GCP_PROJECT_ID")),
            (StoreBackend::Memory, Err(_)) => "local-dev".to_string(),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            gcp_project_id,
            strict_atomic_writes: parse_flag("STRICT_ATOMIC_WRITES")?,
            write_retry_limit: parse_number("WRITE_RETRY_LIMIT", 3)?,
            board_extension_days: parse_number(
                "BOARD_EXTENSION_DAYS",
                DEFAULT_BOARD_EXTENSION_DAYS,
            )?,
        })
    }
}

fn parse_flag(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(false),
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid(name, v)),
        },
    }
}

fn parse_number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(name, v)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("STORE_BACKEND", "Memory");
        env::set_var("STRICT_ATOMIC_WRITES", "true");
        env::set_var("WRITE_RETRY_LIMIT", "5");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.strict_atomic_writes);
        assert_eq!(config.write_retry_limit, 5);
        assert_eq!(config.board_extension_days, DEFAULT_BOARD_EXTENSION_DAYS);

        env::remove_var("STRICT_ATOMIC_WRITES");
        env::remove_var("WRITE_RETRY_LIMIT");
        env::remove_var("STORE_BACKEND");
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("firestore".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }
}
