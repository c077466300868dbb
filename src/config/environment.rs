// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Environment-based configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tatami_core::constants::windows::{DEFAULT_ANALYSIS_WINDOW_DAYS, MAX_ANALYSIS_WINDOW_DAYS};
use tatami_intelligence::IntelligenceConfig;
use tracing::info;

/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/tatami.db";

/// Default number of attempts for busy transactions
pub const DEFAULT_TRANSACTION_MAX_RETRIES: u32 = 3;

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string, defaulting to development
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Whether this is production
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database with file path
    SQLite {
        /// File path
        path: PathBuf,
    },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string; anything without a `sqlite:` prefix is a file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str.trim_start_matches("//")),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// Service configuration loaded from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Database location
    pub database_url: DatabaseUrl,
    /// Primary analysis window when a caller gives none
    pub analysis_window_days: u32,
    /// Attempts for transactions that hit a busy database
    pub transaction_max_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            database_url: DatabaseUrl::parse_url(DEFAULT_DATABASE_URL),
            analysis_window_days: DEFAULT_ANALYSIS_WINDOW_DAYS,
            transaction_max_retries: DEFAULT_TRANSACTION_MAX_RETRIES,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or validation fails
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Self {
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            database_url: DatabaseUrl::parse_url(&env_var_or("DATABASE_URL", DEFAULT_DATABASE_URL)),
            analysis_window_days: env_var_or(
                "ANALYSIS_WINDOW_DAYS",
                &DEFAULT_ANALYSIS_WINDOW_DAYS.to_string(),
            )
            .parse()
            .context("Invalid ANALYSIS_WINDOW_DAYS value")?,
            transaction_max_retries: env_var_or(
                "TRANSACTION_MAX_RETRIES",
                &DEFAULT_TRANSACTION_MAX_RETRIES.to_string(),
            )
            .parse()
            .context("Invalid TRANSACTION_MAX_RETRIES value")?,
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error when the window or retry count is out of range
    pub fn validate(&self) -> Result<()> {
        if self.analysis_window_days == 0 || self.analysis_window_days > MAX_ANALYSIS_WINDOW_DAYS {
            return Err(anyhow::anyhow!(
                "ANALYSIS_WINDOW_DAYS must be between 1 and {MAX_ANALYSIS_WINDOW_DAYS}"
            ));
        }
        if self.transaction_max_retries == 0 {
            return Err(anyhow::anyhow!("TRANSACTION_MAX_RETRIES must be at least 1"));
        }
        Ok(())
    }

    /// Initialize the global analysis configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the `TATAMI_*` overrides are invalid
    pub fn init_all_configs(&self) -> Result<()> {
        // Surface bad overrides here; global() alone would fall back to defaults
        IntelligenceConfig::load().context("Invalid analysis threshold overrides")?;
        let intelligence = IntelligenceConfig::global();
        info!(
            slope_threshold = intelligence.trend.slope_threshold,
            critical_z = intelligence.anomaly.critical_z,
            baseline_days = intelligence.windows.anomaly_baseline_days,
            "All configurations initialized successfully"
        );
        Ok(())
    }

    /// Get a summary of the configuration for logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Tatami Insights Configuration:\n\
             - Environment: {}\n\
             - Database: {}\n\
             - Analysis Window: {} days\n\
             - Transaction Retries: {}",
            self.environment,
            if self.database_url.is_memory() {
                "SQLite (in-memory)".to_owned()
            } else {
                self.database_url.to_connection_string()
            },
            self.analysis_window_days,
            self.transaction_max_retries
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
