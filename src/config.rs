//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the login password) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::slip::builder::SlipRules;
use crate::slip::payout::PayoutPolicy;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub slip: SlipConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// GraphQL endpoint, e.g. `http://localhost:5000/graphql/`.
    pub endpoint: String,
    /// League whose line categories make up the board.
    #[serde(default = "default_league")]
    pub league: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_league() -> String {
    "NBA".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("UNDERLINE/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlipConfig {
    /// Largest entry accepted client-side, in whole dollars.
    #[serde(default = "default_max_entry_amount")]
    pub max_entry_amount: u64,
    /// Pick count from which the multiplier applies to the payout.
    #[serde(default = "default_payout_multiplier_from")]
    pub payout_multiplier_from: usize,
    /// Daily entry volume the backend enforces; named when it rejects a slip.
    #[serde(default = "default_daily_entry_limit")]
    pub daily_entry_limit: u64,
}

fn default_max_entry_amount() -> u64 {
    50
}

fn default_payout_multiplier_from() -> usize {
    2
}

fn default_daily_entry_limit() -> u64 {
    80
}

impl Default for SlipConfig {
    fn default() -> Self {
        Self {
            max_entry_amount: default_max_entry_amount(),
            payout_multiplier_from: default_payout_multiplier_from(),
            daily_entry_limit: default_daily_entry_limit(),
        }
    }
}

impl SlipConfig {
    /// Rules handed to the slip builder.
    pub fn rules(&self, location: &LocationConfig) -> SlipRules {
        SlipRules {
            max_entry_amount: self.max_entry_amount,
            payout: PayoutPolicy {
                multiplier_from: self.payout_multiplier_from,
            },
            check_approved_location: location.check_approved,
            daily_entry_limit: self.daily_entry_limit,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LocationConfig {
    /// Whether location access is available in this environment.
    #[serde(default = "default_location_enabled")]
    pub enabled: bool,
    /// Ask the backend whether the position is eligible for paid entry.
    #[serde(default)]
    pub check_approved: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn default_location_enabled() -> bool {
    true
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: default_location_enabled(),
            check_approved: false,
            latitude: None,
            longitude: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    /// Session file path; defaults to `underline_session.json`.
    pub token_file: Option<String>,
    /// Env var holding the password for `login`.
    pub password_env: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.slip.payout_multiplier_from > crate::slip::MAX_PICKS {
            anyhow::bail!(
                "slip.payout_multiplier_from must be at most {}",
                crate::slip::MAX_PICKS
            );
        }
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
