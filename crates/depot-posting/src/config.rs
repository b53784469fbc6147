//! Posting engine configuration.
//!
//! Loaded from environment variables with fallback to defaults, then carried
//! immutably through every posting call.

use serde::{Deserialize, Serialize};
use std::env;

use depot_core::numbering::DEFAULT_PAD_WIDTH;
use depot_core::AccountingPolicy;

/// Options consumed by the strategies and the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostingConfig {
    /// Quantity strategy: "total" or "fifo" (default fifo)
    pub accounting_policy: AccountingPolicy,

    /// Let issues drive balances below zero (default false)
    pub allow_negative_stock: bool,

    /// Zero padding of document numbers (default 6)
    pub sequence_pad_width: usize,
}

impl Default for PostingConfig {
    fn default() -> Self {
        PostingConfig {
            accounting_policy: AccountingPolicy::Fifo,
            allow_negative_stock: false,
            sequence_pad_width: DEFAULT_PAD_WIDTH,
        }
    }
}

impl PostingConfig {
    /// Load configuration from environment variables.
    ///
    /// ## Environment Variables
    /// - `DEPOT_ACCOUNTING_POLICY`: "total" or "fifo"
    /// - `DEPOT_ALLOW_NEGATIVE_STOCK`: "true" or "false"
    /// - `DEPOT_SEQUENCE_PAD_WIDTH`: 1..=18
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PostingConfig::default();

        let accounting_policy = match lookup("DEPOT_ACCOUNTING_POLICY") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DEPOT_ACCOUNTING_POLICY".to_string()))?,
            None => defaults.accounting_policy,
        };

        let allow_negative_stock = match lookup("DEPOT_ALLOW_NEGATIVE_STOCK") {
            Some(raw) => raw
                .trim()
                .to_lowercase()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DEPOT_ALLOW_NEGATIVE_STOCK".to_string()))?,
            None => defaults.allow_negative_stock,
        };

        let sequence_pad_width = match lookup("DEPOT_SEQUENCE_PAD_WIDTH") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DEPOT_SEQUENCE_PAD_WIDTH".to_string()))?,
            None => defaults.sequence_pad_width,
        };

        let config = PostingConfig {
            accounting_policy,
            allow_negative_stock,
            sequence_pad_width,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects pad widths an i64 counter can never fill.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequence_pad_width == 0 || self.sequence_pad_width > 18 {
            return Err(ConfigError::InvalidValue("DEPOT_SEQUENCE_PAD_WIDTH".to_string()));
        }
        Ok(())
    }

    /// Builder-style policy override.
    pub fn with_policy(mut self, policy: AccountingPolicy) -> Self {
        self.accounting_policy = policy;
        self
    }

    /// Builder-style negative stock override.
    pub fn with_negative_stock(mut self, allow: bool) -> Self {
        self.allow_negative_stock = allow;
        self
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
