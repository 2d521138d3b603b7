// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration from the environment

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use evlog_engine::{DrainConfig, HousekeepingConfig};
use thiserror::Error;

pub const STATE_DIR: &str = "EVLOG_STATE_DIR";
pub const WAL_DIR: &str = "EVLOG_WAL_DIR";
pub const STORE_DIR: &str = "EVLOG_STORE_DIR";
pub const DRAIN_BATCH_SIZE: &str = "EVLOG_DRAIN_BATCH_SIZE";
pub const DRAIN_BACKOFF_MS: &str = "EVLOG_DRAIN_BACKOFF_MS";
pub const TAIL_INTERVAL_MS: &str = "EVLOG_TAIL_INTERVAL_MS";
pub const SEGMENT_WARN_MB: &str = "EVLOG_SEGMENT_WARN_MB";
pub const RETENTION_DAYS: &str = "EVLOG_RETENTION_DAYS";

/// Configuration errors are fatal at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for the pid file, log and socket
    pub state_dir: PathBuf,
    /// Segments and cursor
    pub wal_dir: PathBuf,
    /// Root of the backing store
    pub store_dir: PathBuf,
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub drain: DrainConfig,
    pub housekeeping: HousekeepingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let state_dir = PathBuf::from(require(&lookup, STATE_DIR)?);
        let wal_dir = PathBuf::from(require(&lookup, WAL_DIR)?);
        let store_dir = PathBuf::from(require(&lookup, STORE_DIR)?);

        let max_batch: usize = parse(&lookup, DRAIN_BATCH_SIZE)?;
        if max_batch == 0 {
            return Err(ConfigError::Invalid {
                var: DRAIN_BATCH_SIZE,
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            socket_path: state_dir.join("evlogd.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
            wal_dir,
            store_dir,
            drain: DrainConfig {
                max_batch,
                backoff: Duration::from_millis(parse(&lookup, DRAIN_BACKOFF_MS)?),
                tail_interval: Duration::from_millis(parse(&lookup, TAIL_INTERVAL_MS)?),
            },
            housekeeping: HousekeepingConfig {
                retention_days: parse(&lookup, RETENTION_DAYS)?,
                segment_warn_mb: parse(&lookup, SEGMENT_WARN_MB)?,
            },
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<String, ConfigError> {
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = require(lookup, var)?;
    match value.parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
