//! Runtime configuration read from the environment.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;
use todo_core::{SearchSyncPolicy, TaskSettings};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected pretty or json, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_path: String,
    pub search_index_path: String,
    pub search_sync: SearchSyncPolicy,
    pub tasks: TaskSettings,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            database_path: ":memory:".to_string(),
            search_index_path: ":memory:".to_string(),
            search_sync: SearchSyncPolicy::default(),
            tasks: TaskSettings::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source. Unset variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let workers = parse(&lookup, "TASK_WORKERS", defaults.tasks.workers)?;
        let max_attempts = parse(&lookup, "TASK_MAX_ATTEMPTS", defaults.tasks.max_attempts)?;
        if workers == 0 {
            return Err(positive("TASK_WORKERS"));
        }
        if max_attempts == 0 {
            return Err(positive("TASK_MAX_ATTEMPTS"));
        }

        Ok(Self {
            host: parse(&lookup, "HOST", defaults.host)?,
            port: parse(&lookup, "PORT", defaults.port)?,
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            search_index_path: lookup("SEARCH_INDEX_PATH").unwrap_or(defaults.search_index_path),
            search_sync: parse(&lookup, "SEARCH_SYNC", defaults.search_sync)?,
            tasks: TaskSettings {
                workers,
                max_attempts,
            },
            log_format: parse(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            name,
            reason: err.to_string(),
            value,
        }),
    }
}

fn positive(name: &'static str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: "0".to_string(),
        reason: "must be greater than zero".to_string(),
    }
}
