pub mod run_options;

use crate::error::AppError;
use run_options::Args;
use serde::Deserialize;
use std::{fs, time::Duration};
use tracing::warn;

pub const CONFIG_FILE: &str = "./soilwatch.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub name: String,
}

impl Default for Database {
    fn default() -> Self {
        Self { name: "soilwatch.db".to_owned() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebServer {
    pub address: String,
}

impl Default for WebServer {
    fn default() -> Self {
        Self { address: "0.0.0.0:8080".to_owned() }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Feed {
    pub keep_alive_secs: u64,
    /// readings buffered per subscriber before a slow one starts skipping
    pub channel_capacity: usize,
    /// frames buffered between a session and its http body
    pub session_buffer: usize,
}

impl Feed {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self { keep_alive_secs: 15, channel_capacity: 64, session_buffer: 16 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Mailbox {
    pub min_time_secs: u32,
    pub max_time_secs: u32,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self { min_time_secs: 1, max_time_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Log {
    pub filter: String,
}

impl Default for Log {
    fn default() -> Self {
        Self { filter: "info".to_owned() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: Database,
    pub web_server: WebServer,
    pub feed: Feed,
    pub mailbox: Mailbox,
    pub log: Log,
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, AppError> {
        if let Some(cfg_str) = &args.cfg_str {
            return Self::load_from_str(cfg_str);
        }
        if !args.cfg_file.exists() {
            warn!(file = %args.cfg_file.display(), "Config file not found. Proceeding with defaults.");
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(&args.cfg_file)?;
        Self::load_from_str(&config_content)
    }

    pub fn load_from_str(config_str: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(config_str).map_err(|e| AppError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.feed.keep_alive_secs == 0 {
            return Err(AppError::ConfigError("feed.keep_alive_secs must be positive".to_owned()));
        }
        if self.feed.channel_capacity == 0 || self.feed.session_buffer == 0 {
            return Err(AppError::ConfigError("feed buffers must hold at least one entry".to_owned()));
        }
        let Mailbox { min_time_secs, max_time_secs } = self.mailbox;
        if min_time_secs == 0 || min_time_secs > max_time_secs {
            return Err(AppError::ConfigError(format!(
                "mailbox time bounds {}..={} are not a positive range",
                min_time_secs, max_time_secs
            )));
        }
        Ok(())
    }
}
