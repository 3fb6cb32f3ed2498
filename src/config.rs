use crate::{cli::Cli, error::BotResult, valorant::region::Region};
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::{path::Path, path::PathBuf, time::Duration};
use tracing::Level;

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";

// All settings may be configured via environment variables. Example:
// VALORANT_API_KEY="xxx" would set valorant_api_key to the xxx value.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    pub slack_token: String,
    pub slack_app_token: String,
    pub valorant_api_key: String,
    #[serde(default = "default_valorant_base_url")]
    pub valorant_base_url: String,
    #[serde(default = "default_valorant_api_timeout_sec")]
    pub valorant_api_timeout_sec: u64,
    #[serde(default)]
    pub default_region: Region,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    // A cached rank younger than this is served without calling the API
    #[serde(default = "default_cache_freshness_sec")]
    pub cache_freshness_sec: u64,
    // The upstream API throttles aggressive fan-out with 429s
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_retry_interval_sec")]
    pub retry_interval_sec: u64,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_true")]
    pub retry_not_found: bool,
    #[serde(default = "default_true")]
    pub resume_pending_retries: bool,
    #[serde(default = "default_auto_update_schedule")]
    pub auto_update_schedule: String,
}

impl Settings {
    pub fn new() -> BotResult<Self> {
        let mut figment = Figment::new();
        if Path::new(LOCAL_SETTINGS_YAML_FILE).exists() {
            println!(
                "\n######################################\n\
                   ##   Found '.env.local.yaml' file,  ##\n\
                   ##   loading local configuration.   ##\n\
                   ######################################\n\
                "
            );
            figment = figment.merge(Yaml::file(LOCAL_SETTINGS_YAML_FILE));
        }
        let figment = figment
            .merge(Env::raw())
            .merge(Serialized::defaults(Cli::parse()));

        Settings::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> BotResult<Self> {
        Ok(figment.extract()?)
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.valorant_api_timeout_sec)
    }

    pub fn cache_freshness(&self) -> Duration {
        Duration::from_secs(self.cache_freshness_sec)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_sec)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_valorant_base_url() -> String {
    "https://api.henrikdev.xyz/valorant".to_string()
}

fn default_valorant_api_timeout_sec() -> u64 {
    10
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_cache_freshness_sec() -> u64 {
    3600
}

fn default_max_concurrent_requests() -> usize {
    3
}

fn default_retry_interval_sec() -> u64 {
    120
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_auto_update_schedule() -> String {
    "0 */5 * * * *".to_string()
}
