// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consumer::ConsumerCfg;

pub const ENV_CONFIG_PATH: &str = "BOT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";

/// Floor for every loop delay.
pub const MIN_DELAY_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unsupported log format: {other}")),
        }
    }
}

fn default_host() -> String {
    "api.telegram.org".to_string()
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("files_storage")
}
fn default_batch_size() -> usize {
    100
}
fn default_idle_sleep_ms() -> u64 {
    1_000
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    30_000
}
fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_idle_sleep_ms")]
    pub idle_sleep_ms: u64,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Serve Prometheus `/metrics` here when set.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            storage_path: default_storage_path(),
            batch_size: default_batch_size(),
            idle_sleep_ms: default_idle_sleep_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            metrics_addr: None,
            log_format: LogFormat::default(),
        }
    }
}

impl BotConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        let mut cfg: BotConfig = toml::from_str(&content)
            .with_context(|| format!("parsing bot config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Resolve config in order:
    /// 1) explicit path (CLI) or $BOT_CONFIG_PATH, which must exist
    /// 2) config/bot.toml if present
    /// 3) built-in defaults
    ///
    /// Env overrides (`BOT_*`) are applied on top in every case.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let mut cfg = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(p) if p.exists() => Self::load_from(&p)?,
            Some(p) => return Err(anyhow!("config path {} does not exist", p.display())),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_PATH);
                if p.exists() {
                    Self::load_from(&p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("BOT_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("BOT_STORAGE_PATH") {
            self.storage_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BOT_BATCH_SIZE") {
            self.batch_size = v.trim().parse().context("parsing BOT_BATCH_SIZE")?;
        }
        if let Ok(v) = std::env::var("BOT_METRICS_ADDR") {
            self.metrics_addr = Some(v.trim().parse().context("parsing BOT_METRICS_ADDR")?);
        }
        if let Ok(v) = std::env::var("BOT_LOG_FORMAT") {
            self.log_format = v.parse()?;
        }
        self.sanitize();
        Ok(())
    }

    fn sanitize(&mut self) {
        // Telegram caps getUpdates at 100.
        self.batch_size = self.batch_size.clamp(1, 100);
        // Zero delays would spin the loop against the API.
        self.idle_sleep_ms = self.idle_sleep_ms.max(MIN_DELAY_MS);
        self.backoff_base_ms = self.backoff_base_ms.max(MIN_DELAY_MS);
        self.backoff_max_ms = self.backoff_max_ms.max(MIN_DELAY_MS);
        if self.backoff_base_ms > self.backoff_max_ms {
            std::mem::swap(&mut self.backoff_base_ms, &mut self.backoff_max_ms);
        }
    }

    pub fn consumer_cfg(&self) -> ConsumerCfg {
        ConsumerCfg {
            batch_size: self.batch_size,
            idle_sleep: Duration::from_millis(self.idle_sleep_ms),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
