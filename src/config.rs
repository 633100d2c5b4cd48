use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub keepalive: KeepAliveConfig,
    pub artifacts: ArtifactConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    pub enabled: bool,
    pub target_url: String,
    pub interval_minutes: u64,
    pub mode: SchedulerMode,
    pub ping_timeout_seconds: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_url: "http://127.0.0.1:8000/health".to_string(),
            interval_minutes: 10,
            mode: SchedulerMode::Timer,
            ping_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerMode {
    Timer,
    ThreadLoop,
}

impl FromStr for SchedulerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "timer" => Ok(SchedulerMode::Timer),
            "thread_loop" => Ok(SchedulerMode::ThreadLoop),
            _ => anyhow::bail!(
                "Invalid KEEPALIVE_MODE: {}. Must be 'timer' or 'thread_loop'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub scaler_path: String,
    pub model_path: String,
    pub classifier_path: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            scaler_path: "artifacts/scaler.json".to_string(),
            model_path: "artifacts/lstm_model.json".to_string(),
            classifier_path: "artifacts/category_model.json".to_string(),
        }
    }
}

impl Config {
    /// Read the TOML file if it exists, then apply environment overrides.
    /// A missing file yields the defaults so the service stays runnable.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path))?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("PORT") {
            self.server.port = value.parse().context("PORT must be a port number")?;
        }
        if let Ok(value) = env::var("KEEPALIVE_URL") {
            self.keepalive.target_url = value;
        }
        if let Ok(value) = env::var("KEEPALIVE_INTERVAL_MINUTES") {
            self.keepalive.interval_minutes = value
                .parse()
                .context("KEEPALIVE_INTERVAL_MINUTES must be a number")?;
        }
        if let Ok(value) = env::var("KEEPALIVE_MODE") {
            self.keepalive.mode = value.parse()?;
        }
        if let Ok(value) = env::var("SCALER_PATH") {
            self.artifacts.scaler_path = value;
        }
        if let Ok(value) = env::var("MODEL_PATH") {
            self.artifacts.model_path = value;
        }
        if let Ok(value) = env::var("CLASSIFIER_PATH") {
            self.artifacts.classifier_path = value;
        }
        Ok(())
    }
}
