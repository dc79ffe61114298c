use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use directories::ProjectDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::parse_clock;

fn default_true() -> bool {
    true
}
fn default_calc_method() -> String {
    "NorthAmerica".to_string()
}
fn default_madhab() -> String {
    "Shafi".to_string()
}
fn default_timezone_offset() -> i32 {
    Local::now().offset().local_minus_utc() / 60
}
fn default_watchdog_secs() -> u64 {
    20
}
fn default_location_timeout_secs() -> u64 {
    15
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_times() -> Vec<String> {
    ["05:30", "13:15", "16:45", "18:50", "20:15"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_due_grace_secs() -> i64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Whether the app may use a position at all. `false` behaves like a
    /// denied location permission.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latitude: None,
            longitude: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationConfig {
    #[serde(default = "default_calc_method")]
    pub method: String,
    #[serde(default = "default_madhab")]
    pub madhab: String,
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32, // minutes from UTC
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            method: default_calc_method(),
            madhab: default_madhab(),
            timezone_offset: default_timezone_offset(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: u64,
    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Fallback times used when nothing better is available.
    #[serde(default = "default_times")]
    pub default_times: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            watchdog_secs: default_watchdog_secs(),
            location_timeout_secs: default_location_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            default_times: default_times(),
        }
    }
}

impl ResolverConfig {
    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Parsed fallback times. A bad or incomplete list falls back to the
    /// built-in defaults rather than failing.
    pub fn fallback_times(&self) -> [NaiveTime; 5] {
        parse_times(&self.default_times)
            .or_else(|| parse_times(&default_times()))
            .unwrap_or([NaiveTime::MIN; 5])
    }
}

fn parse_times(raw: &[String]) -> Option<[NaiveTime; 5]> {
    if raw.len() != 5 {
        return None;
    }
    let mut out = [NaiveTime::MIN; 5];
    for (slot, value) in out.iter_mut().zip(raw) {
        *slot = parse_clock(value)?;
    }
    Some(out)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// How late a missed zero-crossing may still be reported as due.
    #[serde(default = "default_due_grace_secs")]
    pub due_grace_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            due_grace_secs: default_due_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub calculation: CalculationConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "sajjda")
            .context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("sajjda.db"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let config = Self::default();
            match config.save() {
                Ok(()) => info!("wrote default config to {:?}", path),
                Err(e) => warn!("could not write default config: {e:#}"),
            }
            return Ok(config);
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Parsing config.toml")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(&path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
