use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Parser;
use dotenvy::EnvLoader;
use serde::Deserialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_CONFIG_FILE: &str = "taskpilot.toml";

/// Global timezone used to interpret deadlines that carry no offset
static APP_TIMEZONE: OnceLock<Tz> = OnceLock::new();

/// Initialize the timezone from the given string
pub fn init_timezone(tz_str: &str) {
    let timezone: Tz = tz_str.parse().unwrap_or_else(|_| {
        warn!(timezone = tz_str, "invalid timezone, falling back to UTC");
        chrono_tz::UTC
    });

    if APP_TIMEZONE.set(timezone).is_err() {
        warn!("timezone already initialized");
    }
}

/// Get the configured timezone
pub fn get_timezone() -> Tz {
    *APP_TIMEZONE.get().unwrap_or(&chrono_tz::UTC)
}

#[derive(Parser, Debug, Default)]
#[command(name = "taskpilot")]
#[command(about = "Web front end for a remote task scheduling service")]
pub struct Args {
    /// Path to a TOML settings file (default: taskpilot.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the remote task service
    #[arg(long)]
    pub api_url: Option<String>,

    /// Address the web front end listens on
    #[arg(long)]
    pub bind: Option<String>,

    /// IANA timezone name used for deadlines without an offset
    #[arg(long)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub bind: String,
    pub timezone: String,
    pub log_level: String,
    pub daily_hours: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            timezone: "UTC".to_string(),
            log_level: "info".to_string(),
            daily_hours: None,
        }
    }
}

/// On-disk shape of `taskpilot.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    api_url: Option<String>,
    bind: Option<String>,
    timezone: Option<String>,
    log_level: Option<String>,
    schedule: ScheduleSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScheduleSettings {
    daily_hours: Option<f64>,
}

impl Settings {
    /// Layer defaults, the settings file, `.env`/process environment and CLI flags.
    pub fn load(args: &Args) -> Result<Self> {
        let mut settings = Settings::default();

        let (path, required) = match &args.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if required || path.exists() {
            settings.apply_file(&path)?;
        }

        let dotenv = EnvLoader::new().load().unwrap_or_default();
        settings.apply_env(|key| {
            dotenv
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        });

        settings.apply_args(args);
        Ok(settings)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        self.apply_toml(&raw)
            .with_context(|| format!("parsing settings file {}", path.display()))
    }

    fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let file: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        if let Some(v) = file.bind {
            self.bind = v;
        }
        if let Some(v) = file.timezone {
            self.timezone = v;
        }
        if let Some(v) = file.log_level {
            self.log_level = v;
        }
        if file.schedule.daily_hours.is_some() {
            self.daily_hours = file.schedule.daily_hours;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("TASKPILOT_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("TASKPILOT_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("TASKPILOT_TIMEZONE") {
            self.timezone = v;
        }
        if let Some(v) = lookup("TASKPILOT_LOG") {
            self.log_level = v;
        }
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(v) = &args.api_url {
            self.api_url = v.clone();
        }
        if let Some(v) = &args.bind {
            self.bind = v.clone();
        }
        if let Some(v) = &args.timezone {
            self.timezone = v.clone();
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(default_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow::anyhow!("invalid RUST_LOG / log level: {e}"))?;

    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
    {
        tracing::debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}
