use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use engine_logging::LogDestination;
use labeling_core::{ImageClass, PrefetchTrigger};
use labeling_engine::{EngineConfig, HttpSettings, SinkSettings, SourceSettings};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CONFIG_FILE: &str = "labeling.ron";

/// Overrides `source.api_key` so the key can stay out of the config file.
pub(crate) const API_KEY_ENV: &str = "LABELING_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub class: ClassConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub prefetch: PrefetchMode,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let http = HttpSettings::default();
        Self {
            class: ClassConfig::default(),
            source: SourceConfig::default(),
            sink: SinkConfig::default(),
            connect_timeout_secs: http.connect_timeout.as_secs(),
            request_timeout_secs: http.request_timeout.as_secs(),
            prefetch: PrefetchMode::Exact,
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ClassConfig {
    pub id: i64,
    pub name: String,
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            id: 1,
            name: "unlabeled".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SourceConfig {
    pub base_url: String,
    pub search_path: String,
    pub api_key: String,
    pub api_host: String,
    pub page_size: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let defaults = SourceSettings::default();
        Self {
            base_url: defaults.base_url,
            search_path: defaults.search_path,
            api_key: defaults.api_key,
            api_host: defaults.api_host,
            page_size: defaults.page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SinkConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        let defaults = SinkSettings::default();
        Self {
            base_url: defaults.base_url,
            api_token: defaults.api_token,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum PrefetchMode {
    Exact,
    AtOrBelow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LogConfig {
    pub destination: LogTarget,
    pub level: String,
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogTarget::File,
            level: "info".to_string(),
            file: PathBuf::from(engine_logging::DEFAULT_LOG_FILE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

impl AppConfig {
    pub fn image_class(&self) -> ImageClass {
        ImageClass::new(self.class.id, self.class.name.clone())
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log.level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            prefetch_trigger: match self.prefetch {
                PrefetchMode::Exact => PrefetchTrigger::Exact,
                PrefetchMode::AtOrBelow => PrefetchTrigger::AtOrBelow,
            },
        }
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            base_url: self.source.base_url.clone(),
            search_path: self.source.search_path.clone(),
            api_key: self.source.api_key.clone(),
            api_host: self.source.api_host.clone(),
            page_size: self.source.page_size,
            http: self.http_settings(),
        }
    }

    pub fn sink_settings(&self) -> SinkSettings {
        SinkSettings {
            base_url: self.sink.base_url.clone(),
            api_token: self.sink.api_token.clone(),
            http: self.http_settings(),
            clock: Some(Arc::new(|| {
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
            })),
        }
    }

    fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..HttpSettings::default()
        }
    }

    fn apply_env_overrides(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.source.api_key = key;
        }
    }
}

/// Reads the RON config at `path`. A missing file yields the defaults.
pub(crate) fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let mut config = match fs::read_to_string(path) {
        Ok(text) => ron::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };
    config.apply_env_overrides(std::env::var(API_KEY_ENV).ok());
    Ok(config)
}
