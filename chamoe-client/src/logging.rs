use anyhow::{anyhow, Context};
use log::LevelFilter;
use simplelog::*;
use std::fs::File;
use std::path::PathBuf;

use crate::config::LogSettings;

pub const TARGET_SESSION: &str = "session";
pub const TARGET_GATEWAY_CALLS: &str = "gateway_calls";
pub const TARGET_PAGINATION: &str = "pagination";
pub const TARGET_OPTIMISTIC: &str = "optimistic";
pub const TARGET_GENERAL: &str = "general";

/// Logging configuration for the chamoe client
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Master switch to enable/disable all logging
    pub enabled: bool,
    /// Path to the log file
    pub log_file: PathBuf,
    /// Whether to clear the log file on startup
    pub clear_on_startup: bool,
    /// Feature flags for specific logging categories
    pub features: LogFeatures,
    /// Overall log level
    pub level: LevelFilter,
}

/// Feature flags for specific logging categories
#[derive(Debug, Clone)]
pub struct LogFeatures {
    /// Session restore, login and logout
    pub session: bool,
    /// Requests sent to the gateways
    pub gateway_calls: bool,
    /// Page loads and skipped triggers
    pub pagination: bool,
    /// Optimistic mutations, confirmations and rollbacks
    pub optimistic: bool,
    pub general: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("chamoe.log"),
            clear_on_startup: true,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self {
            session: true,
            gateway_calls: true,
            pagination: true,
            optimistic: true,
            general: true,
        }
    }
}

impl LogFeatures {
    /// Targets whose feature flag is off
    pub fn ignored_targets(&self) -> Vec<&'static str> {
        [
            (self.session, TARGET_SESSION),
            (self.gateway_calls, TARGET_GATEWAY_CALLS),
            (self.pagination, TARGET_PAGINATION),
            (self.optimistic, TARGET_OPTIMISTIC),
            (self.general, TARGET_GENERAL),
        ]
        .into_iter()
        .filter(|(enabled, _)| !enabled)
        .map(|(_, target)| target)
        .collect()
    }
}

impl LogConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Only warnings and errors, and only for session and optimistic state
    pub fn minimal() -> Self {
        Self {
            enabled: true,
            level: LevelFilter::Warn,
            features: LogFeatures {
                session: true,
                gateway_calls: false,
                pagination: false,
                optimistic: true,
                general: false,
            },
            ..Default::default()
        }
    }

    pub fn verbose() -> Self {
        Self {
            enabled: true,
            level: LevelFilter::Trace,
            features: LogFeatures::default(),
            ..Default::default()
        }
    }

    /// Build from the `[log]` section of the client configuration
    pub fn from_settings(settings: &LogSettings) -> anyhow::Result<Self> {
        let level = settings
            .level
            .parse::<LevelFilter>()
            .map_err(|_| anyhow!("Unknown log level: {}", settings.level))?;
        Ok(Self {
            enabled: settings.enabled,
            log_file: settings.file.clone(),
            level,
            ..Default::default()
        })
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enabled {
        // Initialize with no-op logger
        let _ = WriteLogger::init(LevelFilter::Off, Config::default(), std::io::sink());
        return Ok(());
    }

    if config.clear_on_startup {
        let _ = File::create(&config.log_file)
            .with_context(|| format!("Failed to create log file {}", config.log_file.display()))?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|builder| builder);
    for target in config.features.ignored_targets() {
        builder.add_filter_ignore_str(target);
    }
    let log_config = builder.build();

    WriteLogger::init(config.level, log_config, log_file)?;

    log::info!(target: TARGET_GENERAL, "Logging initialized: file={}, level={:?}", config.log_file.display(), config.level);
    log::debug!(target: TARGET_GENERAL, "Log features: {:?}", config.features);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_features_become_ignored_targets() {
        assert!(LogFeatures::default().ignored_targets().is_empty());
        assert_eq!(
            LogConfig::minimal().features.ignored_targets(),
            vec![TARGET_GATEWAY_CALLS, TARGET_PAGINATION, TARGET_GENERAL]
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = LogSettings {
            enabled: true,
            level: "debug".to_string(),
            file: PathBuf::from("custom.log"),
        };
        let config = LogConfig::from_settings(&settings).unwrap();
        assert_eq!(config.level, LevelFilter::Debug);
        assert_eq!(config.log_file, PathBuf::from("custom.log"));

        let bad = LogSettings {
            level: "loud".to_string(),
            ..settings
        };
        assert!(LogConfig::from_settings(&bad).is_err());
    }
}
