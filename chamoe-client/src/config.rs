use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Logging section of the client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub enabled: bool,
    /// One of off, error, warn, info, debug, trace
    pub level: String,
    pub file: PathBuf,
}

/// Client configuration.
///
/// Sources, lowest priority first: built-in defaults, `chamoe.toml` in the
/// current directory, then `CHAMOE_*` environment variables
/// (`CHAMOE_PAGE_SIZE`, `CHAMOE_ROLLBACK_TOGGLES`, `CHAMOE_DATA_DIR`, `CHAMOE_LOG_LEVEL`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Items per page served by the in-memory backend
    pub page_size: usize,
    /// Revert a toggle whose confirmation failed
    pub rollback_failed_toggles: bool,
    /// Where the session token lives; defaults to `~/.chamoe`
    pub data_dir: Option<PathBuf>,
    pub log: LogSettings,
}

/// The subset of configuration controllers care about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    pub rollback_failed_toggles: bool,
}

impl ClientConfig {
    pub const FILE_NAME: &'static str = "chamoe.toml";

    pub fn load() -> Result<Self> {
        let mut builder = Self::defaults()?;

        let file_path = PathBuf::from(Self::FILE_NAME);
        if file_path.exists() {
            builder = builder.add_source(File::from(file_path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("CHAMOE").try_parsing(true));

        // Flat aliases for the nested keys
        if let Ok(level) = std::env::var("CHAMOE_LOG_LEVEL") {
            builder = builder.set_override("log.level", level)?;
        }
        if let Ok(toggles) = std::env::var("CHAMOE_ROLLBACK_TOGGLES") {
            builder = builder.set_override("rollback_failed_toggles", toggles)?;
        }

        let settings = builder.build().context("Failed to build configuration")?;
        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Configuration from an explicit TOML string layered over the defaults
    pub fn from_toml(source: &str) -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(File::from_str(source, config::FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?;
        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("page_size", 5)?
            .set_default("rollback_failed_toggles", false)?
            .set_default("log.enabled", true)?
            .set_default("log.level", "info")?
            .set_default("log.file", "chamoe.log")?)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let home_dir =
                    dirs::home_dir().context("Could not determine home directory")?;
                Ok(home_dir.join(".chamoe"))
            }
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            rollback_failed_toggles: self.rollback_failed_toggles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config.page_size, 5);
        assert!(!config.rollback_failed_toggles);
        assert!(config.data_dir.is_none());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.controller_options(), ControllerOptions::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = ClientConfig::from_toml(
            r#"
            page_size = 10
            rollback_failed_toggles = true
            data_dir = "/tmp/chamoe-test"

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.page_size, 10);
        assert!(config.controller_options().rollback_failed_toggles);
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/chamoe-test"));
        assert_eq!(config.log.level, "debug");
        assert!(config.log.enabled);
    }
}
