use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum acceptable click to final paint latency, in milliseconds, by element identifier.
pub type ThresholdMap = HashMap<String, f64>;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("No host configured, set `host` to the URL of the page under test")]
    MissingHost,
    #[error("Host [{host}] is not a valid URL: {reason}")]
    InvalidHost { host: String, reason: String },
    #[error("No working directory configured, set `working_dir`")]
    MissingWorkingDir,
    #[error("Working directory {0:?} already exists, a previous run may not have cleaned up")]
    WorkingDirExists(PathBuf),
}

/// CPU throttling applied to the browser while capturing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ThrottleSetting {
    #[default]
    #[serde(rename = "NONE", alias = "none")]
    #[value(name = "NONE", alias = "none")]
    None,
    #[serde(rename = "4X", alias = "4x")]
    #[value(name = "4X", alias = "4x")]
    FourX,
}

impl ThrottleSetting {
    /// The slowdown factor passed to the browser, 1 means no throttling.
    pub fn cpu_rate(&self) -> f64 {
        match self {
            ThrottleSetting::None => 1.0,
            ThrottleSetting::FourX => 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 714,
        }
    }
}

/// Configuration for a single run.
///
/// Every key is optional when loading from TOML so that the CLI can fill in the rest. Call
/// [RunConfig::validate] before using it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Where the application under test is running.
    pub host: String,
    /// Threshold for every element carrying the marker attribute.
    ///
    /// The keys must match the attribute values found on the page.
    pub thresholds: ThresholdMap,
    /// Directory created for the run to hold trace artifacts.
    ///
    /// It must not exist before the run and is removed when the run finishes unless
    /// [RunConfig::keep_working_dir] is set.
    pub working_dir: PathBuf,
    pub throttle: ThrottleSetting,
    /// Keep the working directory after the run, helpful for debugging.
    pub keep_working_dir: bool,
    /// Time to wait after navigation before interacting with the page.
    ///
    /// Increase this if the interaction happens before event listeners are attached or before the
    /// marked elements have rendered.
    pub page_load_await_ms: u64,
    /// How long to wait for an element to become selectable before skipping it.
    pub selector_timeout_ms: u64,
    /// The attribute that marks interactive elements, its value is the element identifier.
    pub marker_attribute: String,
    pub headless: bool,
    pub viewport: Viewport,
    /// Append a JSON line describing the run to this file.
    pub report_path: Option<PathBuf>,
    /// Where released working directories are moved to. Defaults to a directory under the system
    /// temp directory.
    pub trash_dir: Option<PathBuf>,
    /// Do not show a progress bar while capturing.
    pub no_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            thresholds: ThresholdMap::new(),
            working_dir: PathBuf::new(),
            throttle: ThrottleSetting::default(),
            keep_working_dir: false,
            page_load_await_ms: 1000,
            selector_timeout_ms: 30_000,
            marker_attribute: "data-click".to_string(),
            headless: true,
            viewport: Viewport::default(),
            report_path: None,
            trash_dir: None,
            no_progress: false,
        }
    }
}

impl RunConfig {
    pub fn new(host: impl Into<String>, thresholds: ThresholdMap, working_dir: PathBuf) -> Self {
        Self {
            host: host.into(),
            thresholds,
            working_dir,
            ..Default::default()
        }
    }

    /// Load a configuration file in TOML format.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check that the configuration can be used to start a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        url::Url::parse(&self.host).map_err(|e| ConfigError::InvalidHost {
            host: self.host.clone(),
            reason: e.to_string(),
        })?;

        if self.working_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingWorkingDir);
        }
        if self.working_dir.exists() {
            return Err(ConfigError::WorkingDirExists(self.working_dir.clone()));
        }

        if self.thresholds.is_empty() {
            log::warn!("No thresholds configured, every discovered element will fail the run");
        }

        Ok(())
    }

    pub fn page_load_await(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.page_load_await_ms)
    }

    pub fn selector_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.selector_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_config(dir: &Path) -> RunConfig {
        RunConfig::new(
            "http://localhost:8000",
            ThresholdMap::from([("2nd".to_string(), 400.0)]),
            dir.join("traces"),
        )
    }

    #[test]
    fn load_from_toml() {
        let config = RunConfig::from_toml_str(
            r#"
            host = "http://localhost:8000"
            working_dir = "./traceDir"
            throttle = "4X"
            page_load_await_ms = 2500

            [thresholds]
            2nd = 400
            3rd = 500.5
            "#,
        )
        .unwrap();

        assert_eq!(
            RunConfig {
                host: "http://localhost:8000".to_string(),
                thresholds: ThresholdMap::from([
                    ("2nd".to_string(), 400.0),
                    ("3rd".to_string(), 500.5)
                ]),
                working_dir: PathBuf::from("./traceDir"),
                throttle: ThrottleSetting::FourX,
                page_load_await_ms: 2500,
                ..Default::default()
            },
            config
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = RunConfig::from_toml_str("").unwrap();

        assert_eq!(ThrottleSetting::None, config.throttle);
        assert!(!config.keep_working_dir);
        assert_eq!(1000, config.page_load_await_ms);
        assert_eq!("data-click", config.marker_attribute);
        assert_eq!(Viewport { width: 1440, height: 714 }, config.viewport);
        assert!(config.headless);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RunConfig::from_toml_str("hots = \"http://localhost\"").is_err());
    }

    #[test]
    fn validate_accepts_complete_config() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Ok(()), valid_config(dir.path()).validate());
    }

    #[test]
    fn validate_requires_host() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            host: String::new(),
            ..valid_config(dir.path())
        };

        assert_eq!(Err(ConfigError::MissingHost), config.validate());
    }

    #[test]
    fn validate_rejects_unparseable_host() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            host: "localhost 8000".to_string(),
            ..valid_config(dir.path())
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }

    #[test]
    fn validate_requires_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            working_dir: PathBuf::new(),
            ..valid_config(dir.path())
        };

        assert_eq!(Err(ConfigError::MissingWorkingDir), config.validate());
    }

    #[test]
    fn validate_rejects_existing_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = valid_config(dir.path());
        std::fs::create_dir(&config.working_dir).unwrap();

        assert_eq!(
            Err(ConfigError::WorkingDirExists(config.working_dir.clone())),
            config.validate()
        );
    }

    #[test]
    fn throttle_rates() {
        assert_eq!(1.0, ThrottleSetting::None.cpu_rate());
        assert_eq!(4.0, ThrottleSetting::FourX.cpu_rate());
    }
}
