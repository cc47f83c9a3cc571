//! hostsweep.toml configuration parser.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! a working configuration. Command-line flags are applied on top by the
//! binary.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::FrameworkInfo;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub framework: FrameworkConfig,
    pub launch: LaunchConfig,
    pub offers: OffersConfig,
    pub watchdog: WatchdogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub name: String,
    /// Empty means the manager runs tasks as the framework's current user.
    pub user: String,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            name: "install-cni".to_string(),
            user: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Minimum spacing between two launches ("2s", "500ms", "0s" to disable).
    pub interval: String,
    /// Script fetched from the payload base URL and executed on each host.
    pub script: String,
    pub interpreter: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            interval: "2s".to_string(),
            script: "install.py".to_string(),
            interpreter: "python".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffersConfig {
    /// How long the manager should withhold a declined offer's resources.
    pub refuse_seconds: f64,
}

impl Default for OffersConfig {
    fn default() -> Self {
        Self { refuse_seconds: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Warn when the run makes no progress for this long.
    pub stall_timeout: String,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            stall_timeout: "5m".to_string(),
        }
    }
}

impl InstallerConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: InstallerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every duration parses and numeric fields are in range.
    pub fn validate(&self) -> ConfigResult<()> {
        self.launch_interval()?;
        let stall = self.stall_timeout()?;
        if stall.is_zero() {
            return Err(ConfigError::Invalid {
                field: "watchdog.stall_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.offers.refuse_seconds.is_finite() || self.offers.refuse_seconds < 0.0 {
            return Err(ConfigError::Invalid {
                field: "offers.refuse_seconds",
                reason: format!("{} is not a non-negative number", self.offers.refuse_seconds),
            });
        }
        if self.launch.script.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "launch.script",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn launch_interval(&self) -> ConfigResult<Duration> {
        parse_duration(&self.launch.interval)
    }

    pub fn stall_timeout(&self) -> ConfigResult<Duration> {
        parse_duration(&self.watchdog.stall_timeout)
    }

    pub fn framework_info(&self) -> FrameworkInfo {
        FrameworkInfo {
            name: self.framework.name.clone(),
            user: self.framework.user.clone(),
        }
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let trimmed = s.trim();
    let parsed = if let Some(ms) = trimmed.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = trimmed.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = trimmed.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        trimmed.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| ConfigError::Duration(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = InstallerConfig::from_toml("").unwrap();
        assert_eq!(config, InstallerConfig::default());
        assert_eq!(config.framework.name, "install-cni");
        assert_eq!(config.launch_interval().unwrap(), Duration::from_secs(2));
        assert_eq!(config.stall_timeout().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml_str = r#"
[framework]
user = "root"

[launch]
interval = "250ms"
script = "install_agent.py"
"#;
        let config = InstallerConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.framework.name, "install-cni");
        assert_eq!(config.framework.user, "root");
        assert_eq!(config.launch.interpreter, "python");
        assert_eq!(config.launch_interval().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn zero_interval_disables_pacing() {
        let mut config = InstallerConfig::default();
        config.launch.interval = "0s".to_string();
        assert!(config.launch_interval().unwrap().is_zero());
    }

    #[test]
    fn rejects_bad_duration() {
        let err = InstallerConfig::from_toml("[watchdog]\nstall_timeout = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Duration(_)));
    }

    #[test]
    fn rejects_zero_stall_timeout() {
        let err = InstallerConfig::from_toml("[watchdog]\nstall_timeout = \"0s\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "watchdog.stall_timeout", .. }
        ));
    }

    #[test]
    fn rejects_negative_refuse_window() {
        let err = InstallerConfig::from_toml("[offers]\nrefuse_seconds = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostsweep.toml");
        std::fs::write(&path, "[framework]\nname = \"cni-rollout\"\n").unwrap();

        let config = InstallerConfig::from_file(&path).unwrap();
        assert_eq!(config.framework_info().name, "cni-rollout");
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = InstallerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn parse_duration_suffixes() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration(" 7 ").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_duration_rejects_overflowing_minutes() {
        let err = parse_duration("307445734561825861m").unwrap_err();
        assert!(matches!(err, ConfigError::Duration(_)));
        assert_eq!(
            parse_duration("307445734561825860m").unwrap(),
            Duration::from_secs(307445734561825860 * 60)
        );
    }
}
