use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::format::LineStyle;
use crate::normalize::MessagePolicy;

/// Log source used when none is configured
pub const DEFAULT_LOG_NAME: &str = "Application";

/// Diagnostic log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "off" | "none" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Trace => log::LevelFilter::Trace,
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warn => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
            Self::Off => log::LevelFilter::Off,
        }
    }
}

/// Settings read by every formatting call. Built once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattingConfig {
    pub style: LineStyle,
    pub policy: MessagePolicy,
    pub use_color: bool,
    pub log_name: String,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            style: LineStyle::default(),
            policy: MessagePolicy::default(),
            use_color: false,
            log_name: DEFAULT_LOG_NAME.to_string(),
        }
    }
}

/// Raw values as they appear in the environment or on the command line.
///
/// Every field is optional; absent values fall through to the config file, then defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub format: Option<String>,
    pub msgout: Option<String>,
    pub log_name: Option<String>,
    pub use_color: Option<String>,
    pub log_level: Option<String>,
}

/// On-disk configuration (`winlogstream.yaml`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub format: Option<String>,
    pub msgout: Option<String>,
    pub logname: Option<String>,
    pub usecolor: Option<bool>,
    pub log_level: Option<String>,
}

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Config {
    pub formatting: FormattingConfig,
    pub log_level: LogLevel,
    /// File the values were merged from, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration: overrides first, then the config file, then defaults
    pub fn load(config_path: Option<&PathBuf>, overrides: &Overrides) -> Result<Self> {
        let (file, source) = Self::find_file(config_path)?;
        let mut config = Self::resolve(file, overrides);
        config.source = source;
        Ok(config)
    }

    /// Merge overrides over file values. Unrecognized names fall back to defaults.
    pub fn resolve(file: FileConfig, overrides: &Overrides) -> Self {
        let format = pick(&overrides.format, &file.format);
        let msgout = pick(&overrides.msgout, &file.msgout);
        let log_name = pick(&overrides.log_name, &file.logname)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_LOG_NAME);
        let use_color = match overrides.use_color.as_deref().filter(|value| !value.trim().is_empty()) {
            Some(value) => is_true(value),
            None => file.usecolor.unwrap_or(false),
        };
        let log_level = pick(&overrides.log_level, &file.log_level)
            .and_then(LogLevel::from_name)
            .unwrap_or_default();

        Self {
            formatting: FormattingConfig {
                style: format.map(LineStyle::from_name).unwrap_or_default(),
                policy: msgout.map(MessagePolicy::from_name).unwrap_or_default(),
                use_color,
                log_name: log_name.to_string(),
            },
            log_level,
            source: None,
        }
    }

    fn find_file(config_path: Option<&PathBuf>) -> Result<(FileConfig, Option<PathBuf>)> {
        // An explicit path must load
        if let Some(path) = config_path {
            let file = Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?;
            return Ok((file, Some(path.clone())));
        }

        let mut candidates = Vec::new();
        if let Ok(env_path) = std::env::var("WINLOGSTREAM_CONFIG") {
            candidates.push(PathBuf::from(env_path));
        }
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("winlogstream").join("winlogstream.yaml"));
        }
        candidates.push(PathBuf::from("winlogstream.yaml"));

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(file) => return Ok((file, Some(path))),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }

        Ok((FileConfig::default(), None))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        // An empty file deserializes to unit, not a mapping
        if content.trim().is_empty() {
            return Ok(FileConfig::default());
        }

        let file: FileConfig = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(file)
    }
}

fn pick<'a>(primary: &'a Option<String>, fallback: &'a Option<String>) -> Option<&'a str> {
    primary
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .or(fallback.as_deref())
}

fn is_true(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn overrides(format: &str, msgout: &str, log_name: &str, use_color: &str) -> Overrides {
        Overrides {
            format: Some(format.to_string()),
            msgout: Some(msgout.to_string()),
            log_name: Some(log_name.to_string()),
            use_color: Some(use_color.to_string()),
            log_level: None,
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(FileConfig::default(), &Overrides::default());
        assert_eq!(config.formatting, FormattingConfig::default());
        assert_eq!(config.formatting.style, LineStyle::Simple);
        assert_eq!(config.formatting.policy, MessagePolicy::SingleLine);
        assert_eq!(config.formatting.log_name, "Application");
        assert!(!config.formatting.use_color);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_overrides_are_case_insensitive() {
        let config = Config::resolve(FileConfig::default(), &overrides("RFC5424", "SingleLineTrim", "System", "TRUE"));
        assert_eq!(config.formatting.style, LineStyle::Rfc5424);
        assert_eq!(config.formatting.policy, MessagePolicy::SingleLineTrim);
        assert_eq!(config.formatting.log_name, "System");
        assert!(config.formatting.use_color);
    }

    #[test]
    fn test_unrecognized_values_fall_back() {
        let config = Config::resolve(FileConfig::default(), &overrides("xml", "wrapped", "", "yes"));
        assert_eq!(config.formatting.style, LineStyle::Simple);
        assert_eq!(config.formatting.policy, MessagePolicy::SingleLine);
        assert_eq!(config.formatting.log_name, "Application");
        assert!(!config.formatting.use_color);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = FileConfig {
            format: Some("rfc5424".to_string()),
            msgout: Some("full".to_string()),
            logname: Some("Security".to_string()),
            usecolor: Some(true),
            log_level: Some("debug".to_string()),
        };
        let ov = Overrides {
            format: Some("simple".to_string()),
            use_color: Some("false".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(file, &ov);
        assert_eq!(config.formatting.style, LineStyle::Simple);
        assert_eq!(config.formatting.policy, MessagePolicy::Full);
        assert_eq!(config.formatting.log_name, "Security");
        assert!(!config.formatting.use_color);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("winlogstream.yaml");
        fs::write(&path, "format: rfc5424\nmsgout: singlelinetrim\nlogname: System\nusecolor: true\n").unwrap();

        let config = Config::load(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(config.formatting.style, LineStyle::Rfc5424);
        assert_eq!(config.formatting.policy, MessagePolicy::SingleLineTrim);
        assert_eq!(config.formatting.log_name, "System");
        assert!(config.formatting.use_color);
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "").unwrap();

        let config = Config::load(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(config.formatting, FormattingConfig::default());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yaml");
        assert!(Config::load(Some(&path), &Overrides::default()).is_err());
    }

    #[test]
    fn test_load_explicit_invalid_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "usecolor: [not, a, bool]\n").unwrap();
        assert!(Config::load(Some(&path), &Overrides::default()).is_err());
    }

    #[test]
    fn test_log_level_from_name() {
        assert_eq!(LogLevel::from_name("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_name("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_name("loud"), None);
        assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
    }
}
