//! Command line configuration
//!
//! Read from TOML, by default at `<config dir>/vortex/config.toml`.
//! Every field is optional; missing ones take their defaults.

use crate::time::Fraction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub query: QueryConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// First cycle to query, as a rational such as `"1/2"`
    pub begin: Fraction,
    pub cycles: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub onsets_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            begin: Fraction::zero(),
            cycles: 1,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: OutputFormat::Text,
            onsets_only: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            ConfigError::Parse(path, e) => write!(f, "invalid config {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(_, e) => Some(e),
        }
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        content
            .parse()
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// `<config dir>/vortex/config.toml`, when the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vortex").join("config.toml"))
    }

    /// Load `explicit` if given, else the default file if it exists, else
    /// the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Config::load(path);
        }
        match Config::default_path() {
            Some(path) if path.is_file() => Config::load(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.query.begin, Fraction::zero());
        assert_eq!(config.query.cycles, 1);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(!config.output.onsets_only);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_file() {
        let config: Config = r#"
            [query]
            begin = "1/2"

            [output]
            format = "json"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.query.begin, Fraction::new(1, 2));
        assert_eq!(config.query.cycles, 1);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[query]\ncycles = 4\n[logging]\nlevel = \"debug\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.query.cycles, 4);
        assert_eq!(config.logging.level, "debug");

        let same = Config::discover(Some(file.path())).unwrap();
        assert_eq!(same, config);
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io(..))));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[query]\ncycles = \"many\"").unwrap();
        let err = Config::load(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.query.begin = Fraction::new(3, 4);
        let text = config.to_toml().unwrap();
        assert!(text.contains("begin = \"3/4\""));
        assert_eq!(text.parse::<Config>().unwrap(), config);
    }
}
