//! Layered configuration: defaults, then TOML file, then environment and CLI.
//!
//! Environment variables are read through clap's `env` support, so a flag
//! always wins over its variable and both win over the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{Address, AddressParseError};

/// Command line / environment overrides.
#[derive(clap::Parser, Debug, Clone, Default)]
#[command(name = "token-analytics", version, about)]
pub struct ConfigArgs {
    /// TOML configuration file.
    #[arg(long, env = "TOKEN_ANALYTICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Privileged identity for a fresh ledger (64 hex chars).
    #[arg(long, env = "TOKEN_ANALYTICS_ADMIN")]
    pub admin: Option<String>,

    /// JSON state file loaded at start and written on shutdown.
    #[arg(long, env = "TOKEN_ANALYTICS_STATE")]
    pub state: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(
        long,
        env = "TOKEN_ANALYTICS_LOG_JSON",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid admin address: {0}")]
    Admin(#[from] AddressParseError),
}

/// File layout. Every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    admin: Option<String>,
    state_path: Option<PathBuf>,
    #[serde(default)]
    log: LogFile,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct LogFile {
    json: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub json: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Required only when no state file exists yet.
    pub admin: Option<Address>,
    pub state_path: Option<PathBuf>,
    pub log: LogConfig,
}

impl Config {
    pub fn build(args: ConfigArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => Self::read_file(path)?,
            None => ConfigFile::default(),
        };

        let admin = match args.admin.or(file.admin) {
            Some(text) => Some(text.parse()?),
            None => None,
        };

        Ok(Self {
            admin,
            state_path: args.state.or(file.state_path),
            log: LogConfig {
                json: args.log_json.or(file.log.json).unwrap_or(false),
            },
        })
    }

    fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    const ADMIN_HEX: &str = "adadadadadadadadadadadadadadadadadadadadadadadadadadadadadadadad";

    #[test]
    fn test_defaults() -> TestResult {
        let config = Config::build(ConfigArgs::default())?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_file_values() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("admin = \"{ADMIN_HEX}\"\nstate_path = \"/var/lib/ledger.json\"\n\n[log]\njson = true\n"),
        )?;

        let config = Config::build(ConfigArgs {
            config: Some(path),
            ..Default::default()
        })?;
        assert_eq!(config.admin, Some(Address::new([0xAD; 32])));
        assert_eq!(config.state_path, Some(PathBuf::from("/var/lib/ledger.json")));
        assert!(config.log.json);
        Ok(())
    }

    #[test]
    fn test_args_override_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "state_path = \"from-file.json\"\n[log]\njson = true\n")?;

        let config = Config::build(ConfigArgs {
            config: Some(path),
            admin: Some(format!("0x{ADMIN_HEX}")),
            state: Some(PathBuf::from("from-args.json")),
            log_json: Some(false),
        })?;
        assert_eq!(config.admin, Some(Address::new([0xAD; 32])));
        assert_eq!(config.state_path, Some(PathBuf::from("from-args.json")));
        assert!(!config.log.json);
        Ok(())
    }

    #[test]
    fn test_unknown_key_rejected() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "admn = \"typo\"\n")?;
        let result = Config::build(ConfigArgs {
            config: Some(path),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }

    #[test]
    fn test_bare_log_json_flag() -> TestResult {
        use clap::Parser;

        let args = ConfigArgs::try_parse_from(["token-analytics", "--log-json", "--state", "s.json"])?;
        assert_eq!(args.log_json, Some(true));
        assert_eq!(args.state, Some(PathBuf::from("s.json")));
        Ok(())
    }

    #[test]
    fn test_bad_admin_rejected() {
        let result = Config::build(ConfigArgs {
            admin: Some("xyz".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::Admin(_))));
    }

    #[test]
    fn test_missing_file_reported() {
        let result = Config::build(ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/token-analytics.toml")),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
