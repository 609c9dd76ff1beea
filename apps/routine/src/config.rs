//! # Configuration
//!
//! Where the store lives and which backend holds it.
//!
//! Resolved per field, first match wins:
//! 1. command-line flag (`--database`, `--backend`)
//! 2. environment (`ROUTINE_DATABASE`, `ROUTINE_BACKEND`)
//! 3. TOML file (`--config`, else `ROUTINE_CONFIG`, else `routine.toml` if present)
//! 4. built-in default (`routine.db`, redb)
//!
//! ```toml
//! database = "/home/me/.local/share/routine.db"
//! backend = "file"
//! ```

use crate::error::AppError;
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_DATABASE: &str = "ROUTINE_DATABASE";
pub const ENV_BACKEND: &str = "ROUTINE_BACKEND";
pub const ENV_CONFIG: &str = "ROUTINE_CONFIG";

pub const DEFAULT_DATABASE: &str = "routine.db";
pub const DEFAULT_CONFIG_FILE: &str = "routine.toml";

/// Config files larger than this are rejected unread.
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Storage backend for the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database (ACID, updated in place)
    #[default]
    Redb,
    /// Single snapshot file, rewritten after every change
    File,
}

impl Backend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::File => "file",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "redb" => Ok(Self::Redb),
            "file" => Ok(Self::File),
            other => Err(AppError::UnknownBackend(other.to_string())),
        }
    }
}

/// Contents of a `routine.toml` file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database: Option<PathBuf>,
    pub backend: Option<Backend>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let metadata = std::fs::metadata(path).map_err(AppError::io("Cannot read config", path))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(AppError::ConfigTooLarge {
                size: metadata.len(),
                max: MAX_CONFIG_FILE_SIZE,
            });
        }
        let text =
            std::fs::read_to_string(path).map_err(AppError::io("Cannot read config", path))?;
        Self::parse(&text)
    }
}

/// Overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub config: Option<PathBuf>,
}

/// The resolved configuration a command runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub backend: Backend,
}

impl Settings {
    /// Resolve against the process environment.
    pub fn resolve(overrides: CliOverrides) -> Result<Self, AppError> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// An explicitly named config file must exist; the default
    /// `routine.toml` is only read when present.
    pub fn resolve_with(
        overrides: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let explicit = overrides
            .config
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from));
        let file = match explicit {
            Some(path) => FileConfig::load(&path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    FileConfig::load(default)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let env_backend = env(ENV_BACKEND)
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.parse::<Backend>())
            .transpose()?;
        let env_database = env(ENV_DATABASE)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            database: overrides
                .database
                .or(env_database)
                .or(file.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            backend: overrides
                .backend
                .or(env_backend)
                .or(file.backend)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("routine.toml");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn defaults_without_any_source() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "");
        let settings = Settings::resolve_with(
            CliOverrides {
                config: Some(config),
                ..CliOverrides::default()
            },
            env_of(&[]),
        )
        .unwrap();
        assert_eq!(settings.database, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(settings.backend, Backend::Redb);
    }

    #[test]
    fn file_then_env_then_flag() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "database = \"from-file.db\"\nbackend = \"file\"\n");

        let from_file = Settings::resolve_with(
            CliOverrides {
                config: Some(config.clone()),
                ..CliOverrides::default()
            },
            env_of(&[]),
        )
        .unwrap();
        assert_eq!(from_file.database, PathBuf::from("from-file.db"));
        assert_eq!(from_file.backend, Backend::File);

        let from_env = Settings::resolve_with(
            CliOverrides {
                config: Some(config.clone()),
                ..CliOverrides::default()
            },
            env_of(&[(ENV_DATABASE, "from-env.db"), (ENV_BACKEND, "redb")]),
        )
        .unwrap();
        assert_eq!(from_env.database, PathBuf::from("from-env.db"));
        assert_eq!(from_env.backend, Backend::Redb);

        let from_flag = Settings::resolve_with(
            CliOverrides {
                database: Some(PathBuf::from("from-flag.db")),
                backend: Some(Backend::File),
                config: Some(config),
            },
            env_of(&[(ENV_DATABASE, "from-env.db"), (ENV_BACKEND, "redb")]),
        )
        .unwrap();
        assert_eq!(from_flag.database, PathBuf::from("from-flag.db"));
        assert_eq!(from_flag.backend, Backend::File);
    }

    #[test]
    fn config_path_from_env() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "backend = \"file\"\n");
        let settings = Settings::resolve_with(
            CliOverrides::default(),
            env_of(&[(ENV_CONFIG, config.to_str().unwrap())]),
        )
        .unwrap();
        assert_eq!(settings.backend, Backend::File);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = Settings::resolve_with(
            CliOverrides {
                config: Some(dir.path().join("nope.toml")),
                ..CliOverrides::default()
            },
            env_of(&[]),
        );
        assert!(matches!(result, Err(AppError::Io { .. })));
    }

    #[test]
    fn unknown_keys_and_backends_rejected() {
        assert!(matches!(
            FileConfig::parse("databse = \"typo.db\""),
            Err(AppError::InvalidConfig(_))
        ));
        assert!(FileConfig::parse("backend = \"sqlite\"").is_err());
        assert!(matches!(
            "sqlite".parse::<Backend>(),
            Err(AppError::UnknownBackend(name)) if name == "sqlite"
        ));
        assert_eq!(" file ".parse::<Backend>().unwrap(), Backend::File);
    }
}
