use failure::Fail;
use log::LevelFilter;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};
use toml;

use crate::{
    permissions::{ActorProfile, StaticDirectory},
    utils::SingleInit,
    workflow::Settings,
};

static CONFIG: SingleInit<Config> = SingleInit::uninit();

/// Load configuration from `config.toml` in the working directory.
///
/// Configuration is only read once; every call after the first successful one
/// returns the same configuration.
pub fn load() -> crate::Result<&'static Config> {
    CONFIG.get_or_try_init(|| Config::from_file("config.toml"))
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub database: Option<Database>,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub workflow: Settings,
    /// Actors known to this installation.
    #[serde(default, rename = "actor")]
    pub actors: Vec<ActorProfile>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
        let data = fs::read(path).map_err(ReadConfigurationError)?;
        Config::from_slice(&data)
    }

    pub fn from_slice(data: &[u8]) -> crate::Result<Config> {
        let config: Config = toml::from_slice(data).map_err(ConfigurationError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration correctness.
    pub fn validate(&self) -> Result<(), InvalidActorsError> {
        let mut ids = self.actors.iter().map(|a| a.id).collect::<Vec<_>>();
        ids.sort();

        for pair in ids.windows(2) {
            if pair[0] == pair[1] {
                return Err(InvalidActorsError(pair[0]));
            }
        }

        Ok(())
    }

    /// Build a directory of configured actors.
    pub fn directory(&self) -> StaticDirectory {
        self.actors.iter().cloned().collect()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Database {
    pub url: String,
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    /// Default logging level.
    #[serde(default = "default_level_filter")]
    pub level: LevelFilter,
    /// Custom filters.
    #[serde(default)]
    pub filters: HashMap<String, LevelFilter>,
}

#[derive(Debug, Fail)]
#[fail(display = "Cannot read configuration file")]
pub struct ReadConfigurationError(#[fail(cause)] std::io::Error);

#[derive(Debug, Fail)]
#[fail(display = "Invalid configuration: {}", _0)]
pub struct ConfigurationError(#[fail(cause)] toml::de::Error);

#[derive(Debug, Fail)]
#[fail(display = "Invalid configuration: actor {} is defined more than once", _0)]
pub struct InvalidActorsError(i32);

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_level_filter(),
            filters: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Directory, Role};

    #[test]
    fn parses_full_configuration() {
        let config = Config::from_slice(br#"
            [database]
            url = "postgres://docflow@localhost/docflow"

            [logging]
            level = "debug"
            filters = { docflow = "trace" }

            [workflow]
            audit-denied = false
            reminder-after-days = 5

            [[actor]]
            id = 1
            name = "Alice"
            role = "admin"

            [[actor]]
            id = 2
            name = "Bob"
            role = "manager"
            department = "Quality"
            department-head = true
        "#).unwrap();

        assert_eq!(config.logging.level, LevelFilter::Debug);
        assert_eq!(config.logging.filters["docflow"], LevelFilter::Trace);
        assert!(!config.workflow.audit_denied);
        assert_eq!(config.workflow.reminder_after_days, 5);

        let directory = config.directory();
        let bob = directory.profile(2).unwrap();
        assert_eq!(bob.role, Role::Manager);
        assert!(bob.department_head);
        assert!(bob.active);
    }

    #[test]
    fn everything_but_database_is_optional() {
        let config = Config::from_slice(b"").unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.logging.level, LevelFilter::Info);
        assert!(config.workflow.audit_denied);
        assert_eq!(config.workflow.reminder_after_days, 3);
        assert!(config.actors.is_empty());
    }

    #[test]
    fn duplicate_actors_are_rejected() {
        let result = Config::from_slice(br#"
            [[actor]]
            id = 1
            name = "Alice"
            role = "admin"

            [[actor]]
            id = 1
            name = "Alicia"
            role = "user"
        "#);
        assert!(result.is_err());
    }
}
