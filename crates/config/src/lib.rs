//! Configuration management for the evmc connector host side
//!
//! This crate provides functionality for managing the host configuration, including loading,
//! saving, updating, and deleting configuration settings. The configuration lists the VM
//! modules to load and the limits the host enforces while routing calls between them.

/// Error types for the configuration module
pub mod error;

use std::path::{Path, PathBuf};

use crate::error::Error;
use evmc_common::utils::{
    env::get_env,
    io::file::{delete_path, read_file, write_file},
};
use evmc_tracing::{EvmcTracer, FileInfo, LayerInfo, LogFormat, Verbosity};
use evmc_vm::{negotiate::DEFAULT_PRECOMPILE_MAX_ADDRESS, Revision};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// The environment variable that overrides the location of the configuration file.
pub const CONFIG_PATH_ENV: &str = "EVMC_CONFIG";

/// The deepest call the host lets a VM make, as in the EVM.
pub const DEFAULT_MAX_CALL_DEPTH: i32 = 1024;

/// The [`Configuration`] struct represents the configuration of the host. Missing keys take
/// their default values.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    /// Loader configuration strings, `<path>[,<name>[=<value>]]*`, in routing order.
    pub modules: Vec<String>,

    /// Calls deeper than this fail with call depth exceeded.
    pub max_call_depth: i32,

    /// The revision used when the caller does not name one.
    #[serde(with = "revision_name")]
    pub default_revision: Revision,

    /// The highest address treated as a precompile.
    pub precompile_max_address: u16,

    /// Logging settings
    pub log: LogConfiguration,
}

/// Logging settings of the host.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfiguration {
    /// The format of log lines written to stdout.
    pub stdout_format: LogFormat,

    /// Extra comma separated filter directives, e.g. `evmc_loader=debug`.
    pub filter: String,

    /// When set, logs are also written to a rotated file in this directory.
    pub file_directory: Option<PathBuf>,

    /// The format of log lines written to the file.
    pub file_format: LogFormat,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            modules: vec![],
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            default_revision: Revision::LATEST_STABLE,
            precompile_max_address: DEFAULT_PRECOMPILE_MAX_ADDRESS,
            log: LogConfiguration::default(),
        }
    }
}

impl Default for LogConfiguration {
    fn default() -> Self {
        LogConfiguration {
            stdout_format: LogFormat::Terminal,
            filter: "".to_string(),
            file_directory: None,
            file_format: LogFormat::Json,
        }
    }
}

impl LogConfiguration {
    /// Builds a tracer for these settings. `verbosity` sets the stdout level; the file layer
    /// logs at debug.
    pub fn tracer(&self, verbosity: Verbosity) -> EvmcTracer {
        let tracer = EvmcTracer::new().with_stdout(LayerInfo::new(
            self.stdout_format,
            verbosity.directive().to_string(),
            self.filter.clone(),
            Some("always".to_string()),
        ));

        match &self.file_directory {
            Some(dir) => tracer.with_file(
                LayerInfo::new(self.file_format, "debug".to_string(), self.filter.clone(), None),
                FileInfo::in_directory(dir),
            ),
            None => tracer,
        }
    }
}

#[allow(deprecated)]
impl Configuration {
    /// The configuration file path: `$EVMC_CONFIG` if set, else `$HOME/.evmc/config.toml`.
    pub fn default_path() -> Result<PathBuf, Error> {
        if let Some(path) = get_env(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut home = std::env::home_dir().ok_or_else(|| {
            Error::Generic(
                "failed to get home directory. does your os support `std::env::home_dir()`?"
                    .to_string(),
            )
        })?;
        home.push(".evmc");
        home.push("config.toml");
        Ok(home)
    }

    /// Returns the configuration stored at the default path.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&Self::default_path()?)
    }

    /// Returns the configuration stored at `path`, creating a default file there if it doesn't
    /// exist.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        // if the config file doesn't exist, create it
        if !path.exists() {
            debug!("creating default configuration at {}", path.display());
            Configuration::default().save_to(path)?;
        }

        let contents = read_file(path_str(path)?)
            .map_err(|e| Error::Generic(format!("failed to read config file: {e}")))?;

        let config: Configuration = toml::from_str(&contents)
            .map_err(|e| Error::ParseError(format!("failed to parse config file: {e}")))?;
        config.validate()?;

        Ok(config)
    }

    /// Saves the configuration to the default path.
    pub fn save(&self) -> Result<(), Error> {
        self.save_to(&Self::default_path()?)
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        write_file(
            path_str(path)?,
            &toml::to_string(&self)
                .map_err(|e| Error::ParseError(format!("failed to serialize config: {e}")))?,
        )
        .map_err(|e| Error::Generic(format!("failed to write config file: {e}")))?;

        Ok(())
    }

    /// Deletes the configuration file at the default path.
    pub fn delete() -> Result<(), Error> {
        Self::delete_at(&Self::default_path()?)
    }

    /// Deletes the configuration file at `path`. A missing file is not an error.
    pub fn delete_at(path: &Path) -> Result<(), Error> {
        delete_path(path_str(path)?);
        Ok(())
    }

    /// Update a single key/value pair in the configuration. Nested keys are dotted, e.g.
    /// `log.filter`. Nothing is changed when the value is rejected.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let invalid = |reason: String| Error::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };

        // update the key in the struct and ensure it's the correct type
        match key {
            "modules" => {
                let modules: Vec<String> = value
                    .split(';')
                    .map(str::trim)
                    .filter(|module| !module.is_empty())
                    .map(str::to_string)
                    .collect();
                if let Some(module) = modules.iter().find(|m| m.starts_with(',')) {
                    return Err(invalid(format!("module '{module}' has no path")));
                }
                self.modules = modules;
            }
            "max_call_depth" => {
                let depth = value.parse::<i32>().map_err(|e| invalid(e.to_string()))?;
                if depth < 0 {
                    return Err(invalid("must not be negative".to_string()));
                }
                self.max_call_depth = depth;
            }
            "default_revision" => {
                self.default_revision =
                    value.parse::<Revision>().map_err(|e| invalid(e.to_string()))?;
            }
            "precompile_max_address" => {
                let parsed = match value.strip_prefix("0x") {
                    Some(hex) => u16::from_str_radix(hex, 16),
                    None => value.parse::<u16>(),
                };
                self.precompile_max_address = parsed.map_err(|e| invalid(e.to_string()))?;
            }
            "log.stdout_format" => {
                self.log.stdout_format = value.parse::<LogFormat>().map_err(invalid)?;
            }
            "log.file_format" => {
                self.log.file_format = value.parse::<LogFormat>().map_err(invalid)?;
            }
            "log.filter" => {
                self.log.filter = value.to_string();
            }
            "log.file_directory" => {
                self.log.file_directory =
                    if value.is_empty() { None } else { Some(PathBuf::from(value)) };
            }
            _ => return Err(Error::InvalidKey(key.to_string())),
        }

        info!("updated configuration! Set '{}' = '{}'.", key, value);
        Ok(())
    }

    /// Checks the invariants a deserialized configuration may violate.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_call_depth < 0 {
            return Err(Error::InvalidValue {
                key: "max_call_depth".to_string(),
                value: self.max_call_depth.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if let Some(module) = self.modules.iter().find(|m| m.is_empty() || m.starts_with(',')) {
            return Err(Error::InvalidValue {
                key: "modules".to_string(),
                value: module.clone(),
                reason: "module has no path".to_string(),
            });
        }
        Ok(())
    }
}

fn path_str(path: &Path) -> Result<&str, Error> {
    path.to_str().ok_or_else(|| Error::Generic("failed to convert path to string".to_string()))
}

/// Stores a [`Revision`] under its lowercase name.
mod revision_name {
    use evmc_vm::Revision;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        revision: &Revision,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(revision.name())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Revision, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn scratch_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("evmc").join("config.toml");
        (dir, path)
    }

    // Test default configuration
    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert!(config.modules.is_empty());
        assert_eq!(config.max_call_depth, 1024);
        assert_eq!(config.default_revision, Revision::Cancun);
        assert_eq!(config.precompile_max_address, 0x0a);
        assert_eq!(config.log.stdout_format, LogFormat::Terminal);
        assert_eq!(config.log.file_directory, None);
    }

    // Test loading configuration from a file that doesn't exist yet
    #[test]
    fn test_load_creates_default() {
        let (_dir, path) = scratch_path();
        let config = Configuration::load_from(&path).expect("failed to load config file");

        assert!(path.exists());
        assert_eq!(config, Configuration::default());
    }

    // Test saving configuration to a file
    #[test]
    fn test_save_configuration() {
        let (_dir, path) = scratch_path();
        let mut config = Configuration::default();
        config.update("modules", "./libscript.so,verbose=true; ./libother.so").expect("modules");
        config.update("default_revision", "shanghai").expect("default_revision");
        config.update("precompile_max_address", "0x11").expect("precompile_max_address");
        config.update("log.stdout_format", "json").expect("log.stdout_format");
        config.save_to(&path).expect("failed to save config file");

        let loaded = Configuration::load_from(&path).expect("failed to load config file");
        assert_eq!(loaded.modules, vec!["./libscript.so,verbose=true", "./libother.so"]);
        assert_eq!(loaded.default_revision, Revision::Shanghai);
        assert_eq!(loaded.precompile_max_address, 0x11);
        assert_eq!(loaded.log.stdout_format, LogFormat::Json);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let (_dir, path) = scratch_path();
        write_file(
            path.to_str().expect("utf8 path"),
            "max_call_depth = 16\ndefault_revision = \"london\"\n\n[log]\nfilter = \"evmc_loader=debug\"\n",
        )
        .expect("failed to write config file");

        let config = Configuration::load_from(&path).expect("failed to load config file");
        assert_eq!(config.max_call_depth, 16);
        assert_eq!(config.default_revision, Revision::London);
        assert_eq!(config.precompile_max_address, 0x0a);
        assert_eq!(config.log.filter, "evmc_loader=debug");
        assert_eq!(config.log.stdout_format, LogFormat::Terminal);
    }

    #[test]
    fn test_load_rejects_invalid_files() {
        let (_dir, path) = scratch_path();
        let path_str = path.to_str().expect("utf8 path");

        write_file(path_str, "default_revision = \"atlantis\"\n").expect("write");
        assert!(matches!(Configuration::load_from(&path), Err(Error::ParseError(_))));

        write_file(path_str, "max_call_depth = -1\n").expect("write");
        assert!(matches!(Configuration::load_from(&path), Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn test_update_rejects_bad_values() {
        let mut config = Configuration::default();

        assert!(matches!(config.update("rpc_url", "x"), Err(Error::InvalidKey(_))));
        assert!(config.update("max_call_depth", "-3").is_err());
        assert!(config.update("max_call_depth", "deep").is_err());
        assert!(config.update("default_revision", "atlantis").is_err());
        assert!(config.update("precompile_max_address", "0x10000").is_err());
        assert!(config.update("log.stdout_format", "yaml").is_err());
        assert!(config.update("modules", ",verbose=true").is_err());
        assert_eq!(config, Configuration::default());

        let error = config.update("max_call_depth", "-3").expect_err("must be rejected");
        assert_eq!(error.to_string(), "invalid value '-3' for 'max_call_depth': must not be negative");
    }

    #[test]
    fn test_update_log_directory() {
        let mut config = Configuration::default();
        config.update("log.file_directory", "/var/log/evmc").expect("log.file_directory");
        assert_eq!(config.log.file_directory, Some(PathBuf::from("/var/log/evmc")));
        config.update("log.file_directory", "").expect("log.file_directory");
        assert_eq!(config.log.file_directory, None);
    }

    // Test deleting configuration file
    #[test]
    fn test_delete_configuration() {
        let (_dir, path) = scratch_path();
        let mut config = Configuration::load_from(&path).expect("failed to load config file");
        config.update("max_call_depth", "8").expect("max_call_depth");
        config.save_to(&path).expect("failed to save config file");

        Configuration::delete_at(&path).expect("failed to delete config file");
        assert!(!path.exists());
        let config = Configuration::load_from(&path).expect("failed to load config file");
        assert_eq!(config.max_call_depth, 1024);
    }

    #[test]
    #[serial]
    fn test_env_overrides_default_path() {
        let (_dir, path) = scratch_path();
        std::env::set_var(CONFIG_PATH_ENV, &path);

        assert_eq!(Configuration::default_path().expect("default path"), path);
        let mut config = Configuration::load().expect("failed to load config file");
        config.update("max_call_depth", "12").expect("max_call_depth");
        config.save().expect("failed to save config file");
        assert_eq!(Configuration::load_from(&path).expect("load").max_call_depth, 12);
        Configuration::delete().expect("failed to delete config file");
        assert!(!path.exists());

        std::env::remove_var(CONFIG_PATH_ENV);
    }

    #[test]
    fn test_log_configuration_builds_tracer() {
        let mut log = LogConfiguration::default();
        let tracer = log.tracer(Verbosity::new(2, false));
        assert!(format!("{tracer:?}").contains("Terminal"));

        log.file_directory = Some(PathBuf::from("/tmp/evmc-logs"));
        let tracer = log.tracer(Verbosity::new(2, false));
        assert!(format!("{tracer:?}").contains("evmc.log"));
    }
}
