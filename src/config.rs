//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/corefile/corefile.toml`
//! 3. Explicit config file given with `--config`
//! 4. Environment variables: `COREFILE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Commands driving the DNS server process.
///
/// Each command is a program followed by its arguments; an empty command is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkloadConfig {
    pub start_command: Vec<String>,
    pub stop_command: Vec<String>,
}

/// Unified configuration for corefile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Persisted Corefiles and zone files
    pub state_file: PathBuf,
    /// Where the rendered Corefile is pushed
    pub corefile_path: PathBuf,
    /// Script applied by `start`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_file: Option<PathBuf>,
    /// Where zone files are pushed as `db.<name>`; not pushed when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zonefile_dir: Option<PathBuf>,
    pub workload: WorkloadConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            corefile_path: PathBuf::from("/etc/coredns/Corefile"),
            script_file: None,
            zonefile_dir: None,
            workload: WorkloadConfig::default(),
        }
    }
}

fn default_state_file() -> PathBuf {
    ProjectDirs::from("", "", "corefile")
        .map(|dirs| dirs.data_dir().join("state.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.local/share/corefile/state.toml"))
}

/// Get the XDG config directory for corefile.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "corefile").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("corefile.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`, keeping the input when a variable is undefined.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_vars(path.to_string_lossy().as_ref()))
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.state_file = expand_path(&self.state_file);
        self.corefile_path = expand_path(&self.corefile_path);
        self.script_file = self.script_file.as_deref().map(expand_path);
        self.zonefile_dir = self.zonefile_dir.as_deref().map(expand_path);
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file, which must exist
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/corefile/corefile.toml`
    /// 3. Explicit config file
    /// 4. Environment variables: `COREFILE_*` prefix, `__` between sections,
    ///    commands split on spaces (`COREFILE_WORKLOAD__START_COMMAND="coredns -conf /etc/coredns/Corefile"`)
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default(
                "state_file",
                defaults.state_file.to_string_lossy().to_string(),
            )
            .map_err(config_err)?
            .set_default(
                "corefile_path",
                defaults.corefile_path.to_string_lossy().to_string(),
            )
            .map_err(config_err)?
            .set_default("workload.start_command", Vec::<String>::new())
            .map_err(config_err)?
            .set_default("workload.stop_command", Vec::<String>::new())
            .map_err(config_err)?;

        if let Some(global_path) = global_config_path() {
            builder = builder.add_source(File::from(global_path).required(false));
        }

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("COREFILE")
                .separator("__")
                .try_parsing(true)
                .list_separator(" ")
                .with_list_parse_key("workload.start_command")
                .with_list_parse_key("workload.stop_command"),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        settings.expand_paths();

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# corefile configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/corefile/corefile.toml
#   Explicit: --config <file>
#   Env:      COREFILE_* environment variables (COREFILE_WORKLOAD__START_COMMAND, ...)

# Persisted Corefiles and zone files
# state_file = "~/.local/share/corefile/state.toml"

# Where the rendered Corefile is written
# corefile_path = "/etc/coredns/Corefile"

# Script applied by `corefile start`
# script_file = "~/coredns/actions.txt"

# Zone files are written here as db.<name>
# zonefile_dir = "/etc/coredns"

[workload]
# Program and arguments; an empty list is skipped
# start_command = ["systemctl", "start", "coredns"]
# stop_command = ["systemctl", "stop", "coredns"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_when_created_then_no_script_and_no_commands() {
        let settings = Settings::default();
        assert!(settings.script_file.is_none());
        assert!(settings.workload.start_command.is_empty());
        assert_eq!(settings.corefile_path, PathBuf::from("/etc/coredns/Corefile"));
        assert!(settings.state_file.ends_with("state.toml"));
    }

    #[test]
    fn given_tilde_in_paths_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            state_file: PathBuf::from("~/.corefile/state.toml"),
            script_file: Some(PathBuf::from("~/actions.txt")),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let state = settings.state_file.to_string_lossy();
        assert!(
            state.starts_with(&home),
            "state_file should start with home dir: {}",
            state
        );
        assert!(!state.contains('~'));
        assert!(settings
            .script_file
            .as_ref()
            .is_some_and(|p| p.starts_with(&home)));
    }

    #[test]
    fn given_env_var_in_path_when_expand_paths_then_expands_variable() {
        let mut settings = Settings {
            corefile_path: PathBuf::from("${HOME}/Corefile"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.corefile_path.starts_with(&home));
    }

    #[test]
    fn given_undefined_variable_when_expanding_then_input_kept() {
        assert_eq!(
            expand_env_vars("$COREFILE_SURELY_UNDEFINED_VAR/x"),
            "$COREFILE_SURELY_UNDEFINED_VAR/x"
        );
    }

    #[test]
    fn given_template_when_parsed_then_valid_toml() {
        let template = Settings::template();
        let parsed: Settings = toml::from_str(&template).expect("template should parse");
        assert_eq!(parsed.workload, WorkloadConfig::default());
    }
}
