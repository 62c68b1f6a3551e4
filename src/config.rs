//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/condtree/condtree.toml`
//! 3. Explicit config file (`--config` / `CONDTREE_CONFIG`)
//! 4. Environment variables: `CONDTREE_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::RebuildMode;

/// How stored searches are rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RebuildSettings {
    /// Reject malformed rows instead of repairing them
    pub strict: bool,
}

impl Default for RebuildSettings {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Terminal output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputSettings {
    /// Colorize status messages
    pub color: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Effective application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// SQLite database holding saved searches
    pub database: PathBuf,
    pub rebuild: RebuildSettings,
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            rebuild: RebuildSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

/// Config file contents; `None` means "not specified, keep the lower layer".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    database: Option<PathBuf>,
    rebuild: RawRebuildSettings,
    output: RawOutputSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRebuildSettings {
    strict: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOutputSettings {
    color: Option<bool>,
}

/// Get the default database location (`<data_dir>/searches.db`).
fn default_database_path() -> PathBuf {
    ProjectDirs::from("", "", "condtree")
        .map(|dirs| dirs.data_dir().join("searches.db"))
        .unwrap_or_else(|| PathBuf::from("~/.condtree/searches.db"))
}

/// Get the XDG config directory for condtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "condtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("condtree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is returned unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Rebuild mode implied by `rebuild.strict`.
    pub fn rebuild_mode(&self) -> RebuildMode {
        if self.rebuild.strict {
            RebuildMode::Strict
        } else {
            RebuildMode::Lenient
        }
    }

    /// Expand shell variables and tilde in the database path.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.database.to_string_lossy().as_ref());
        self.database = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            database: overlay
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
            rebuild: RebuildSettings {
                strict: overlay.rebuild.strict.unwrap_or(self.rebuild.strict),
            },
            output: OutputSettings {
                color: overlay.output.color.unwrap_or(self.output.color),
            },
        }
    }

    /// Load settings with layered precedence from the real environment.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), explicit, None)
    }

    /// Load settings from the given layers.
    ///
    /// `env` replaces the process environment as source of `CONDTREE_*`
    /// overrides when given.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. `global`, skipped if it doesn't exist
    /// 3. `explicit`, which must exist
    /// 4. Environment variables
    pub fn load_from(
        global: Option<&Path>,
        explicit: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global.filter(|p| p.exists()) {
            let raw = load_raw_settings(global_path)?;
            current = current.merge_with(&raw);
        }

        // 3. Explicit config file
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current, env)?;

        current.expand_paths();
        Ok(current)
    }

    /// Apply CONDTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(
        mut settings: Self,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("CONDTREE")
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("database") {
            settings.database = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("rebuild.strict") {
            settings.rebuild.strict = val;
        }
        if let Ok(val) = config.get_bool("output.color") {
            settings.output.color = val;
        }

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
        r#"# condtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/condtree/condtree.toml
#   Explicit: --config <file> or CONDTREE_CONFIG
#   Env:      CONDTREE_DATABASE, CONDTREE_REBUILD__STRICT, CONDTREE_OUTPUT__COLOR

# SQLite database holding saved searches
# database = "~/.local/share/condtree/searches.db"

[rebuild]
# Reject rows that don't form a well-nested tree (false: repair and warn)
# strict = true

[output]
# color = true
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
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load_from(None, None, Some(config::Map::new())).unwrap();
        assert!(settings.rebuild.strict);
        assert!(settings.output.color);
        assert!(settings.database.to_string_lossy().ends_with("searches.db"));
    }

    #[test]
    fn given_tilde_in_database_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            database: PathBuf::from("~/searches.db"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let database = settings.database.to_string_lossy();
        assert!(database.starts_with(&home), "database should start with home dir: {}", database);
        assert!(!database.contains('~'));
    }

    #[test]
    fn given_lenient_setting_when_asking_mode_then_lenient() {
        let mut settings = Settings::default();
        settings.rebuild.strict = false;
        assert_eq!(settings.rebuild_mode(), RebuildMode::Lenient);
    }

    #[test]
    fn given_settings_when_rendering_toml_then_contains_sections() {
        let toml = Settings::default().to_toml().unwrap();
        assert!(toml.contains("[rebuild]"));
        assert!(toml.contains("strict = true"));
    }
}
