//! Configuration module for the workspace watcher.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `UI5_WATCH_` and use double
//! underscores to separate nested levels:
//! - `UI5_WATCH_WATCH__DEBOUNCE_MS=100` sets `watch.debounce_ms`
//! - `UI5_WATCH_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding the workspace-local settings file.
pub const CONFIG_DIR: &str = ".ui5-watch";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

const ENV_PREFIX: &str = "UI5_WATCH_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .ui5-watch is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Watch session configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Glob patterns whose matches never reach project discovery
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Quiet period before an added/changed path is dispatched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How often pending debounced events are checked
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `ui5_watch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_tick_ms() -> u64 {
    100
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
        "**/dist/**".to_string(),
        format!("**/{CONFIG_DIR}/**"),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            debounce_ms: default_debounce_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let current = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_for(&current)
    }

    /// Load the configuration governing `dir`: the nearest `.ui5-watch`
    /// at or above it, else defaults and environment only.
    pub fn load_for(dir: &Path) -> Result<Self, Box<figment::Error>> {
        let workspace = Self::find_config_root(dir);
        let config_path = workspace
            .as_deref()
            .unwrap_or(dir)
            .join(CONFIG_DIR)
            .join(CONFIG_FILE);

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = workspace;
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Nearest directory at or above `dir` that holds a .ui5-watch directory
    fn find_config_root(dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Get the workspace root directory (where .ui5-watch is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_config_root(&current)
    }

    /// Workspace root to watch: configured value, else the current directory.
    pub fn resolved_workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.watch.debounce_ms, 300);
        assert!(
            settings
                .watch
                .exclude
                .contains(&"**/node_modules/**".to_string())
        );
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2
workspace_root = "/ws"

[watch]
exclude = ["custom/**"]
debounce_ms = 50

[logging]
default = "debug"

[logging.modules]
"ui5_watch::watcher" = "trace"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.workspace_root, Some(PathBuf::from("/ws")));
        // Custom patterns replace the defaults
        assert_eq!(settings.watch.exclude, vec!["custom/**"]);
        assert_eq!(settings.watch.debounce_ms, 50);
        assert_eq!(settings.watch.tick_ms, 100);
        assert_eq!(settings.logging.default, "debug");
        assert_eq!(settings.logging.modules["ui5_watch::watcher"], "trace");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[watch]\ndebounce_ms = 10\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.watch.debounce_ms, 10);
        assert_eq!(settings.watch.exclude, default_exclude());
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 42;
        settings.watch.exclude = vec!["build/**".to_string()];

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 42);
        assert_eq!(loaded.watch.exclude, vec!["build/**"]);
    }

    #[test]
    fn test_load_for_uses_nearest_workspace_config() {
        let temp_dir = TempDir::new().unwrap();
        let ws = temp_dir.path().join("ws");
        let nested = ws.join("apps/app1");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(ws.join(CONFIG_DIR)).unwrap();
        fs::write(
            ws.join(CONFIG_DIR).join(CONFIG_FILE),
            "[watch]\nexclude = [\"vendor/**\"]\n",
        )
        .unwrap();

        let settings = Settings::load_for(&nested).unwrap();
        assert_eq!(settings.watch.exclude, vec!["vendor/**"]);
        assert_eq!(settings.workspace_root, Some(ws));

        let other = temp_dir.path().join("other");
        fs::create_dir_all(&other).unwrap();
        let settings = Settings::load_for(&other).unwrap();
        assert_eq!(settings.watch.exclude, default_exclude());
    }

    #[test]
    fn test_resolved_workspace_root_prefers_config() {
        let settings = Settings {
            workspace_root: Some(PathBuf::from("/some/ws")),
            ..Settings::default()
        };
        assert_eq!(settings.resolved_workspace_root(), PathBuf::from("/some/ws"));
    }
}
