// ABOUTME: Application settings: hotkey master switch, default toggle chord, bindings path and log level
// ABOUTME: Parsed from config.toml in the user's config directory; invalid files fall back to defaults

use crate::hotkey::HotKeyBinding;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    pub hotkeys: HotKeysConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HotKeysConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub toggle: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub bindings_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_enabled() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hotkeys: HotKeysConfig {
                enabled: true,
                toggle: HotKeyBinding::default_toggle().to_string(),
            },
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn default_config_content() -> &'static str {
        r#"# KeyLaunch Configuration

[hotkeys]
# Set to false to run without any global hotkeys
enabled = true
# Shortcut that opens the search panel on first launch.
# Modifiers: command, option, control, shift. Keys: a-z, 0-9, space, f1-f12, ...
# Later changes made in the app are kept in the bindings file.
toggle = "option+space"

[storage]
# Where item bindings are stored. Empty means next to this file (bindings.toml)
bindings_path = ""

[logging]
# One of: trace, debug, info, warn, error
# The KEYLAUNCH_LOG environment variable overrides this
level = "info"
"#
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::load_from_str(&content)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(config_dir.join("keylaunch").join("config.toml"))
    }

    pub fn expand_path(&mut self) -> Result<()> {
        self.storage.bindings_path = expand_tilde(&self.storage.bindings_path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.toggle_binding()?;

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Unknown log level '{}', expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    pub fn toggle_binding(&self) -> Result<HotKeyBinding> {
        self.hotkeys
            .toggle
            .parse()
            .with_context(|| format!("Invalid toggle hotkey '{}'", self.hotkeys.toggle))
    }

    /// The configured bindings file, or `bindings.toml` next to `config.toml`.
    pub fn bindings_path(&self) -> Option<PathBuf> {
        let configured = self.storage.bindings_path.trim();
        if configured.is_empty() {
            None
        } else {
            Some(PathBuf::from(configured))
        }
    }

    pub fn save_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config to: {}", path.display()))?;

        Ok(())
    }

    /// Loads, expands and validates the config at the default location,
    /// writing the default file first if none exists. Never fails.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                // The subscriber is not installed yet
                eprintln!("Failed to load config: {e:#}. Using defaults.");
                Config::default()
            }
        }
    }

    fn try_load() -> Result<Self> {
        let path = Self::default_config_path()?;
        if !path.exists() {
            Self::save_default_config(&path)?;
        }

        let mut config = Self::load_from_file(&path)?;
        config.expand_path()?;
        config.validate()?;
        Ok(config)
    }
}

fn expand_tilde(path: &str) -> Result<String> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home.join(rest).to_string_lossy().into_owned())
    } else {
        Ok(path.to_string())
    }
}
