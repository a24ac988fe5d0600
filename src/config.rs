use crate::diagnostic::Severity;
use crate::formatter::FormatOptions;
use crate::service::Capabilities;
use crate::utils::logging;
use crate::validator::ValidationOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

// Embedded defaults, the first configuration layer
const DEFAULT_CONFIG_TOML: &str = include_str!("../data/default-config.toml");

/// Project-local overrides, relative to the working directory
pub const LOCAL_CONFIG_FILE: &str = ".charts-lsp.toml";

/// Top-level tables understood by [`Config`]
const KNOWN_TABLES: &[&str] = &["features", "validation", "format"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FeaturesConfig {
    pub completion: bool,
    pub hover: bool,
    pub validation: bool,
    pub formatting: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        FeaturesConfig {
            completion: true,
            hover: true,
            validation: true,
            formatting: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ValidationConfig {
    /// off | hint | information | warning
    pub unknown_settings: String,
    pub duplicate_settings: bool,
    pub value_checks: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            unknown_settings: "information".to_string(),
            duplicate_settings: true,
            value_checks: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FormatConfig {
    pub indent_width: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        FormatConfig { indent_width: 2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub features: FeaturesConfig,
    pub validation: ValidationConfig,
    pub format: FormatConfig,
}

impl Config {
    /// Parse one TOML layer into a JSON tree so layers can be deep-merged
    fn parse_layer(content: &str) -> Result<Value> {
        let table: toml::Table = toml::from_str(content)?;
        Ok(serde_json::to_value(table)?)
    }

    fn read_layer(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse_layer(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
    }

    /// Load a single configuration file on top of the embedded defaults
    pub fn load(path: &Path) -> Result<Self> {
        let mut merged = Self::parse_layer(DEFAULT_CONFIG_TOML)?;
        merge_values(&mut merged, Self::read_layer(path)?);
        Self::from_value(merged)
    }

    /// Location of the per-user configuration (~/.config/charts-lsp/config.toml)
    pub fn user_config_path() -> Result<PathBuf> {
        let home_dir = home::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home_dir.join(".config/charts-lsp/config.toml"))
    }

    /// Load with user and local overrides
    ///
    /// Merging order: embedded default → ~/.config/charts-lsp/config.toml → ./.charts-lsp.toml.
    /// Later layers win, key by key.
    pub fn load_with_local_overrides() -> Self {
        Self::load_with_local_overrides_internal(true)
    }

    /// Same layering without informational logging, for the command-line tools
    pub fn load_quiet() -> Self {
        Self::load_with_local_overrides_internal(false)
    }

    fn load_with_local_overrides_internal(verbose: bool) -> Self {
        let mut merged = match Self::parse_layer(DEFAULT_CONFIG_TOML) {
            Ok(value) => value,
            Err(e) => {
                warn!("[Config] Failed to parse embedded config: {}", e);
                return Self::default();
            }
        };

        match Self::user_config_path() {
            Ok(path) if path.exists() => match Self::read_layer(&path) {
                Ok(layer) => {
                    if verbose {
                        logging::log_config_layer_merged("~/.config/charts-lsp/config.toml");
                    }
                    merge_values(&mut merged, layer);
                }
                Err(e) => logging::log_config_layer_failed("~/.config/charts-lsp/config.toml", &e.to_string()),
            },
            Ok(_) => {}
            Err(e) => logging::log_config_layer_failed("user config", &e.to_string()),
        }

        let local = Path::new(".").join(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::read_layer(&local) {
                Ok(layer) => {
                    if verbose {
                        logging::log_config_layer_merged(LOCAL_CONFIG_FILE);
                    }
                    merge_values(&mut merged, layer);
                }
                Err(e) => logging::log_config_layer_failed(LOCAL_CONFIG_FILE, &e.to_string()),
            }
        }

        Self::from_value(merged).unwrap_or_else(|e| {
            warn!("[Config] Invalid configuration, using defaults: {}", e);
            Self::default()
        })
    }

    fn from_value(value: Value) -> Result<Self> {
        if let Value::Object(map) = &value {
            for key in map.keys().filter(|k| !KNOWN_TABLES.contains(&k.as_str())) {
                logging::log_config_option_ignored(key);
            }
        }
        serde_json::from_value(value).context("Invalid charts-lsp configuration")
    }

    /// Apply client `initializationOptions` on top of this configuration
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self> {
        if overrides.is_null() {
            return Ok(self.clone());
        }
        let mut merged = serde_json::to_value(self)?;
        merge_values(&mut merged, overrides.clone());
        Self::from_value(merged)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            completion: self.features.completion,
            hover: self.features.hover,
            validation: self.features.validation,
            formatting: self.features.formatting,
        }
    }

    pub fn validation_options(&self) -> ValidationOptions {
        let unknown = self.validation.unknown_settings.trim();
        let unknown_settings = if unknown.eq_ignore_ascii_case("off") {
            None
        } else {
            match unknown.parse::<Severity>() {
                Ok(severity) => Some(severity),
                Err(e) => {
                    warn!("[Config] validation.unknown-settings: {}, using information", e);
                    Some(Severity::Information)
                }
            }
        };
        ValidationOptions {
            unknown_settings,
            duplicate_settings: self.validation.duplicate_settings,
            value_checks: self.validation.value_checks,
        }
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            indent_width: self.format.indent_width,
        }
    }
}

/// Deep-merge `overlay` into `base`: tables merge key by key, anything else is replaced
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
