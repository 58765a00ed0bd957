//! TOML configuration for the hook broker

use crate::hooks::{HookError, HookPriority, HookResult, DEFAULT_ACCEPTED_ARGS};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    /// System-wide configuration
    #[serde(default)]
    pub system: SystemConfig,

    /// Plugin directory layout
    #[serde(default)]
    pub plugins: PluginConfig,

    /// Built-in callbacks to register at startup
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
}

/// System-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Whether configured handlers are registered
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Plugin directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: String,

    #[serde(default = "default_mu_plugin_dir")]
    pub mu_plugin_dir: String,
}

/// A built-in callback registered on one or more tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Callback name, also its registration identity
    pub name: String,

    /// Which built-in to use
    pub handler_type: HandlerType,

    /// Tags to register on
    pub tags: Vec<String>,

    #[serde(default = "default_priority")]
    pub priority: HookPriority,

    #[serde(default = "default_accepted_args")]
    pub accepted_args: usize,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Handler-specific options
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

/// Built-in handler kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    Logging,
    Transform,
}

impl HooksConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Save configuration to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read and validate a configuration file
    pub fn load(path: &Path) -> HookResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> HookResult<()> {
        let mut names = HashSet::new();
        for handler in &self.handlers {
            if !names.insert(&handler.name) {
                return Err(HookError::invalid_config(format!(
                    "Duplicate handler name: {}",
                    handler.name
                )));
            }
            handler.validate()?;
        }
        Ok(())
    }
}

impl HandlerConfig {
    /// Validate handler configuration
    pub fn validate(&self) -> HookResult<()> {
        if self.name.trim().is_empty() {
            return Err(HookError::invalid_config("Handler name cannot be empty"));
        }

        if self.tags.is_empty() {
            return Err(HookError::invalid_config(format!(
                "Handler '{}' has no tags",
                self.name
            )));
        }

        if self.tags.iter().any(|t| t.is_empty()) {
            return Err(HookError::invalid_config(format!(
                "Handler '{}' has an empty tag",
                self.name
            )));
        }

        Ok(())
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            mu_plugin_dir: default_mu_plugin_dir(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_plugin_dir() -> String {
    "hq-content/plugins".to_string()
}

fn default_mu_plugin_dir() -> String {
    "hq-content/mu-plugins".to_string()
}

fn default_priority() -> HookPriority {
    HookPriority::DEFAULT
}

fn default_accepted_args() -> usize {
    DEFAULT_ACCEPTED_ARGS
}
