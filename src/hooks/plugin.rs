//! Plugin registration helpers
//!
//! Plugins are identified by their path relative to the plugin directory
//! (`sample/sample.php`). Lifecycle hooks are ordinary actions whose tag is
//! that basename behind a prefix, e.g. `activate_sample/sample.php`.

use crate::hooks::{
    tags, Callback, CallbackRef, HookBroker, HookError, HookPriority, HookResult, PluginConfig,
    DEFAULT_ACCEPTED_ARGS,
};
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Normalize a filesystem path to forward slashes.
///
/// Repeated slashes collapse except at the very start, which keeps UNC
/// prefixes intact, and a Windows drive letter is upper-cased.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut chars = path.chars();
    let Some(first) = chars.next() else {
        return path;
    };
    let mut normalized = String::with_capacity(path.len());
    normalized.push(first);
    let mut after_slash = false;
    for c in chars {
        if c == '/' && after_slash {
            continue;
        }
        after_slash = c == '/';
        normalized.push(c);
    }

    if normalized.chars().nth(1) == Some(':') {
        normalized = format!("{}{}", first.to_ascii_uppercase(), &normalized[first.len_utf8()..]);
    }
    normalized
}

/// Directory containing `file`, with a trailing slash
pub fn plugin_dir_path(file: &str) -> String {
    let parent = Path::new(file)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());
    format!("{}/", parent.trim_end_matches(['/', '\\']))
}

/// Plugin directory layout plus the symlink mappings registered so far
#[derive(Debug, Clone)]
pub struct PluginPaths {
    plugin_dir: String,
    mu_plugin_dir: String,
    prefix: Regex,
    // (link directory, resolved directory), in registration order
    realpaths: Vec<(String, String)>,
}

impl PluginPaths {
    pub fn new(plugin_dir: &str, mu_plugin_dir: &str) -> HookResult<Self> {
        let plugin_dir = normalize_path(plugin_dir);
        let mu_plugin_dir = normalize_path(mu_plugin_dir);
        let pattern = format!(
            "^{}/|^{}/",
            regex::escape(&plugin_dir),
            regex::escape(&mu_plugin_dir)
        );
        let prefix = Regex::new(&pattern)
            .map_err(|e| HookError::invalid_config(format!("Invalid plugin directory: {}", e)))?;

        Ok(Self {
            plugin_dir,
            mu_plugin_dir,
            prefix,
            realpaths: Vec::new(),
        })
    }

    pub fn from_config(config: &PluginConfig) -> HookResult<Self> {
        Self::new(&config.plugin_dir, &config.mu_plugin_dir)
    }

    pub fn plugin_dir(&self) -> &str {
        &self.plugin_dir
    }

    pub fn mu_plugin_dir(&self) -> &str {
        &self.mu_plugin_dir
    }

    /// Remember where a symlinked plugin directory really lives.
    ///
    /// Returns false for files directly in a plugin directory and for files
    /// that cannot be resolved.
    pub fn register_realpath(&mut self, file: &Path) -> bool {
        let plugin_path = normalize_path(&dir_of(file));
        if plugin_path == self.plugin_dir || plugin_path == self.mu_plugin_dir {
            return false;
        }

        let resolved = match fs::canonicalize(file) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!(file = %file.display(), error = %e, "Could not resolve plugin path");
                return false;
            }
        };
        let realpath = normalize_path(&dir_of(&resolved));

        if plugin_path != realpath {
            debug!(link = %plugin_path, target = %realpath, "Registered plugin realpath");
            match self.realpaths.iter_mut().find(|(dir, _)| *dir == plugin_path) {
                Some(entry) => entry.1 = realpath,
                None => self.realpaths.push((plugin_path, realpath)),
            }
        }
        true
    }

    /// Path of `file` relative to the plugin directory it lives in
    pub fn plugin_basename(&self, file: &str) -> String {
        let mut file = file.to_string();
        for (dir, realdir) in &self.realpaths {
            if let Some(rest) = file.strip_prefix(realdir.as_str()) {
                file = format!("{}{}", dir, rest);
            }
        }

        let file = normalize_path(&file);
        let relative = self.prefix.replace(&file, "");
        relative.trim_matches('/').to_string()
    }

    pub fn activation_tag(&self, file: &str) -> String {
        format!("{}{}", tags::ACTIVATE_PREFIX, self.plugin_basename(file))
    }

    pub fn deactivation_tag(&self, file: &str) -> String {
        format!("{}{}", tags::DEACTIVATE_PREFIX, self.plugin_basename(file))
    }

    pub fn uninstall_tag(&self, file: &str) -> String {
        format!("{}{}", tags::UNINSTALL_PREFIX, self.plugin_basename(file))
    }
}

fn dir_of(file: &Path) -> String {
    file.parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run `callback` when the plugin at `file` is activated
pub fn register_activation_hook(
    broker: &HookBroker,
    paths: &PluginPaths,
    file: &str,
    callback: Callback,
) -> HookResult<()> {
    let tag = paths.activation_tag(file);
    broker.add_action(&tag, callback, HookPriority::DEFAULT, DEFAULT_ACCEPTED_ARGS)
}

/// Run `callback` when the plugin at `file` is deactivated
pub fn register_deactivation_hook(
    broker: &HookBroker,
    paths: &PluginPaths,
    file: &str,
    callback: Callback,
) -> HookResult<()> {
    let tag = paths.deactivation_tag(file);
    broker.add_action(&tag, callback, HookPriority::DEFAULT, DEFAULT_ACCEPTED_ARGS)
}

/// Run `callback` when the plugin at `file` is uninstalled.
///
/// Only named functions and static methods are accepted: the callback has
/// to be resolvable without a live object.
pub fn register_uninstall_hook(
    broker: &HookBroker,
    paths: &PluginPaths,
    file: &str,
    callback: Callback,
) -> HookResult<()> {
    if let CallbackRef::BoundMethod { .. } = callback.target() {
        warn!(
            file,
            callback = %callback.target(),
            "Uninstall hooks must be a function or static method"
        );
        return Err(HookError::invalid_callback(
            "Only a static class method or function can be used in an uninstall hook",
        ));
    }

    let tag = paths.uninstall_tag(file);
    broker.add_action(&tag, callback, HookPriority::DEFAULT, DEFAULT_ACCEPTED_ARGS)
}
