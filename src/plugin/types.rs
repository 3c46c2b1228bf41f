//! Type definitions for the plugin system
//!
//! Core data structures shared across the plugin system: per-plugin metadata
//! and configuration, load states and the outcome types of lifecycle
//! operations.

use serde::Deserialize;

/// Immutable per-plugin descriptor
///
/// Loaded once when the plugin is resolved, owned by the plugin record and
/// handed to instances as a shared read-only reference.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginMetadata {
    /// Plugin name (the key under which it is loaded)
    #[serde(default)]
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Declared interface string, matched byte-for-byte against the manager's
    #[serde(default)]
    pub interface: String,
    /// Names of plugins that must be loaded before this one
    #[serde(default)]
    pub depends: Vec<String>,
}

impl PluginMetadata {
    /// Fallback metadata for a resolved plugin without a metadata file
    pub fn synthetic(name: &str, interface: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            interface: interface.to_string(),
            depends: Vec::new(),
        }
    }
}

/// Opaque key/value configuration associated with a plugin name
///
/// Owned by the plugin record; instances receive a shared reference for
/// their lifetime and never mutate it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfiguration {
    values: toml::Table,
}

impl PluginConfiguration {
    /// Wrap a parsed TOML table
    pub fn from_table(values: toml::Table) -> Self {
        Self { values }
    }

    /// Get a string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(|v| v.as_bool())
    }

    /// Get an integer value
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(|v| v.as_integer())
    }

    /// Whether any values are present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Load state of a plugin record
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    /// Not loaded, or unloaded again after a successful unload
    #[default]
    NotLoaded,
    /// Loaded; the record's factory is callable
    Loaded,
    /// The last load attempt failed compatibility checks
    LoadFailed(String),
}

/// Outcome of a successful `load` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The plugin transitioned to `Loaded`
    Loaded,
    /// The plugin was already loaded; nothing changed
    AlreadyLoaded,
}

/// Outcome of a successful `unload` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadOutcome {
    /// The plugin transitioned to `NotLoaded`
    Unloaded,
    /// The plugin was not loaded to begin with; nothing changed
    NotLoaded,
}

/// Identifier of a plugin instance within one manager
///
/// Minted per manager, never reused. Instances deregister themselves by id,
/// so stale identifiers are harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) u64);
