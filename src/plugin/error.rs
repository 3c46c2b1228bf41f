//! Plugin Error Handling
//!
//! Error taxonomy for plugin lifecycle operations. Every failure is reported
//! as a value to the caller; nothing in the plugin system panics across the
//! manager boundary.

/// Result type alias for plugin operations
pub type PluginResult<T> = std::result::Result<T, PluginError>;

/// Errors reported by plugin lifecycle operations
///
/// Load failures (`CannotOpenPlugin` through `UnresolvedDependency`) abort
/// the whole `load` with no partial state. `IsUsed` and `IsRequired` abort
/// `unload` and leave the record untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    /// Module missing or unreadable
    #[error("cannot open plugin '{name}': {cause}")]
    CannotOpenPlugin { name: String, cause: String },

    /// Module resolved but a required exported descriptor is absent
    #[error("plugin '{name}' is missing required export '{symbol}'")]
    MissingMetadata { name: String, symbol: String },

    /// Candidate reports a different ABI version than the host expects
    #[error("plugin '{name}' reports ABI version {found}, host expects {expected}")]
    WrongPluginVersion {
        name: String,
        expected: u32,
        found: u32,
    },

    /// Candidate declares a different interface string than the manager's
    #[error("plugin '{name}' declares interface '{found}', manager expects '{expected}'")]
    WrongInterfaceVersion {
        name: String,
        expected: String,
        found: String,
    },

    /// A declared dependency is not loaded in this manager
    #[error("plugin '{name}' requires '{dependency}', which is not loaded")]
    UnresolvedDependency { name: String, dependency: String },

    /// Unload refused because a live instance is not deletable
    #[error("plugin '{name}' is in use: {active} active instance(s) refuse deletion")]
    IsUsed { name: String, active: usize },

    /// Unload refused because another loaded plugin depends on this one
    #[error("plugin '{name}' is required by loaded plugin '{required_by}'")]
    IsRequired { name: String, required_by: String },

    /// `instance()` called on a record that is not `Loaded`
    #[error("plugin '{name}' is not loaded")]
    PluginNotLoaded { name: String },

    /// Lock poisoned by a panic elsewhere; the operation was not performed
    #[error("synchronisation failure: {message}")]
    Synchronization { message: String },
}
