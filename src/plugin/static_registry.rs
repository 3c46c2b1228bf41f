//! Process-wide static plugin registry
//!
//! Holds plugins compiled directly into the host binary so they are
//! discoverable without a dynamic load step. Registrations submitted through
//! the [`static_plugin!`](crate::static_plugin) macro are collected before
//! `main` runs; the registry itself is constructed lazily on first access,
//! which keeps independent registration sites free of initialization-order
//! hazards. After construction the table only grows through explicit
//! [`import_static`] calls; entries are never mutated or removed.

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::plugin::error::PluginError;
use crate::plugin::instance::InstanceFactory;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// Const-constructible registration collected before `main`
///
/// Submitted via `inventory` from static plugin modules; drained into the
/// registry on its first access. Use [`import_static`] for registrations
/// made at runtime instead.
pub struct StaticPluginRegistration {
    pub name: &'static str,
    pub abi_version: u32,
    pub interface: &'static str,
    pub factory: InstanceFactory,
}

impl StaticPluginRegistration {
    pub const fn new(
        name: &'static str,
        abi_version: u32,
        interface: &'static str,
        factory: InstanceFactory,
    ) -> Self {
        Self {
            name,
            abi_version,
            interface,
            factory,
        }
    }
}

inventory::collect!(StaticPluginRegistration);

/// Register a static plugin before `main` runs
///
/// Equivalent of a dynamic plugin's exported symbols for code compiled into
/// the host binary. First registration wins on name collision.
#[macro_export]
macro_rules! static_plugin {
    ($name:expr, $abi_version:expr, $interface:expr, $factory:expr) => {
        $crate::inventory::submit! {
            $crate::plugin::api::StaticPluginRegistration::new(
                $name,
                $abi_version,
                $interface,
                $factory,
            )
        }
    };
}

/// Entry describing one statically registered plugin
#[derive(Debug, Clone)]
pub struct StaticPluginEntry {
    pub name: String,
    pub abi_version: u32,
    pub interface: String,
    pub factory: InstanceFactory,
}

impl From<&StaticPluginRegistration> for StaticPluginEntry {
    fn from(registration: &StaticPluginRegistration) -> Self {
        Self {
            name: registration.name.to_string(),
            abi_version: registration.abi_version,
            interface: registration.interface.to_string(),
            factory: registration.factory,
        }
    }
}

#[derive(Debug, Default)]
struct StaticRegistry {
    entries: HashMap<String, StaticPluginEntry>,
}

impl StaticRegistry {
    /// Append an entry; first registration wins
    fn insert(&mut self, entry: StaticPluginEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            log::warn!(
                "Rejected duplicate static plugin registration '{}'",
                entry.name
            );
            return false;
        }
        log::debug!("Registered static plugin '{}'", entry.name);
        self.entries.insert(entry.name.clone(), entry);
        true
    }

    fn find(&self, name: &str) -> Option<StaticPluginEntry> {
        self.entries.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

// Lazy construction is race-free: LazyLock guarantees exactly one thread
// runs the initializer, and inventory iteration is read-only.
static STATIC_REGISTRY: LazyLock<RwLock<StaticRegistry>> = LazyLock::new(|| {
    let mut registry = StaticRegistry::default();
    for registration in inventory::iter::<StaticPluginRegistration> {
        registry.insert(StaticPluginEntry::from(registration));
    }
    RwLock::new(registry)
});

/// Register a static plugin at runtime
///
/// Returns `false` (and logs) if the name is already registered; the first
/// registration is never overwritten.
pub fn import_static(
    name: &str,
    abi_version: u32,
    interface: &str,
    factory: InstanceFactory,
) -> bool {
    let entry = StaticPluginEntry {
        name: name.to_string(),
        abi_version,
        interface: interface.to_string(),
        factory,
    };
    match handle_rwlock_write(STATIC_REGISTRY.write(), |message| {
        PluginError::Synchronization { message }
    }) {
        Ok(mut registry) => registry.insert(entry),
        Err(err) => {
            log::error!("Static registry unavailable: {err}");
            false
        }
    }
}

/// Look up a static plugin by name
pub fn find_static(name: &str) -> Option<StaticPluginEntry> {
    match handle_rwlock_read(STATIC_REGISTRY.read(), |message| {
        PluginError::Synchronization { message }
    }) {
        Ok(registry) => registry.find(name),
        Err(err) => {
            log::error!("Static registry unavailable: {err}");
            None
        }
    }
}

/// Sorted names of all registered static plugins
pub fn static_plugin_names() -> Vec<String> {
    match handle_rwlock_read(STATIC_REGISTRY.read(), |message| {
        PluginError::Synchronization { message }
    }) {
        Ok(registry) => registry.names(),
        Err(err) => {
            log::error!("Static registry unavailable: {err}");
            Vec::new()
        }
    }
}
