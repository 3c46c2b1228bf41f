//! Plugin Manager
//!
//! Central coordinator for one interface domain: resolves plugin names
//! against the static registry or the dynamic module loader, verifies ABI
//! and interface compatibility, owns the record table and tracks the
//! instances created through it. Managers with different interface strings
//! are fully independent.

use crate::core::sync::handle_mutex_poison;
use crate::plugin::discovery::{
    ConfigSource, FsModuleResolver, MetadataSource, ModuleResolver, TomlConfigSource,
    TomlMetadataSource,
};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::instance::{InstanceContext, PluginInstance};
use crate::plugin::registry::{RecordTable, SharedRecords};
use crate::plugin::types::{
    LoadOutcome, LoadState, PluginConfiguration, PluginMetadata, UnloadOutcome,
};
use crate::plugin::{discovery, loader, static_registry};
use std::sync::{Arc, Mutex, MutexGuard};

/// Plugin manager for one interface domain
///
/// Constructed with an expected interface string; only plugins declaring
/// exactly that string can be loaded into it. `load`, `unload`, `instance`
/// and instance deregistration all serialize on the record table lock; the
/// operations are synchronous and may block on module I/O.
pub struct PluginManager {
    interface: String,
    abi_version: u32,
    records: SharedRecords,
    resolver: Box<dyn ModuleResolver>,
    metadata_source: Box<dyn MetadataSource>,
    config_source: Box<dyn ConfigSource>,
}

impl PluginManager {
    /// Create a manager with the default filesystem collaborators
    ///
    /// Modules, metadata files and configuration files are looked up in the
    /// platform plugin directory; the expected ABI version is the one baked
    /// into this build.
    pub fn new(interface: impl Into<String>) -> Self {
        let plugin_dir = discovery::default_plugin_dir();
        Self::with_collaborators(
            interface,
            crate::core::version::abi_version(),
            Box::new(FsModuleResolver::with_default_path()),
            Box::new(TomlMetadataSource::new(plugin_dir.clone())),
            Box::new(TomlConfigSource::new(plugin_dir)),
        )
    }

    /// Create a manager with injected collaborators
    pub fn with_collaborators(
        interface: impl Into<String>,
        abi_version: u32,
        resolver: Box<dyn ModuleResolver>,
        metadata_source: Box<dyn MetadataSource>,
        config_source: Box<dyn ConfigSource>,
    ) -> Self {
        Self {
            interface: interface.into(),
            abi_version,
            records: Arc::new(Mutex::new(RecordTable::default())),
            resolver,
            metadata_source,
            config_source,
        }
    }

    /// The interface string plugins must declare to load here
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// The ABI version plugins must report to load here
    pub fn abi_version(&self) -> u32 {
        self.abi_version
    }

    fn lock(&self) -> PluginResult<MutexGuard<'_, RecordTable>> {
        handle_mutex_poison(self.records.lock(), |message| {
            PluginError::Synchronization { message }
        })
    }

    /// Load a plugin by name
    ///
    /// Static registry entries take precedence over dynamic modules. ABI
    /// version and interface string are matched by exact equality; either
    /// mismatch aborts the load and leaves the record in `LoadFailed`. A
    /// declared dependency that is not loaded in this manager aborts with
    /// `UnresolvedDependency` and leaves the record untouched. Loading an
    /// already loaded plugin is an idempotent no-op.
    pub fn load(&self, name: &str) -> PluginResult<LoadOutcome> {
        let mut records = self.lock()?;

        if records.is_loaded(name) {
            log::debug!("Plugin '{}' already loaded", name);
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        // Resolve the candidate: static registry first, dynamic module second
        let (abi_version, candidate_interface, factory, library) =
            if let Some(entry) = static_registry::find_static(name) {
                (entry.abi_version, entry.interface, entry.factory, None)
            } else {
                let path =
                    self.resolver
                        .resolve(name)
                        .ok_or_else(|| PluginError::CannotOpenPlugin {
                            name: name.to_string(),
                            cause: "no module found for this name".to_string(),
                        })?;
                let module = loader::open_module(name, &path)?;
                (
                    module.abi_version,
                    module.interface,
                    module.factory,
                    Some(module.library),
                )
            };

        if abi_version != self.abi_version {
            let err = PluginError::WrongPluginVersion {
                name: name.to_string(),
                expected: self.abi_version,
                found: abi_version,
            };
            records.ensure_record(name).state = LoadState::LoadFailed(err.to_string());
            return Err(err);
        }

        if candidate_interface != self.interface {
            let err = PluginError::WrongInterfaceVersion {
                name: name.to_string(),
                expected: self.interface.clone(),
                found: candidate_interface,
            };
            records.ensure_record(name).state = LoadState::LoadFailed(err.to_string());
            return Err(err);
        }

        let metadata = self
            .metadata_source
            .read(name)
            .unwrap_or_else(|| PluginMetadata::synthetic(name, &candidate_interface));

        for dependency in &metadata.depends {
            if !records.is_loaded(dependency) {
                // The candidate library (if any) drops here, rolling the
                // open back; the record keeps its previous state.
                return Err(PluginError::UnresolvedDependency {
                    name: name.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }

        let configuration = self.config_source.read(name).unwrap_or_default();

        let record = records.ensure_record(name);
        record.state = LoadState::Loaded;
        record.metadata = Some(Arc::new(metadata));
        record.configuration = Some(Arc::new(configuration));
        record.factory = Some(factory);
        record.library = library;

        log::debug!(
            "Loaded plugin '{}' into interface domain '{}'",
            name,
            self.interface
        );
        Ok(LoadOutcome::Loaded)
    }

    /// Unload a plugin by name
    ///
    /// All-or-nothing: if any live instance refuses deletion the whole
    /// unload aborts with `IsUsed`, and if another loaded plugin depends on
    /// this one it aborts with `IsRequired`; state is unchanged in both
    /// cases. Unloading a plugin that is not loaded is an idempotent no-op.
    /// The manager never destroys instances; the deletability check only
    /// gates the record's own transition.
    pub fn unload(&self, name: &str) -> PluginResult<UnloadOutcome> {
        // Declared before the guard so the temporary strong references are
        // dropped after the table lock is released.
        let survivors: Vec<Arc<dyn PluginInstance>>;
        let mut records = self.lock()?;

        if !records.is_loaded(name) {
            return Ok(UnloadOutcome::NotLoaded);
        }

        records.prune_dead_instances(name);
        survivors = records.live_instances(name);
        let refusing = survivors
            .iter()
            .filter(|instance| !instance.can_be_deleted())
            .count();
        if refusing > 0 {
            return Err(PluginError::IsUsed {
                name: name.to_string(),
                active: refusing,
            });
        }

        if let Some(required_by) = records.loaded_dependent(name) {
            return Err(PluginError::IsRequired {
                name: name.to_string(),
                required_by,
            });
        }

        if let Some(record) = records.record_mut(name) {
            record.state = LoadState::NotLoaded;
            record.factory = None;
            record.metadata = None;
            record.active.clear();
            // Closes the module if this was a dynamic plugin
            record.library = None;
        }

        log::debug!("Unloaded plugin '{}'", name);
        Ok(UnloadOutcome::Unloaded)
    }

    /// Create an instance of a loaded plugin
    ///
    /// Invokes the stored factory; the constructed instance registers into
    /// the record's active set and receives shared configuration and
    /// metadata references. The caller owns the instance; the manager only
    /// tracks its existence.
    pub fn instance(&self, name: &str) -> PluginResult<Arc<dyn PluginInstance>> {
        let (factory, ctx, id) = {
            let mut records = self.lock()?;
            let id = records.mint_instance_id();
            let record = match records.record(name) {
                Some(record) if record.state == LoadState::Loaded => record,
                _ => {
                    return Err(PluginError::PluginNotLoaded {
                        name: name.to_string(),
                    })
                }
            };
            let factory = match record.factory {
                Some(factory) => factory,
                None => {
                    return Err(PluginError::PluginNotLoaded {
                        name: name.to_string(),
                    })
                }
            };
            let ctx = InstanceContext {
                records: Arc::clone(&self.records),
                plugin: name.to_string(),
                id,
                configuration: record.configuration.clone(),
                metadata: record.metadata.clone(),
            };
            (factory, ctx, id)
        };

        // The factory runs without the table lock held; instance
        // destructors take that lock to deregister.
        let instance = factory(ctx);

        let mut records = self.lock()?;
        if !records.is_loaded(name) {
            // Unloaded in between; report as not loaded. The orphaned
            // instance drops after the guard releases.
            drop(records);
            return Err(PluginError::PluginNotLoaded {
                name: name.to_string(),
            });
        }
        records.attach_instance(name, id, Arc::downgrade(&instance));
        drop(records);

        Ok(instance)
    }

    /// Current load state of a plugin; `NotLoaded` for unknown names
    pub fn load_state(&self, name: &str) -> PluginResult<LoadState> {
        Ok(self
            .lock()?
            .record(name)
            .map(|record| record.state.clone())
            .unwrap_or_default())
    }

    /// Metadata of a plugin, present while it is loaded
    pub fn metadata(&self, name: &str) -> PluginResult<Option<Arc<PluginMetadata>>> {
        Ok(self
            .lock()?
            .record(name)
            .and_then(|record| record.metadata.clone()))
    }

    /// Configuration associated with a plugin name
    pub fn configuration(&self, name: &str) -> PluginResult<Option<Arc<PluginConfiguration>>> {
        Ok(self
            .lock()?
            .record(name)
            .and_then(|record| record.configuration.clone()))
    }

    /// Number of live instances created through this manager for a name
    pub fn active_instance_count(&self, name: &str) -> PluginResult<usize> {
        let mut records = self.lock()?;
        records.prune_dead_instances(name);
        Ok(records.active_count(name))
    }

    /// Sorted names known to this manager
    ///
    /// Includes every name with a record plus static registry entries whose
    /// declared interface matches this manager's.
    pub fn plugin_list(&self) -> PluginResult<Vec<String>> {
        let mut names = self.lock()?.names();
        for name in static_registry::static_plugin_names() {
            let matches_interface = static_registry::find_static(&name)
                .is_some_and(|entry| entry.interface == self.interface);
            if matches_interface && !names.contains(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
