//! Plugin instance base and registration protocol
//!
//! Ties an instance's lifetime to manager bookkeeping without the manager
//! owning the instance. A managed instance holds an [`InstanceRegistration`]
//! guard; dropping the instance removes its identifier from the owning
//! record's active set, wherever the drop happens.

use std::sync::Arc;

use crate::plugin::registry::SharedRecords;
use crate::plugin::types::{InstanceId, PluginConfiguration, PluginMetadata};

/// Factory signature invoked once per `instance()` request
///
/// The factory constructs a concrete instance type embedding
/// [`InstanceCore::managed`] over the given context. Static plugins store
/// this directly; dynamic modules export it under the instancer symbol.
pub type InstanceFactory = fn(InstanceContext) -> Arc<dyn PluginInstance>;

/// Everything a factory needs to construct a managed instance
///
/// Built by the manager while it holds the record table lock; consumed by
/// [`InstanceCore::managed`]. Carries shared read-only configuration and
/// metadata plus the identifier under which the instance is tracked.
pub struct InstanceContext {
    pub(crate) records: SharedRecords,
    pub(crate) plugin: String,
    pub(crate) id: InstanceId,
    pub(crate) configuration: Option<Arc<PluginConfiguration>>,
    pub(crate) metadata: Option<Arc<PluginMetadata>>,
}

/// Base state every plugin instance embeds
///
/// Concrete instance types hold one of these and return it from
/// [`PluginInstance::core`]. The managed variant carries the registration
/// guard; the unmanaged variant is for standalone construction, e.g. in
/// tests, and has no manager bookkeeping at all.
pub struct InstanceCore {
    name: String,
    configuration: Option<Arc<PluginConfiguration>>,
    metadata: Option<Arc<PluginMetadata>>,
    _registration: Option<InstanceRegistration>,
}

impl InstanceCore {
    /// Build the base for a manager-created instance
    pub fn managed(ctx: InstanceContext) -> Self {
        Self {
            name: ctx.plugin.clone(),
            configuration: ctx.configuration,
            metadata: ctx.metadata,
            _registration: Some(InstanceRegistration {
                records: ctx.records,
                plugin: ctx.plugin,
                id: ctx.id,
            }),
        }
    }

    /// Build the base for a standalone instance with no manager
    pub fn unmanaged() -> Self {
        Self {
            name: String::new(),
            configuration: None,
            metadata: None,
            _registration: None,
        }
    }

    /// The key under which this instance was created; empty if unmanaged
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata of the owning plugin, absent for unmanaged instances
    pub fn metadata(&self) -> Option<&PluginMetadata> {
        self.metadata.as_deref()
    }

    /// Configuration of the owning plugin, absent for unmanaged instances
    pub fn configuration(&self) -> Option<&PluginConfiguration> {
        self.configuration.as_deref()
    }

    /// Whether this instance was created through a manager
    pub fn is_managed(&self) -> bool {
        self._registration.is_some()
    }
}

/// Removes the instance identifier from the record table on drop
///
/// Holds its own handle to the record table, so deregistration stays valid
/// even if the manager was dropped before the instance.
struct InstanceRegistration {
    records: SharedRecords,
    plugin: String,
    id: InstanceId,
}

impl Drop for InstanceRegistration {
    fn drop(&mut self) {
        // A poisoned table means another thread panicked mid-operation;
        // there is nothing useful to do from a destructor.
        if let Ok(mut records) = self.records.lock() {
            records.detach_instance(&self.plugin, self.id);
        }
    }
}

/// Base trait every plugin instance implements
///
/// The manager tracks instances but never owns or destroys them; the caller
/// who requested `instance()` holds the only strong reference.
pub trait PluginInstance: Send + Sync {
    /// The instance base shared with the manager
    fn core(&self) -> &InstanceCore;

    /// Whether it is safe to delete this instance from the manager's point
    /// of view
    ///
    /// Called on every active instance during `unload`. If any instance
    /// answers `false`, the plugin is not unloaded. The conservative default
    /// refuses deletion; concrete instance types opt in explicitly.
    fn can_be_deleted(&self) -> bool {
        false
    }

    /// The key under which this instance was created; empty if unmanaged
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Metadata of the owning plugin
    fn metadata(&self) -> Option<&PluginMetadata> {
        self.core().metadata()
    }

    /// Configuration of the owning plugin
    fn configuration(&self) -> Option<&PluginConfiguration> {
        self.core().configuration()
    }
}

impl std::fmt::Debug for dyn PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::registry::RecordTable;
    use crate::plugin::types::LoadState;
    use std::sync::Mutex;

    struct TestInstance {
        core: InstanceCore,
    }

    impl PluginInstance for TestInstance {
        fn core(&self) -> &InstanceCore {
            &self.core
        }
    }

    #[test]
    fn test_unmanaged_instance_has_no_bookkeeping() {
        let instance = TestInstance {
            core: InstanceCore::unmanaged(),
        };

        assert_eq!(instance.name(), "");
        assert!(instance.metadata().is_none());
        assert!(instance.configuration().is_none());
        assert!(!instance.core().is_managed());
        // Default deletability is conservative
        assert!(!instance.can_be_deleted());
    }

    #[test]
    fn test_managed_instance_deregisters_on_drop() {
        let records: SharedRecords = Arc::new(Mutex::new(RecordTable::default()));
        let id = {
            let mut table = records.lock().unwrap();
            let record = table.ensure_record("drop-test");
            record.state = LoadState::Loaded;
            table.mint_instance_id()
        };

        let ctx = InstanceContext {
            records: Arc::clone(&records),
            plugin: "drop-test".to_string(),
            id,
            configuration: None,
            metadata: None,
        };

        let instance: Arc<dyn PluginInstance> = Arc::new(TestInstance {
            core: InstanceCore::managed(ctx),
        });
        {
            let mut table = records.lock().unwrap();
            table.attach_instance("drop-test", id, Arc::downgrade(&instance));
            assert_eq!(table.active_count("drop-test"), 1);
        }
        assert_eq!(instance.name(), "drop-test");
        assert!(instance.core().is_managed());

        drop(instance);

        let table = records.lock().unwrap();
        assert_eq!(table.active_count("drop-test"), 0);
    }

    #[test]
    fn test_managed_instance_carries_configuration_and_metadata() {
        let records: SharedRecords = Arc::new(Mutex::new(RecordTable::default()));
        let id = records.lock().unwrap().mint_instance_id();

        let metadata = Arc::new(PluginMetadata::synthetic("cfg-test", "iface/1.0"));
        let table: toml::Table = toml::from_str(r#"greeting = "hi""#).unwrap();
        let configuration = Arc::new(PluginConfiguration::from_table(table));

        let ctx = InstanceContext {
            records,
            plugin: "cfg-test".to_string(),
            id,
            configuration: Some(configuration),
            metadata: Some(metadata),
        };

        let instance = TestInstance {
            core: InstanceCore::managed(ctx),
        };

        assert_eq!(instance.metadata().unwrap().name, "cfg-test");
        assert_eq!(
            instance.configuration().unwrap().get_str("greeting"),
            Some("hi")
        );
    }

    #[test]
    fn test_stale_deregistration_is_harmless() {
        // Deregistration after the record was cleared (e.g. by an unload the
        // instance consented to) must be a no-op.
        let records: SharedRecords = Arc::new(Mutex::new(RecordTable::default()));
        let id = records.lock().unwrap().mint_instance_id();

        let ctx = InstanceContext {
            records: Arc::clone(&records),
            plugin: "stale-test".to_string(),
            id,
            configuration: None,
            metadata: None,
        };
        let instance = TestInstance {
            core: InstanceCore::managed(ctx),
        };

        // No record was ever created for "stale-test"; dropping must not panic.
        drop(instance);
        assert!(records.lock().unwrap().record("stale-test").is_none());
    }
}
