//! Per-manager plugin record table
//!
//! One record per plugin name: load state, metadata, configuration, factory
//! and the set of active instance identifiers. The table is the single
//! mutual-exclusion scope for everything a manager does; callers go through
//! `Arc<Mutex<RecordTable>>` (see [`SharedRecords`]).

use crate::plugin::instance::{InstanceFactory, PluginInstance};
use crate::plugin::types::{InstanceId, LoadState, PluginConfiguration, PluginMetadata};
use libloading::Library;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Shared handle to a manager's record table
///
/// Instances hold a clone of this for deregistration, so the table outlives
/// the manager if instances do.
pub(crate) type SharedRecords = Arc<Mutex<RecordTable>>;

/// Per-name bookkeeping owned by one manager
///
/// Invariant: `factory` and `library` are `Some` only while `state` is
/// `Loaded`. `library` keeps a dynamically opened module mapped for as long
/// as the plugin stays loaded; static plugins leave it `None`.
#[derive(Debug, Default)]
pub(crate) struct PluginRecord {
    pub state: LoadState,
    pub metadata: Option<Arc<PluginMetadata>>,
    pub configuration: Option<Arc<PluginConfiguration>>,
    pub factory: Option<InstanceFactory>,
    pub library: Option<Library>,
    /// Weak references to live instances, keyed by their identifier
    pub active: HashMap<InstanceId, Weak<dyn PluginInstance>>,
}

/// Name-keyed record table plus the instance id counter
#[derive(Debug, Default)]
pub(crate) struct RecordTable {
    records: HashMap<String, PluginRecord>,
    next_instance: u64,
}

impl RecordTable {
    pub fn record(&self, name: &str) -> Option<&PluginRecord> {
        self.records.get(name)
    }

    pub fn record_mut(&mut self, name: &str) -> Option<&mut PluginRecord> {
        self.records.get_mut(name)
    }

    /// Get or create the record for a name
    pub fn ensure_record(&mut self, name: &str) -> &mut PluginRecord {
        self.records.entry(name.to_string()).or_default()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        matches!(
            self.records.get(name).map(|r| &r.state),
            Some(LoadState::Loaded)
        )
    }

    /// Sorted names of all plugins this table has records for
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.keys().cloned().collect();
        names.sort();
        names
    }

    /// Mint a fresh instance identifier; ids are never reused
    pub fn mint_instance_id(&mut self) -> InstanceId {
        self.next_instance += 1;
        InstanceId(self.next_instance)
    }

    /// Track a newly constructed instance under its plugin's record
    pub fn attach_instance(&mut self, name: &str, id: InstanceId, instance: Weak<dyn PluginInstance>) {
        self.ensure_record(name).active.insert(id, instance);
    }

    /// Remove an instance identifier from its record
    ///
    /// Tolerant of unknown names and ids: an instance surviving a consented
    /// unload deregisters into a cleared record.
    pub fn detach_instance(&mut self, name: &str, id: InstanceId) {
        if let Some(record) = self.records.get_mut(name) {
            record.active.remove(&id);
        }
    }

    /// Drop active entries whose instance has already been destroyed
    pub fn prune_dead_instances(&mut self, name: &str) {
        if let Some(record) = self.records.get_mut(name) {
            record.active.retain(|_, weak| weak.strong_count() > 0);
        }
    }

    /// Upgrade every live active entry for a name
    pub fn live_instances(&self, name: &str) -> Vec<Arc<dyn PluginInstance>> {
        self.records
            .get(name)
            .map(|record| {
                record
                    .active
                    .values()
                    .filter_map(|weak| weak.upgrade())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of tracked instances for a name, dead entries included
    pub fn active_count(&self, name: &str) -> usize {
        self.records.get(name).map_or(0, |record| record.active.len())
    }

    /// Find a loaded plugin that declares `name` as a dependency
    pub fn loaded_dependent(&self, name: &str) -> Option<String> {
        self.records
            .iter()
            .filter(|(dependent, record)| {
                dependent.as_str() != name && record.state == LoadState::Loaded
            })
            .find(|(_, record)| {
                record
                    .metadata
                    .as_ref()
                    .is_some_and(|metadata| metadata.depends.iter().any(|dep| dep == name))
            })
            .map(|(dependent, _)| dependent.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::instance::InstanceCore;

    struct TestInstance {
        core: InstanceCore,
    }

    impl TestInstance {
        fn standalone() -> Arc<dyn PluginInstance> {
            Arc::new(Self {
                core: InstanceCore::unmanaged(),
            })
        }
    }

    impl PluginInstance for TestInstance {
        fn core(&self) -> &InstanceCore {
            &self.core
        }
    }

    #[test]
    fn test_ensure_record_defaults_to_not_loaded() {
        let mut table = RecordTable::default();
        let record = table.ensure_record("fresh");

        assert_eq!(record.state, LoadState::NotLoaded);
        assert!(record.factory.is_none());
        assert!(record.library.is_none());
        assert!(record.active.is_empty());
    }

    #[test]
    fn test_mint_instance_id_never_reuses() {
        let mut table = RecordTable::default();
        let a = table.mint_instance_id();
        let b = table.mint_instance_id();
        let c = table.mint_instance_id();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_attach_detach_instance() {
        let mut table = RecordTable::default();
        let id = table.mint_instance_id();
        let instance = TestInstance::standalone();

        table.attach_instance("p", id, Arc::downgrade(&instance));
        assert_eq!(table.active_count("p"), 1);
        assert_eq!(table.live_instances("p").len(), 1);

        table.detach_instance("p", id);
        assert_eq!(table.active_count("p"), 0);

        // Detaching again, or from an unknown record, is a no-op
        table.detach_instance("p", id);
        table.detach_instance("unknown", id);
    }

    #[test]
    fn test_prune_dead_instances() {
        let mut table = RecordTable::default();
        let live_id = table.mint_instance_id();
        let dead_id = table.mint_instance_id();

        let live = TestInstance::standalone();
        table.attach_instance("p", live_id, Arc::downgrade(&live));
        {
            let dead = TestInstance::standalone();
            table.attach_instance("p", dead_id, Arc::downgrade(&dead));
        }
        assert_eq!(table.active_count("p"), 2);

        table.prune_dead_instances("p");
        assert_eq!(table.active_count("p"), 1);
        assert_eq!(table.live_instances("p").len(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let mut table = RecordTable::default();
        table.ensure_record("zeta");
        table.ensure_record("alpha");
        table.ensure_record("mid");

        assert_eq!(table.names(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_loaded_dependent() {
        let mut table = RecordTable::default();

        let record = table.ensure_record("consumer");
        record.state = LoadState::Loaded;
        record.metadata = Some(Arc::new(PluginMetadata {
            name: "consumer".to_string(),
            description: String::new(),
            interface: "iface/1.0".to_string(),
            depends: vec!["base".to_string()],
        }));
        table.ensure_record("base").state = LoadState::Loaded;

        assert_eq!(table.loaded_dependent("base"), Some("consumer".to_string()));
        assert_eq!(table.loaded_dependent("consumer"), None);

        // A dependent that is no longer loaded does not block
        table.record_mut("consumer").unwrap().state = LoadState::NotLoaded;
        assert_eq!(table.loaded_dependent("base"), None);
    }
}
