//! Public plugin API
//!
//! The supported surface of the plugin system. Host applications construct a
//! [`PluginManager`] per interface domain; plugin authors implement
//! [`PluginInstance`] and register through [`static_plugin!`](crate::static_plugin)
//! or by exporting the dynamic module symbols.

pub use crate::plugin::discovery::{
    default_plugin_dir, ConfigSource, FsModuleResolver, MetadataSource, ModuleResolver,
    TomlConfigSource, TomlMetadataSource,
};
pub use crate::plugin::error::{PluginError, PluginResult};
pub use crate::plugin::instance::{
    InstanceContext, InstanceCore, InstanceFactory, PluginInstance,
};
pub use crate::plugin::loader::{ABI_VERSION_SYMBOL, INSTANCER_SYMBOL, INTERFACE_SYMBOL};
pub use crate::plugin::manager::PluginManager;
pub use crate::plugin::static_registry::{
    find_static, import_static, static_plugin_names, StaticPluginEntry, StaticPluginRegistration,
};
pub use crate::plugin::types::{
    InstanceId, LoadOutcome, LoadState, PluginConfiguration, PluginMetadata, UnloadOutcome,
};
