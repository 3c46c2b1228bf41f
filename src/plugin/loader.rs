//! Dynamic module opening and symbol resolution
//!
//! A loadable module exports three symbols: an ABI version accessor, an
//! interface accessor and an instance factory. Opening reads all three
//! eagerly; the returned [`ResolvedModule`] keeps the library mapped until
//! it is dropped.

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::instance::InstanceFactory;
use libloading::{Library, Symbol};
use std::ffi::{c_char, CStr};
use std::path::Path;

/// Exported symbol: `extern "C" fn() -> u32`
pub const ABI_VERSION_SYMBOL: &[u8] = b"plughost_abi_version";
/// Exported symbol: `extern "C" fn() -> *const c_char`, NUL-terminated
pub const INTERFACE_SYMBOL: &[u8] = b"plughost_interface";
/// Exported symbol: [`InstanceFactory`]
pub const INSTANCER_SYMBOL: &[u8] = b"plughost_instancer";

/// A successfully opened dynamic plugin module
///
/// The factory pointer is only valid while `library` stays alive; the
/// record keeps both together for as long as the plugin is loaded.
pub(crate) struct ResolvedModule {
    pub library: Library,
    pub abi_version: u32,
    pub interface: String,
    pub factory: InstanceFactory,
}

impl std::fmt::Debug for ResolvedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModule")
            .field("abi_version", &self.abi_version)
            .field("interface", &self.interface)
            .finish()
    }
}

/// Open a module and read its exported descriptors
///
/// Open failures map to `CannotOpenPlugin`, missing exports to
/// `MissingMetadata`. No compatibility checking happens here; the manager
/// compares the reported values against its own expectations.
pub(crate) fn open_module(name: &str, path: &Path) -> PluginResult<ResolvedModule> {
    // SAFETY: loading runs arbitrary module initialisers; the module location
    // came from the caller's module resolver, which is trusted by contract.
    let library = unsafe { Library::new(path) }.map_err(|err| PluginError::CannotOpenPlugin {
        name: name.to_string(),
        cause: err.to_string(),
    })?;

    let (abi_version, interface, factory) = {
        // SAFETY: symbol signatures are part of the module ABI contract.
        let abi_version_fn: Symbol<extern "C" fn() -> u32> = unsafe {
            library.get(ABI_VERSION_SYMBOL).map_err(|_| missing(name, ABI_VERSION_SYMBOL))?
        };
        let interface_fn: Symbol<extern "C" fn() -> *const c_char> = unsafe {
            library.get(INTERFACE_SYMBOL).map_err(|_| missing(name, INTERFACE_SYMBOL))?
        };
        let instancer_fn: Symbol<InstanceFactory> = unsafe {
            library.get(INSTANCER_SYMBOL).map_err(|_| missing(name, INSTANCER_SYMBOL))?
        };

        // SAFETY: the interface accessor returns a pointer to a static
        // NUL-terminated string owned by the module.
        let interface = unsafe { CStr::from_ptr(interface_fn()) }
            .to_string_lossy()
            .into_owned();

        (abi_version_fn(), interface, *instancer_fn)
    };

    log::debug!(
        "Opened module {:?} for plugin '{}': ABI {}, interface '{}'",
        path,
        name,
        abi_version,
        interface
    );

    Ok(ResolvedModule {
        library,
        abi_version,
        interface,
        factory,
    })
}

fn missing(name: &str, symbol: &[u8]) -> PluginError {
    PluginError::MissingMetadata {
        name: name.to_string(),
        symbol: String::from_utf8_lossy(symbol).into_owned(),
    }
}
