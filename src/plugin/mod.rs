//! Plugin lifecycle management
//!
//! Static and dynamic plugin registration, the per-interface manager, and
//! the instance tracking that gates unloads. External consumers use the
//! [`api`] surface; the sibling modules are crate-internal.

pub(crate) mod discovery;
pub(crate) mod error;
pub(crate) mod instance;
pub(crate) mod loader;
pub(crate) mod manager;
pub(crate) mod registry;
pub(crate) mod static_registry;
pub(crate) mod types;

pub mod api;
