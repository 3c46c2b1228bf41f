//! Core infrastructure shared across the crate
//!
//! Build metadata, logging setup and synchronisation helpers. Nothing in
//! here knows about plugins; the plugin system builds on top of these.

pub mod logging;
pub mod sync;
pub mod version;
