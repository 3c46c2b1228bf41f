pub mod core;
pub mod plugin;

// Re-exported for use by the static_plugin! macro at external call sites.
pub use inventory;
