//! Build metadata and ABI version accessors shared across host and plugins.
//! This includes the generated version.rs from the build script, providing a
//! single source of truth for the expected plugin ABI version.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// The plugin ABI version this host was built against.
///
/// Plugins must report exactly this value to be loadable; there is no
/// partial or ranged compatibility.
pub fn abi_version() -> u32 {
    PLUGIN_ABI_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_version_from_build_metadata() {
        assert_eq!(abi_version(), PLUGIN_ABI_VERSION);
        assert!(abi_version() >= 1);
    }
}
