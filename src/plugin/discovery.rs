//! Collaborator seams for plugin resolution
//!
//! The manager consumes three external collaborators as black boxes: a
//! module resolver mapping a plugin name to a loadable module location, a
//! metadata-file reader and a configuration-file reader. Each returns either
//! a populated object or "not found". Filesystem-backed defaults live here;
//! tests inject map-backed replacements.

use crate::plugin::types::{PluginConfiguration, PluginMetadata};
use std::path::{Path, PathBuf};

/// Maps a plugin name to a loadable module location
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Produces a [`PluginMetadata`] for a plugin name, if one exists
pub trait MetadataSource: Send + Sync {
    fn read(&self, name: &str) -> Option<PluginMetadata>;
}

/// Produces a [`PluginConfiguration`] for a plugin name, if one exists
pub trait ConfigSource: Send + Sync {
    fn read(&self, name: &str) -> Option<PluginConfiguration>;
}

/// Platform-specific default plugin directory
///
/// User configuration directory first, local `./plugins` as fallback.
pub fn default_plugin_dir() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("plughost").join("plugins");
    }
    PathBuf::from("./plugins")
}

/// Filesystem module resolver
///
/// Searches its directories in order for `{name}.so` or `lib{name}.so`
/// (platform extension varies) and returns the first hit.
pub struct FsModuleResolver {
    search_paths: Vec<PathBuf>,
}

impl FsModuleResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn with_default_path() -> Self {
        Self::new(vec![default_plugin_dir()])
    }

    fn candidate_file_names(name: &str) -> Vec<String> {
        let extensions: &[&str] = if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else if cfg!(target_os = "windows") {
            &["dll"]
        } else {
            &["so"]
        };

        let mut candidates = Vec::new();
        for ext in extensions {
            candidates.push(format!("{}.{}", name, ext));
            candidates.push(format!("lib{}.{}", name, ext));
        }
        candidates
    }
}

impl ModuleResolver for FsModuleResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.search_paths {
            if !dir.exists() {
                log::trace!("Plugin directory {:?} does not exist, skipping", dir);
                continue;
            }
            for file_name in Self::candidate_file_names(name) {
                let candidate = dir.join(&file_name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Reads `{dir}/{name}.toml` into a [`PluginMetadata`]
pub struct TomlMetadataSource {
    dir: PathBuf,
}

impl TomlMetadataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MetadataSource for TomlMetadataSource {
    fn read(&self, name: &str) -> Option<PluginMetadata> {
        let path = self.dir.join(format!("{}.toml", name));
        let content = read_if_present(&path)?;
        match toml::from_str::<PluginMetadata>(&content) {
            Ok(mut metadata) => {
                // The file may omit the name; the lookup key is authoritative
                if metadata.name.is_empty() {
                    metadata.name = name.to_string();
                }
                Some(metadata)
            }
            Err(err) => {
                log::warn!("Ignoring malformed metadata file {:?}: {}", path, err);
                None
            }
        }
    }
}

/// Reads `{dir}/{name}.conf.toml` into a [`PluginConfiguration`]
pub struct TomlConfigSource {
    dir: PathBuf,
}

impl TomlConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ConfigSource for TomlConfigSource {
    fn read(&self, name: &str) -> Option<PluginConfiguration> {
        let path = self.dir.join(format!("{}.conf.toml", name));
        let content = read_if_present(&path)?;
        match content.parse::<toml::Table>() {
            Ok(table) => Some(PluginConfiguration::from_table(table)),
            Err(err) => {
                log::warn!("Ignoring malformed configuration file {:?}: {}", path, err);
                None
            }
        }
    }
}

fn read_if_present(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            log::warn!("Failed to read {:?}: {}", path, err);
            None
        }
    }
}
