//! Plugin discovery: one plugin per non-hidden entry of the plugins root.

use std::path::{Path, PathBuf};
use tracing::debug;

use persona_core::{PersonaError, PluginDescriptor, Result};

use crate::manifest::{MANIFEST_FILE, PluginManifest};

/// Prefix marking entries discovery ignores.
pub const HIDDEN_MARKER: char = '.';

/// List the plugins installed under `plugins_root`.
///
/// Runs a fresh directory read on every call. Order follows the directory
/// listing and is not guaranteed.
pub fn discover_plugins(plugins_root: &Path) -> Result<Vec<PluginDescriptor>> {
    let discovery_err = |reason: String| PersonaError::Discovery {
        root: plugins_root.to_path_buf(),
        reason,
    };

    if !plugins_root.is_dir() {
        return Err(discovery_err("not an existing directory".into()));
    }

    let entries = std::fs::read_dir(plugins_root).map_err(|e| discovery_err(e.to_string()))?;

    let mut plugins = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| discovery_err(e.to_string()))?;
        let Some(id) = entry.file_name().to_str().map(str::to_owned) else {
            debug!(name = ?entry.file_name(), "skipping non UTF-8 plugin entry");
            continue;
        };
        if id.starts_with(HIDDEN_MARKER) {
            continue;
        }
        plugins.push(PluginDescriptor {
            id,
            source_path: entry.path(),
        });
    }

    debug!(root = ?plugins_root, count = plugins.len(), "discovered plugins");
    Ok(plugins)
}

/// Resolve one plugin by id.
pub fn find_plugin(plugins_root: &Path, id: &str) -> Result<PluginDescriptor> {
    discover_plugins(plugins_root)?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| PersonaError::Plugin {
            plugin: id.to_string(),
            reason: format!("not installed under {}", plugins_root.display()),
        })
}

/// Locate the module file of a plugin.
///
/// Order: manifest `entry`, `<id>.wasm`, `<id>.wat`, then the first `*.wasm`
/// or `*.wat` in the directory.
pub fn resolve_module(
    descriptor: &PluginDescriptor,
    manifest: Option<&PluginManifest>,
) -> Result<PathBuf> {
    let dir = &descriptor.source_path;
    let not_found = |reason: String| PersonaError::Plugin {
        plugin: descriptor.id.clone(),
        reason,
    };

    if !dir.is_dir() {
        return Err(not_found(format!("{} is not a directory", dir.display())));
    }

    if let Some(entry) = manifest.and_then(|m| m.plugin.entry.as_deref()) {
        let path = dir.join(entry);
        if path.is_file() {
            return Ok(path);
        }
        return Err(not_found(format!("manifest entry {} does not exist", path.display())));
    }

    for ext in ["wasm", "wat"] {
        let path = dir.join(format!("{}.{}", descriptor.id, ext));
        if path.is_file() {
            return Ok(path);
        }
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().is_some_and(|ext| ext == "wasm" || ext == "wat"))
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| not_found(format!("no .wasm or .wat module in {}", dir.display())))
}

/// Read the optional `plugin.toml` next to the module.
pub fn read_manifest(descriptor: &PluginDescriptor) -> Result<Option<PluginManifest>> {
    let path = descriptor.source_path.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    PluginManifest::from_toml(&raw).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn filters_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["A", ".hidden", "B"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        let found: HashSet<String> = discover_plugins(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(found, HashSet::from(["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn missing_root_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_plugins(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, PersonaError::Discovery { .. }));
    }

    #[test]
    fn file_root_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plugins");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            discover_plugins(&file),
            Err(PersonaError::Discovery { .. })
        ));
    }

    #[test]
    fn discovery_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_plugins(dir.path()).unwrap().is_empty());

        std::fs::create_dir(dir.path().join("late")).unwrap();
        assert_eq!(discover_plugins(dir.path()).unwrap().len(), 1);

        std::fs::remove_dir(dir.path().join("late")).unwrap();
        assert!(discover_plugins(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn find_plugin_skips_hidden_ids() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".secret")).unwrap();
        std::fs::create_dir(dir.path().join("demo")).unwrap();
        assert_eq!(find_plugin(dir.path(), "demo").unwrap().id, "demo");
        assert!(find_plugin(dir.path(), ".secret").is_err());
    }

    #[test]
    fn resolve_module_prefers_id_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("demo");
        std::fs::create_dir(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join("aaa.wasm"), b"").unwrap();
        std::fs::write(plugin_dir.join("demo.wat"), b"(module)").unwrap();

        let descriptor = find_plugin(dir.path(), "demo").unwrap();
        let path = resolve_module(&descriptor, None).unwrap();
        assert_eq!(path, plugin_dir.join("demo.wat"));
    }

    #[test]
    fn resolve_module_falls_back_to_any_module() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("demo");
        std::fs::create_dir(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join("file_plugin_bg.wasm"), b"").unwrap();

        let descriptor = find_plugin(dir.path(), "demo").unwrap();
        let path = resolve_module(&descriptor, None).unwrap();
        assert_eq!(path, plugin_dir.join("file_plugin_bg.wasm"));
    }

    #[test]
    fn resolve_module_without_module_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        let descriptor = find_plugin(dir.path(), "empty").unwrap();
        assert!(resolve_module(&descriptor, None).is_err());
    }
}
