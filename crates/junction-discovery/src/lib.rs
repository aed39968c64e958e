//! Scans a root directory for collector plugin folders. Every fallible
//! step — a missing `package.json`, malformed JSON, a manifest missing
//! the `junctionrelay` block — is a silent skip, never an error: the
//! only outcome of [`discover`] is a (possibly empty) list.

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use junction_protocol::DiscoveredPlugin;
use serde_json::Value;

const MANIFEST_FILE: &str = "package.json";
const DEFAULT_ENTRY: &str = "index.ts";
const DEFAULT_VERSION: &str = "0.0.0";

/// Probes the three documented locations under `root` and returns every
/// directory whose manifest declares `junctionrelay.type == "collector"`.
/// A `root` that doesn't exist or isn't a directory yields an empty list.
pub fn discover(root: &Path) -> Vec<DiscoveredPlugin> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut plugins = Vec::new();
    plugins.extend(probe_root_subdirectories(root));
    plugins.extend(probe_scoped_plugins(root));
    plugins.extend(probe_prefixed_plugins(root));
    plugins
}

fn probe_root_subdirectories(root: &Path) -> Vec<DiscoveredPlugin> {
    subdirectories(root)
        .into_iter()
        .filter_map(|dir| read_descriptor(&dir))
        .collect()
}

fn probe_scoped_plugins(root: &Path) -> Vec<DiscoveredPlugin> {
    let scope_dir = root.join("node_modules").join("@junctionrelay");
    subdirectories(&scope_dir)
        .into_iter()
        .filter(|dir| has_name_prefix(dir, "plugin-"))
        .filter_map(|dir| read_descriptor(&dir))
        .collect()
}

fn probe_prefixed_plugins(root: &Path) -> Vec<DiscoveredPlugin> {
    let node_modules = root.join("node_modules");
    subdirectories(&node_modules)
        .into_iter()
        .filter(|dir| has_name_prefix(dir, "junctionrelay-plugin-"))
        .filter_map(|dir| read_descriptor(&dir))
        .collect()
}

fn has_name_prefix(dir: &Path, prefix: &str) -> bool {
    dir.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(prefix))
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect()
}

fn read_descriptor(dir: &Path) -> Option<DiscoveredPlugin> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let contents = std::fs::read_to_string(&manifest_path)
        .inspect_err(|err| tracing::debug!(path = %manifest_path.display(), %err, "no readable manifest"))
        .ok()?;
    let manifest: Value = serde_json::from_str(&contents)
        .inspect_err(|err| tracing::debug!(path = %manifest_path.display(), %err, "manifest is not valid JSON"))
        .ok()?;

    let junctionrelay = manifest.get("junctionrelay")?;
    if junctionrelay.get("type").and_then(Value::as_str) != Some("collector") {
        tracing::debug!(path = %dir.display(), "manifest missing junctionrelay.type == collector");
        return None;
    }

    let name = manifest
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| dir.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let version = manifest
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());

    let entry = junctionrelay
        .get("entry")
        .and_then(Value::as_str)
        .or_else(|| manifest.get("main").and_then(Value::as_str))
        .unwrap_or(DEFAULT_ENTRY)
        .to_string();

    Some(DiscoveredPlugin {
        name,
        version,
        path: dir.to_path_buf(),
        entry,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), contents).unwrap();
    }

    #[test]
    fn nonexistent_root_yields_empty_list() {
        assert!(discover(Path::new("/does/not/exist")).is_empty());
    }

    #[test]
    fn discovers_valid_plugins_across_all_three_locations_only() {
        let root = tempfile::tempdir().unwrap();

        write_manifest(
            &root.path().join("weather"),
            r#"{"name": "weather", "version": "1.2.0", "junctionrelay": {"type": "collector", "entry": "dist/index.js"}}"#,
        );
        write_manifest(
            &root.path().join("not-a-collector"),
            r#"{"name": "not-a-collector", "junctionrelay": {"type": "other"}}"#,
        );
        write_manifest(&root.path().join("no-block"), r#"{"name": "no-block"}"#);
        write_manifest(
            &root.path().join("node_modules/junctionrelay-plugin-x"),
            r#"{"name": "plugin-x", "junctionrelay": {"type": "collector"}}"#,
        );
        write_manifest(
            &root.path().join("node_modules/@junctionrelay/plugin-y"),
            r#"{"junctionrelay": {"type": "collector", "entry": "y.js"}}"#,
        );
        write_manifest(
            &root.path().join("node_modules/unrelated-package"),
            r#"{"name": "unrelated", "junctionrelay": {"type": "collector"}}"#,
        );

        let mut names: Vec<String> = discover(root.path()).into_iter().map(|p| p.name).collect();
        names.sort();

        assert_eq!(names, vec!["plugin-x", "plugin-y", "weather"]);
    }

    #[test]
    fn falls_back_to_directory_basename_and_default_version_and_entry() {
        let root = tempfile::tempdir().unwrap();
        let plugin_dir = root.path().join("acme-plugin");
        write_manifest(&plugin_dir, r#"{"junctionrelay": {"type": "collector"}}"#);

        let plugins = discover(root.path());
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "acme-plugin");
        assert_eq!(plugins[0].version, "0.0.0");
        assert_eq!(plugins[0].entry, "index.ts");
    }
}
