use std::fs;

use junction_discovery::discover;

fn write_manifest(dir: &std::path::Path, contents: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("package.json"), contents).unwrap();
}

/// Four candidate directories: a valid collector, one missing the
/// `junctionrelay` block entirely, one declaring an unrelated plugin
/// type, and one valid collector nested under `node_modules` with the
/// unscoped `junctionrelay-plugin-` prefix. Exactly two descriptors
/// come back.
#[test]
fn scans_root_and_node_modules_and_skips_invalid_manifests() {
    let root = tempfile::tempdir().unwrap();

    write_manifest(
        &root.path().join("acme-weather"),
        r#"{
            "name": "acme-weather",
            "version": "2.1.0",
            "junctionrelay": { "type": "collector", "entry": "dist/main.js" }
        }"#,
    );
    write_manifest(
        &root.path().join("some-library"),
        r#"{ "name": "some-library", "version": "1.0.0" }"#,
    );
    write_manifest(
        &root.path().join("unrelated-tool"),
        r#"{ "name": "unrelated-tool", "junctionrelay": { "type": "devtool" } }"#,
    );
    write_manifest(
        &root.path().join("node_modules/junctionrelay-plugin-x"),
        r#"{
            "name": "junctionrelay-plugin-x",
            "version": "0.4.0",
            "junctionrelay": { "type": "collector" }
        }"#,
    );

    let mut found = discover(root.path());
    found.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(found.len(), 2, "only the two collector manifests are returned");
    assert_eq!(found[0].name, "acme-weather");
    assert_eq!(found[0].entry, "dist/main.js");
    assert_eq!(found[1].name, "junctionrelay-plugin-x");
    assert_eq!(found[1].entry, "index.ts", "falls back to the default entry");
}

#[test]
fn empty_root_yields_no_plugins() {
    let root = tempfile::tempdir().unwrap();
    assert!(discover(root.path()).is_empty());
}
