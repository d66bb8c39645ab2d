//! End-to-end tests across the registry and the settings loader
//!
//! Exercises the full flow: declare scopes from a defaults file, request
//! scopes out of order, apply settings, then resolve templated paths.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use scope_core::{AccessMode, Error, Placement, Registry, Scalar, Value};
use scope_settings::{SettingsDocument, load_all};
use tempfile::TempDir;

/// Set up a workspace with a defaults file and one settings file
fn setup_files() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let defaults = temp.path().join("defaults.toml");
    fs::write(
        &defaults,
        r#"
workdir = "/data"

[model]
draws = 1000
location = "global"

[model.cod]
acause = "all"
"#,
    )
    .unwrap();

    let settings = temp.path().join("run.json");
    fs::write(
        &settings,
        r#"{"model": {"draws": "250"}, "model.cod": {"acause": "cvd_ihd"}}"#,
    )
    .unwrap();

    (temp, defaults, settings)
}

#[test]
fn test_declare_request_apply_resolve() {
    let (_temp, defaults, settings) = setup_files();
    let registry = Registry::new();

    // A component asks for its scope before the defaults are declared
    let writer = registry
        .get_or_create_with(
            "model.cod.writer",
            [(
                "out",
                Value::path_template("{workdir}/{location}/{acause}_{draws}.csv", AccessMode::Write)
                    .unwrap(),
            )],
        )
        .unwrap();
    assert_eq!(writer.parent().unwrap().name(), "root");

    SettingsDocument::load(&defaults).unwrap().declare(&registry).unwrap();
    assert_eq!(writer.parent().unwrap().name(), "model.cod");

    load_all(&[&settings], &registry).unwrap();

    let path = writer.output_path("out", &BTreeMap::new()).unwrap();
    assert_eq!(path, PathBuf::from("/data/global/cvd_ihd_250.csv"));
    assert!(matches!(
        writer.input_path("out", &BTreeMap::new()),
        Err(Error::AccessMode { .. })
    ));
}

#[test]
fn test_markers_resolve_as_ancestors_arrive() {
    let registry = Registry::new();
    registry.get_or_create("a.b.c.d").unwrap();
    registry.get_or_create("a.b.x").unwrap();

    let topology = registry.topology();
    assert!(matches!(topology["a.b"], Placement::Marker { .. }));
    assert!(matches!(topology["a.b.c"], Placement::Marker { .. }));

    registry.get_or_create("a").unwrap();
    registry.get_or_create("a.b").unwrap();

    assert_eq!(registry.get("a.b.c.d").unwrap().parent().unwrap().name(), "a.b");
    assert_eq!(registry.get("a.b.x").unwrap().parent().unwrap().name(), "a.b");
    assert_eq!(registry.get("a.b").unwrap().parent().unwrap().name(), "a");
    assert_eq!(registry.marker_names(), vec!["a.b.c".to_string()]);

    registry.get_or_create("a.b.c").unwrap();
    assert!(registry.marker_names().is_empty());
    assert_eq!(
        registry.get("a.b.c.d").unwrap().parent().unwrap().name(),
        "a.b.c"
    );
}

#[test]
fn test_later_settings_win_and_failures_name_section() {
    let (temp, defaults, settings) = setup_files();
    let override_file = temp.path().join("override.yaml");
    fs::write(&override_file, "model:\n  draws: 10\n").unwrap();
    let broken = temp.path().join("broken.toml");
    fs::write(&broken, "[model]\ndraws = \"many\"\n").unwrap();

    let registry = Registry::new();
    SettingsDocument::load(&defaults).unwrap().declare(&registry).unwrap();
    load_all(&[&settings, &override_file], &registry).unwrap();

    let cod = registry.get("model.cod").unwrap();
    assert_eq!(cod.resolved_lookup("draws").unwrap(), Scalar::Integer(10));

    let err = load_all(&[&broken], &registry).unwrap_err();
    assert!(err.to_string().contains("[model]"));
    assert_eq!(cod.resolved_lookup("draws").unwrap(), Scalar::Integer(10));
}

#[test]
fn test_concurrent_components_share_one_topology() {
    let (_temp, defaults, _settings) = setup_files();
    let registry = Arc::new(Registry::new());

    let handles: Vec<_> = ["model.cod.a", "model.cod.b", "model.cod", "model", "model.x"]
        .into_iter()
        .map(|name| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.get_or_create(name).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    SettingsDocument::load(&defaults).unwrap().declare(&registry).unwrap();

    for leaf in ["model.cod.a", "model.cod.b"] {
        let node = registry.get(leaf).unwrap();
        assert_eq!(node.parent().unwrap().name(), "model.cod");
        assert_eq!(node.resolved_lookup("workdir").unwrap(), Scalar::from("/data"));
    }
    assert_eq!(registry.get("model.x").unwrap().parent().unwrap().name(), "model");
    assert!(registry.marker_names().is_empty());
}
