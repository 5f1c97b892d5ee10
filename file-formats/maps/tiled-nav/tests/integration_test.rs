//! Integration tests for navigation extraction

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tiled_nav::{
    ExportFormat, NavError, NavigationExtractor, NavigationOptions, NodeKey, Origin,
    RequiredLayer,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn key(x: i32, y: i32) -> NodeKey {
    NodeKey { x, y }
}

#[test]
fn test_corridor_graph() {
    let graph =
        tiled_nav::extract_from_file(fixture("corridor.tmx"), &NavigationOptions::default()).unwrap();

    let expected: BTreeMap<String, String> = [
        ("{0,2}", "{1,2}"),
        ("{1,0}", "{3,0}"),
        ("{1,2}", "{3,2},{0,2}"),
        ("{3,0}", "{3,2},{1,0}"),
        ("{3,2}", "{1,2},{3,0}"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(graph.to_string_map(), expected);

    // The wall at (1,1) comes from the second tileset and cuts D from C
    assert_eq!(graph.neighbours(key(1, 2)), Some(&[key(3, 2), key(0, 2)][..]));
}

#[test]
fn test_corridor_top_left_origin() {
    let options = NavigationOptions {
        origin: Origin::TopLeft,
        ..Default::default()
    };
    let graph = tiled_nav::extract_from_file(fixture("corridor.tmx"), &options).unwrap();
    assert_eq!(graph.neighbours(key(3, 0)), Some(&[key(1, 0), key(3, 2)][..]));
}

#[test]
fn test_sections_found_at_their_indices() {
    let map = tiled_tmx::parse_and_decode(fixture("corridor.tmx")).unwrap();
    let located = NavigationExtractor::default().locate(&map).unwrap();
    assert_eq!(located.waypoint_group, 1);
    assert_eq!(located.collision_layer, 1);

    let waypoints = NavigationExtractor::default().waypoints(&map).unwrap();
    let names: Vec<_> = waypoints.iter().filter_map(|w| w.name.as_deref()).collect();
    assert_eq!(names, vec!["A", "D", "B", "C", "E"]);
}

#[test]
fn test_blocked_row() {
    let graph =
        tiled_nav::extract_from_file(fixture("blocked_row.tmx"), &NavigationOptions::default())
            .unwrap();
    assert_eq!(graph.len(), 2);
    assert!(graph.iter().all(|(_, neighbours)| neighbours.is_empty()));

    let plist = tiled_nav::to_plist(&graph).unwrap();
    assert!(plist.contains("<key>{0,0}</key>"));
    assert!(plist.contains("<key>{3,0}</key>"));
    assert!(!plist.contains("<string>{"));
}

#[test]
fn test_missing_navigation_group_only() {
    let err = tiled_nav::extract_from_file(fixture("no_navigation.tmx"), &NavigationOptions::default())
        .unwrap_err();
    match err {
        NavError::MissingRequiredLayer { missing } => {
            assert_eq!(missing, vec![RequiredLayer::WaypointGroup("Navigation".into())]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_both_sections() {
    let err = tiled_nav::extract_from_file(fixture("no_sections.tmx"), &NavigationOptions::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "missing \"Navigation\" object group; missing \"Map\" tile layer"
    );
}

#[test]
fn test_custom_section_names() {
    let options = NavigationOptions {
        waypoint_group: "spawns".to_string(),
        collision_layer: "map".to_string(),
        ..Default::default()
    };
    let graph = tiled_nav::extract_from_file(fixture("no_navigation.tmx"), &options).unwrap();
    assert_eq!(graph.neighbours(key(0, 0)), Some(&[][..]));
}

#[test]
fn test_map_errors_pass_through() {
    let err = tiled_nav::extract_from_file(fixture("absent.tmx"), &NavigationOptions::default())
        .unwrap_err();
    assert!(matches!(err, NavError::Map(tiled_tmx::Error::Io { .. })));
}

#[test]
fn test_write_every_format() {
    let graph =
        tiled_nav::extract_from_file(fixture("corridor.tmx"), &NavigationOptions::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    for name in ["nav.plist", "nav.json", "nav.yaml"] {
        let path = dir.path().join(name);
        let format = ExportFormat::from_path(&path).unwrap();
        tiled_nav::write_graph(&graph, &path, format).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("{3,2},{0,2}"), "{name}: {written}");
    }
}
