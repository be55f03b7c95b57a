use serde::{Deserialize, Serialize};
use shed_config::Config;
use std::collections::HashSet;

fn temp_config() -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::open(dir.path().join("app.ini")).unwrap();
    (dir, config)
}

#[test]
fn missing_file_yields_empty_document() {
    let (_dir, config) = temp_config();

    assert!(config.get("server", "host").is_none());
    assert_eq!(config.get_or("server", "host", "localhost"), "localhost");
    assert!(!config.contains("server", "host"));
    assert!(config.sections().is_empty());
}

#[test]
fn typed_getters_with_defaults() {
    let (_dir, config) = temp_config();

    config.set("server", "port", 8080).unwrap();
    config.set("server", "ratio", 0.25).unwrap();
    config.set("server", "debug", "on").unwrap();
    config.set("server", "padded", " 42 ").unwrap();

    assert_eq!(config.get_int("server", "port", 0), 8080);
    assert_eq!(config.get_int("server", "padded", 0), 42);
    assert!((config.get_float("server", "ratio", 0.0) - 0.25).abs() < f64::EPSILON);
    assert!(config.get_bool("server", "debug", false));

    assert_eq!(config.get_int("server", "missing", -1), -1);
    assert_eq!(config.get_int("server", "ratio", -1), -1);
    assert!(config.get_bool("server", "port", true));
}

#[test]
fn bool_accepts_all_spellings() {
    let (_dir, config) = temp_config();

    for (value, expected) in
        [("1", true), ("Yes", true), ("ON", true), ("0", false), ("no", false), ("Off", false)]
    {
        config.set("flags", "value", value).unwrap();
        assert_eq!(config.get_bool("flags", "value", !expected), expected, "{value}");
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Endpoint {
    host: String,
    port: u16,
}

#[test]
fn json_values_round_trip() {
    let (_dir, config) = temp_config();

    let endpoint = Endpoint { host: "db.local".into(), port: 3306 };
    config.set_json("upstream", "endpoint", &endpoint).unwrap();

    assert_eq!(config.get_json::<Endpoint>("upstream", "endpoint"), Some(endpoint));
    assert!(config.get_json::<Endpoint>("upstream", "missing").is_none());

    config.set("upstream", "broken", "{not json").unwrap();
    assert!(config.get_json::<Endpoint>("upstream", "broken").is_none());
}

#[test]
fn lists_sets_and_maps() {
    let (_dir, config) = temp_config();

    config.set("seeds", "json", r#"["a", "b", "a"]"#).unwrap();
    config.set("seeds", "csv", " x , y ,, z ").unwrap();
    config.set("seeds", "map", r#"{"region": "eu", "zone": "1"}"#).unwrap();

    assert_eq!(config.get_list("seeds", "json"), vec!["a", "b", "a"]);
    assert_eq!(config.get_list("seeds", "csv"), vec!["x", "y", "z"]);
    assert!(config.get_list("seeds", "missing").is_empty());

    let set: HashSet<String> = ["a".to_owned(), "b".to_owned()].into();
    assert_eq!(config.get_set("seeds", "json"), set);

    let map = config.get_map("seeds", "map");
    assert_eq!(map.get("region").and_then(|v| v.as_str()), Some("eu"));
    assert_eq!(map.len(), 2);
    assert!(config.get_map("seeds", "missing").is_empty());
}

#[test]
fn remove_returns_previous_value() {
    let (_dir, config) = temp_config();

    config.set("auth", "token", "secret").unwrap();
    assert!(config.contains("auth", "token"));

    assert_eq!(config.remove("auth", "token").unwrap().as_deref(), Some("secret"));
    assert_eq!(config.remove("auth", "token").unwrap(), None);

    config.set("auth", "token", "secret").unwrap();
    assert!(config.remove_section("auth").unwrap());
    assert!(!config.contains_section("auth"));
    assert!(!config.remove_section("auth").unwrap());
}

#[test]
fn auto_save_persists_every_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.ini");

    let config = Config::open(&path).unwrap();
    config.set("server", "host", "example.org").unwrap();

    let reopened = Config::open(&path).unwrap();
    assert_eq!(reopened.get("server", "host").as_deref(), Some("example.org"));
}

#[test]
fn manual_save_defers_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.ini");

    let config = Config::open(&path).unwrap().auto_save(false);
    config.set("server", "host", "example.org").unwrap();
    assert!(!path.exists());

    config.save().unwrap();
    let reopened = Config::open(&path).unwrap();
    assert_eq!(reopened.get("server", "host").as_deref(), Some("example.org"));
}

#[test]
fn refresh_discards_unsaved_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.ini");

    let config = Config::open(&path).unwrap();
    config.set("server", "host", "one").unwrap();

    let editor = Config::open(&path).unwrap().auto_save(false);
    editor.set("server", "host", "two").unwrap();
    assert_eq!(editor.get("server", "host").as_deref(), Some("two"));

    editor.refresh().unwrap();
    assert_eq!(editor.get("server", "host").as_deref(), Some("one"));
}

#[test]
fn clear_empties_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.ini");

    let config = Config::open(&path).unwrap();
    config.set("a", "k", "v").unwrap();
    config.set("b", "k", "v").unwrap();

    config.clear().unwrap();
    assert!(config.sections().is_empty());

    let reopened = Config::open(&path).unwrap();
    assert!(reopened.sections().is_empty());
}

#[test]
fn sections_and_keys_enumerate_in_order() {
    let (_dir, config) = temp_config();

    config.set("first", "a", 1).unwrap();
    config.set("first", "b", 2).unwrap();
    config.set("second", "c", 3).unwrap();

    assert_eq!(config.sections(), vec!["first", "second"]);
    assert_eq!(config.keys("first"), vec!["a", "b"]);
    assert!(config.keys("third").is_empty());
}

#[test]
fn general_section_uses_empty_name() {
    let (_dir, config) = temp_config();

    config.set("", "version", "7").unwrap();
    assert_eq!(config.get("", "version").as_deref(), Some("7"));
    assert!(config.sections().is_empty());
}
