use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shed_kv::{KvError, KvStore};

fn demo_store() -> KvStore {
    KvStore::open_in_memory("cache").expect("open store")
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    level: u8,
}

#[test]
fn scalars_round_trip_in_display_form() {
    let store = demo_store();
    store.put("name", "alice").expect("put str");
    store.put("age", &30).expect("put int");
    store.put("rate", &0.75).expect("put float");

    assert_eq!(store.get("name").expect("get").as_deref(), Some(b"alice".as_slice()));
    assert_eq!(store.get_string("name", "").expect("string"), "alice");
    assert_eq!(store.get_int("age", 0).expect("int"), 30);
    assert_eq!(store.get_float("rate", 0.0).expect("float"), 0.75);
    assert_eq!(store.get("missing").expect("get"), None);
}

#[test]
fn structs_round_trip_as_json() {
    let store = demo_store();
    let profile = Profile { name: "alice".to_owned(), level: 7 };
    store.put("profile", &profile).expect("put struct");

    let loaded: Profile = store.get_json("profile").expect("json").expect("present");
    assert_eq!(loaded, profile);
    assert_eq!(store.get_json::<Profile>("missing").expect("json"), None);

    store.put("broken", "{not json").expect("put");
    let err = store.get_json::<Profile>("broken").unwrap_err();
    assert!(matches!(err, KvError::Json { .. }));
}

#[test]
fn byte_payloads_are_stored_verbatim() {
    let store = demo_store();
    let payload = [0_u8, 159, 146, 150];
    store.put_bytes("raw", &payload).expect("put bytes");
    assert_eq!(store.get("raw").expect("get"), Some(payload.to_vec()));

    // empty payloads are skipped entirely
    store.put_bytes("empty", &[]).expect("put empty");
    assert!(!store.contains("empty").expect("contains"));
}

#[test]
fn files_round_trip_through_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = dir.path().join("in.bin");
    std::fs::write(&src, b"file payload").expect("seed");

    let store = demo_store();
    store.put_file("doc", &src).expect("put file");

    let dest = dir.path().join("nested/out.bin");
    let written = store.get_file("doc", &dest).expect("get file");
    assert_eq!(written, Some(12));
    assert_eq!(std::fs::read(&dest).expect("read"), b"file payload");

    assert_eq!(store.get_file("missing", dir.path().join("none.bin")).expect("get"), None);

    let err = store.put_file("gone", dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, KvError::Io { .. }));
}

#[test]
fn put_many_batches_and_keys_come_back_sorted() {
    let store = demo_store();
    let affected = store
        .put_many(&[("b", "2"), ("a", "1"), ("c", "3")])
        .expect("put many");
    assert_eq!(affected, 3);
    assert_eq!(store.keys().expect("keys"), ["a", "b", "c"]);
    assert_eq!(store.len().expect("len"), 3);
    assert!(!store.is_empty().expect("empty"));
    assert_eq!(store.put_many::<&str, &str>(&[]).expect("noop"), 0);
}

#[test]
fn replacing_a_key_keeps_one_entry() {
    let store = demo_store();
    store.put("slot", "first").expect("put");
    store.put("slot", "second").expect("put again");
    assert_eq!(store.len().expect("len"), 1);
    assert_eq!(store.get_string("slot", "").expect("get"), "second");
}

#[test]
fn typed_getters_fall_back_to_defaults() {
    let store = demo_store();
    store.put("rate", "4.2").expect("put");
    store.put("flag", "True").expect("put");
    store.put("off", "0").expect("put");
    store.put("noise", "not a number").expect("put");

    // float text truncates to an integer
    assert_eq!(store.get_int("rate", 0).expect("int"), 4);
    assert!(store.get_bool("flag", false).expect("bool"));
    assert!(!store.get_bool("off", true).expect("bool"));
    assert_eq!(store.get_int("noise", -1).expect("int"), -1);
    assert_eq!(store.get_float("noise", 1.5).expect("float"), 1.5);
    assert!(store.get_bool("noise", true).expect("bool"));
    assert_eq!(store.get_int("missing", 9).expect("int"), 9);
    assert_eq!(store.get_string("missing", "fallback").expect("string"), "fallback");
}

#[test]
fn lists_parse_json_first_and_split_second() {
    let store = demo_store();
    store.put("json", &vec!["x", "y", "z"]).expect("put");
    store.put("csv", "a,b,c").expect("put");
    store.put("dupes", "a,b,a").expect("put");

    assert_eq!(store.get_list("json", ',').expect("list"), ["x", "y", "z"]);
    assert_eq!(store.get_list("csv", ',').expect("list"), ["a", "b", "c"]);
    assert!(store.get_list("missing", ',').expect("list").is_empty());

    let set = store.get_set("dupes", ',').expect("set");
    assert_eq!(set.into_iter().collect::<Vec<_>>(), ["a", "b"]);
}

#[test]
fn maps_require_json_objects() {
    let store = demo_store();
    store.put("conf", &serde_json::json!({"host": "localhost", "port": 8080})).expect("put");
    store.put("scalar", "42").expect("put");

    let map = store.get_map("conf").expect("map");
    assert_eq!(map.get("host").and_then(|v| v.as_str()), Some("localhost"));
    assert!(store.get_map("scalar").expect("map").is_empty());
    assert!(store.get_map("missing").expect("map").is_empty());
}

#[test]
fn bulk_reads_cover_subsets_and_patterns() {
    let store = demo_store();
    store
        .put_many(&[("user:1", "a"), ("user:2", "b"), ("order:1", "c")])
        .expect("seed");

    let subset = store.get_many(&["user:1", "order:1", "ghost"]).expect("get many");
    assert_eq!(subset.len(), 2);
    assert_eq!(subset.get("user:1").map(Vec::as_slice), Some(b"a".as_slice()));
    assert!(store.get_many::<&str>(&[]).expect("empty").is_empty());

    let users = store.like("user:%").expect("like");
    assert_eq!(users.keys().collect::<Vec<_>>(), ["user:1", "user:2"]);
}

#[test]
fn random_keys_come_from_the_stored_set() {
    let store = demo_store();
    let pairs: Vec<(String, String)> =
        (0..10).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
    store.put_many(&pairs).expect("seed");

    let picked = store.random_keys(4).expect("random");
    assert_eq!(picked.len(), 4);
    let all = store.keys().expect("keys");
    assert!(picked.iter().all(|key| all.contains(key)));

    let randoms: BTreeMap<String, Vec<u8>> = store.get_randoms(3).expect("get randoms");
    assert_eq!(randoms.len(), 3);
}

#[test]
fn removal_and_clear_leave_a_usable_store() {
    let store = demo_store();
    store.put_many(&[("a", "1"), ("b", "2"), ("c", "3")]).expect("seed");

    assert!(store.remove("a").expect("remove"));
    assert!(!store.remove("a").expect("remove again"));
    assert_eq!(store.remove_many(&["b", "c", "ghost"]).expect("remove many"), 2);
    assert_eq!(store.remove_many::<&str>(&[]).expect("noop"), 0);

    store.put("again", "x").expect("put");
    store.clear().expect("clear");
    assert!(store.is_empty().expect("empty"));
    store.put("after", "y").expect("put after clear");
    assert_eq!(store.len().expect("len"), 1);
}

#[test]
fn topics_are_isolated_tables() {
    let db = shed_database::Database::open_in_memory().expect("db");
    let first = KvStore::new(db.clone(), "alpha").expect("alpha");
    let second = KvStore::new(db, "beta").expect("beta");

    first.put("shared", "from alpha").expect("put");
    assert!(!second.contains("shared").expect("contains"));
    assert_eq!(first.table_name(), "t_kv_alpha");
    assert_eq!(second.topic(), "beta");
}

#[test]
fn invalid_topics_are_rejected() {
    let err = KvStore::open_in_memory("no-dashes").unwrap_err();
    assert!(matches!(err, KvError::Validation { .. }));
}
