//! Key-value store on top of the SQL layer.
//!
//! A [`KvStore`] binds a [`Database`] handle to a `topic`; each topic lives
//! in its own `t_kv_{topic}` table with a `data_key` primary key and a
//! `data_value` payload, created on first use. Strings and numbers are
//! stored in their display form, everything else as JSON text, raw bytes as
//! blobs. Typed getters fall back to a caller default instead of erroring
//! on absent or unparsable payloads.
//!
//! ```
//! use shed_kv::KvStore;
//!
//! fn main() -> Result<(), shed_kv::KvError> {
//!     let store = KvStore::open_in_memory("cache")?;
//!     store.put("greeting", &"hello")?;
//!     store.put("retries", &3)?;
//!     assert_eq!(store.get_string("greeting", "")?, "hello");
//!     assert_eq!(store.get_int("retries", 0)?, 3);
//!     Ok(())
//! }
//! ```

mod error;

pub use crate::error::{KvError, KvErrorExt};

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use shed_database::{Backend, Database, SqlValue, in_sql, sql_params};
use tracing::debug;

/// Key-value store bound to one topic table.
#[derive(Debug, Clone)]
pub struct KvStore {
    db: Database,
    topic: String,
    table: String,
}

impl KvStore {
    /// Binds a store to `topic` on an existing database handle, creating
    /// the backing table when missing.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Validation`] when the topic is empty or carries
    /// characters other than ASCII alphanumerics and `_`.
    pub fn new(db: Database, topic: &str) -> Result<Self, KvError> {
        validate_topic(topic)?;
        let store = Self { db, topic: topic.to_owned(), table: format!("t_kv_{topic}") };
        store.ensure_table()?;
        Ok(store)
    }

    /// Opens (or creates) a SQLite-backed store at `path`.
    pub fn open(path: impl Into<PathBuf>, topic: &str) -> Result<Self, KvError> {
        Self::new(Database::open(path)?, topic)
    }

    /// Opens an in-memory SQLite-backed store.
    pub fn open_in_memory(topic: &str) -> Result<Self, KvError> {
        Self::new(Database::open_in_memory()?, topic)
    }

    /// The topic this store is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The backing table name, `t_kv_{topic}`.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// The underlying database handle.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Stores a serializable value under `key`, replacing any previous one.
    ///
    /// Strings and numbers are stored in their display form, everything
    /// else as JSON text. Raw byte payloads belong to
    /// [`put_bytes`](Self::put_bytes); a `Vec<u8>` here serializes as a
    /// JSON array.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), KvError> {
        let payload = encode_value(value)?;
        self.replace_value(key, SqlValue::Text(payload))
    }

    /// Stores a raw byte payload under `key`. Empty payloads are ignored.
    pub fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), KvError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.replace_value(key, SqlValue::Blob(bytes.to_vec()))
    }

    /// Stores the contents of a file under `key`.
    pub fn put_file(&self, key: &str, path: impl AsRef<Path>) -> Result<(), KvError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(format!("Reading {}", path.display()))?;
        self.put_bytes(key, &bytes)
    }

    /// Stores several pairs in one `REPLACE` batch and returns the affected
    /// row count.
    pub fn put_many<K, T>(&self, pairs: &[(K, T)]) -> Result<usize, KvError>
    where
        K: AsRef<str>,
        T: Serialize,
    {
        if pairs.is_empty() {
            return Ok(0);
        }
        let mut rows = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            rows.push(sql_params![key.as_ref(), encode_value(value)?]);
        }
        let sql = format!("REPLACE INTO {} (data_key, data_value) VALUES (?, ?)", self.table);
        Ok(self.db.replace_batch(&sql, &rows, true)?)
    }

    /// Raw payload bytes under `key`.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let sql = format!("SELECT data_value FROM {} WHERE data_key = ?", self.table);
        let value = self.db.get_column_value(&sql, &sql_params![key], "data_value")?;
        Ok(value.and_then(value_bytes))
    }

    /// Payloads for `keys`, keyed by the keys that exist.
    pub fn get_many<S: AsRef<str>>(
        &self,
        keys: &[S],
    ) -> Result<BTreeMap<String, Vec<u8>>, KvError> {
        if keys.is_empty() {
            return Ok(BTreeMap::new());
        }
        let items: Vec<SqlValue> = keys.iter().map(|key| key.as_ref().into()).collect();
        let sql = format!(
            "SELECT data_key, data_value FROM {} WHERE data_key{}",
            self.table,
            in_sql(&items)?
        );
        self.collect_pairs(&sql, &[])
    }

    /// Writes the payload under `key` to `path`, creating missing parent
    /// directories. Returns the byte count, or `None` when the key is
    /// absent.
    pub fn get_file(
        &self,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<Option<u64>, KvError> {
        let Some(bytes) = self.get(key)? else {
            return Ok(None);
        };
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .context(format!("Creating {}", parent.display()))?;
        }
        std::fs::write(path, &bytes).context(format!("Writing {}", path.display()))?;
        Ok(Some(u64::try_from(bytes.len()).unwrap_or(u64::MAX)))
    }

    /// Every key, sorted.
    pub fn keys(&self) -> Result<Vec<String>, KvError> {
        let sql = format!("SELECT data_key FROM {} ORDER BY data_key", self.table);
        let rows = self.db.select_unlimited(&sql, &[])?;
        Ok(rows.iter().filter_map(|row| row.get_string("data_key")).collect())
    }

    /// Up to `n` keys in random order; `0` shuffles them all.
    pub fn random_keys(&self, n: usize) -> Result<Vec<String>, KvError> {
        let order = if self.db.backend() == Backend::Sqlite { "RANDOM()" } else { "RAND()" };
        let sql = format!("SELECT data_key FROM {} ORDER BY {order}", self.table);
        let rows = self.db.select_limited(&sql, &[], n)?;
        Ok(rows.iter().filter_map(|row| row.get_string("data_key")).collect())
    }

    /// Payloads for up to `n` random keys.
    pub fn get_randoms(&self, n: usize) -> Result<BTreeMap<String, Vec<u8>>, KvError> {
        let keys = self.random_keys(n)?;
        self.get_many(&keys)
    }

    /// Payloads whose key matches a SQL `LIKE` pattern. The pattern is
    /// bound as a parameter, so `%` and `_` keep their wildcard meaning on
    /// both engines.
    pub fn like(&self, pattern: &str) -> Result<BTreeMap<String, Vec<u8>>, KvError> {
        let sql =
            format!("SELECT data_key, data_value FROM {} WHERE data_key LIKE ?", self.table);
        self.collect_pairs(&sql, &sql_params![pattern])
    }

    /// Removes `key`. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool, KvError> {
        let sql = format!("DELETE FROM {} WHERE data_key = ?", self.table);
        Ok(self.db.delete(&sql, &sql_params![key], true)? > 0)
    }

    /// Removes every listed key and returns the removed count.
    pub fn remove_many<S: AsRef<str>>(&self, keys: &[S]) -> Result<usize, KvError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let items: Vec<SqlValue> = keys.iter().map(|key| key.as_ref().into()).collect();
        let sql =
            format!("DELETE FROM {} WHERE data_key{}", self.table, in_sql(&items)?);
        Ok(self.db.delete(&sql, &[], true)?)
    }

    /// Drops and recreates the topic table, so the store stays usable.
    pub fn clear(&self) -> Result<(), KvError> {
        self.db.drop_table(&self.table, true)?;
        self.ensure_table()?;
        debug!(topic = %self.topic, "Key-value store cleared");
        Ok(())
    }

    /// Number of stored keys.
    pub fn len(&self) -> Result<u64, KvError> {
        Ok(self.db.count(&self.table)?)
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> Result<bool, KvError> {
        Ok(self.len()? == 0)
    }

    /// Whether `key` is stored.
    pub fn contains(&self, key: &str) -> Result<bool, KvError> {
        let sql = format!("SELECT COUNT(1) AS cnt FROM {} WHERE data_key = ?", self.table);
        Ok(self.db.get_int(&sql, &sql_params![key])?.unwrap_or(0) > 0)
    }

    /// Payload as text, or `default` when absent or not UTF-8.
    pub fn get_string(&self, key: &str, default: &str) -> Result<String, KvError> {
        Ok(self.get_text(key)?.unwrap_or_else(|| default.to_owned()))
    }

    /// Payload as an integer; text like `"4.2"` truncates. Falls back to
    /// `default`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, KvError> {
        let Some(text) = self.get_text(key)? else {
            return Ok(default);
        };
        let text = text.trim();
        Ok(text
            .parse::<i64>()
            .ok()
            .or_else(|| text.parse::<f64>().ok().map(|f| f as i64))
            .unwrap_or(default))
    }

    /// Payload as a float, or `default`.
    pub fn get_float(&self, key: &str, default: f64) -> Result<f64, KvError> {
        let Some(text) = self.get_text(key)? else {
            return Ok(default);
        };
        Ok(text.trim().parse().unwrap_or(default))
    }

    /// Payload as a bool. Accepts `0`/`1`, `true`/`false` spellings and
    /// numeric text; anything else falls back to `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, KvError> {
        let Some(text) = self.get_text(key)? else {
            return Ok(default);
        };
        Ok(match text.trim() {
            "1" | "true" | "True" => true,
            "0" | "false" | "False" => false,
            other => other.parse::<f64>().map_or(default, |f| f.abs() > f64::EPSILON),
        })
    }

    /// Payload deserialized from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Json`] when the payload exists but does not
    /// deserialize into `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, KvError> {
        let Some(bytes) = self.get(key)? else {
            return Ok(None);
        };
        let value =
            serde_json::from_slice(&bytes).context(format!("Decoding key '{key}'"))?;
        Ok(Some(value))
    }

    /// Payload as a list: a JSON array when it parses as one, otherwise the
    /// text split at `separator`. Absent or non-text payloads yield an
    /// empty list.
    pub fn get_list(&self, key: &str, separator: char) -> Result<Vec<String>, KvError> {
        let Some(text) = self.get_text(key)? else {
            return Ok(Vec::new());
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(&text) {
            return Ok(items.into_iter().map(json_text).collect());
        }
        Ok(text.split(separator).map(str::to_owned).collect())
    }

    /// [`get_list`](Self::get_list) deduplicated into a sorted set.
    pub fn get_set(&self, key: &str, separator: char) -> Result<BTreeSet<String>, KvError> {
        Ok(self.get_list(key, separator)?.into_iter().collect())
    }

    /// Payload as a JSON object; anything else yields an empty map.
    pub fn get_map(
        &self,
        key: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, KvError> {
        let Some(text) = self.get_text(key)? else {
            return Ok(serde_json::Map::new());
        };
        match serde_json::from_str(&text) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }

    /// Turns statement timing logs on for the underlying handle.
    pub fn enable_debug(&self) {
        self.db.enable_debug();
    }

    /// Turns statement timing logs off.
    pub fn disable_debug(&self) {
        self.db.disable_debug();
    }

    /// Closes the underlying database handle.
    pub fn close(&self) -> Result<(), KvError> {
        Ok(self.db.close()?)
    }

    fn ensure_table(&self) -> Result<(), KvError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (data_key varchar(255) PRIMARY KEY, data_value blob)",
            self.table
        );
        self.db.execute(&sql, &[], true)?;
        debug!(topic = %self.topic, "Key-value table ready");
        Ok(())
    }

    fn replace_value(&self, key: &str, value: SqlValue) -> Result<(), KvError> {
        let sql = format!("REPLACE INTO {} (data_key, data_value) VALUES (?, ?)", self.table);
        self.db.replace(&sql, &[key.into(), value], true)?;
        Ok(())
    }

    fn collect_pairs(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<BTreeMap<String, Vec<u8>>, KvError> {
        let rows = self.db.select_unlimited(sql, params)?;
        let mut pairs = BTreeMap::new();
        for row in rows {
            let Some(key) = row.get_string("data_key") else {
                continue;
            };
            if let Some(bytes) = row.get("data_value").cloned().and_then(value_bytes) {
                pairs.insert(key, bytes);
            }
        }
        Ok(pairs)
    }

    fn get_text(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.get(key)?.and_then(|bytes| String::from_utf8(bytes).ok()))
    }
}

fn validate_topic(topic: &str) -> Result<(), KvError> {
    if topic.is_empty() || !topic.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(KvError::Validation {
            message: format!("topic must be ASCII alphanumeric or '_': {topic:?}").into(),
            context: None,
        });
    }
    Ok(())
}

fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<String, KvError> {
    let json = serde_json::to_value(value).context("Encoding value")?;
    Ok(json_text(json))
}

fn json_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

fn value_bytes(value: SqlValue) -> Option<Vec<u8>> {
    match value {
        SqlValue::Blob(bytes) => Some(bytes),
        SqlValue::Text(text) => Some(text.into_bytes()),
        SqlValue::Integer(i) => Some(i.to_string().into_bytes()),
        SqlValue::Real(f) => Some(f.to_string().into_bytes()),
        SqlValue::Null => None,
    }
}
