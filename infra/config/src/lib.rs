//! # Config
//!
//! INI-backed configuration access.
//!
//! Two complementary entry points:
//!
//! 1. [`Config`]: a read-write handle over a single `.ini` file with typed
//!    getters, JSON-encoded structured values, and optional auto-save after
//!    every mutation.
//! 2. [`load`]: a one-shot, layered loader that deserializes an INI file into
//!    a typed struct, with `SHED__SECTION__KEY` environment overrides.
//!
//! The empty string addresses the general (unnamed) section.
//!
//! ## Example
//!
//! ```rust
//! use shed_config::Config;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # let path = dir.path().join("app.ini");
//! let config = Config::open(&path).unwrap().auto_save(false);
//! config.set("server", "port", 8080).unwrap();
//! assert_eq!(config.get_int("server", "port", 0), 8080);
//! assert!(config.get("server", "host").is_none());
//! ```

mod error;

pub use crate::error::{ConfigError, ConfigErrorExt};

use config::{Environment, File, FileFormat};
use ini::Ini;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Separator used when a list value is not a JSON array.
const ITEM_SEPARATOR: char = ',';

#[derive(Debug)]
struct ConfigInner {
    path: PathBuf,
    doc: RwLock<Ini>,
    auto_save: AtomicBool,
}

/// A read-write handle over a single INI file.
///
/// The handle is internally reference-counted and can be cheaply cloned
/// across threads. Mutations go through an internal lock; with auto-save
/// enabled (the default) every mutation is persisted immediately.
///
/// Getters never fail: a missing section or key yields the supplied default
/// (or `None`), and malformed values fall back the same way.
#[derive(Debug, Clone)]
pub struct Config {
    inner: Arc<ConfigInner>,
}

impl Config {
    /// Opens the INI file at `path`.
    ///
    /// A missing file yields an empty document; the file is created on the
    /// first [`Config::save`].
    ///
    /// # Errors
    /// Returns [`ConfigError::Ini`] if an existing file cannot be parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let doc = load_document(&path)?;

        Ok(Self {
            inner: Arc::new(ConfigInner {
                path,
                doc: RwLock::new(doc),
                auto_save: AtomicBool::new(true),
            }),
        })
    }

    /// Enables or disables saving after every mutation (enabled by default).
    #[must_use]
    pub fn auto_save(self, enabled: bool) -> Self {
        self.inner.auto_save.store(enabled, Ordering::Relaxed);
        self
    }

    /// The path this handle reads from and writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Returns the raw value of `key` in `section`, if present.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.inner.doc.read().get_from(section_of(section), key).map(str::to_owned)
    }

    /// Returns the value of `key` in `section`, or `default` when absent.
    #[must_use]
    pub fn get_or(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or_else(|| default.to_owned())
    }

    /// Returns the value parsed as an integer, or `default` when absent or
    /// not a number. Surrounding whitespace is tolerated.
    #[must_use]
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get(section, key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }

    /// Returns the value parsed as a float, or `default` when absent or not
    /// a number.
    #[must_use]
    pub fn get_float(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get(section, key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }

    /// Returns the value parsed as a boolean, or `default` when absent or
    /// unrecognized.
    ///
    /// Accepts `1`/`0`, `true`/`false`, `yes`/`no` and `on`/`off`, case
    /// insensitive.
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get(section, key).and_then(|v| parse_bool(v.trim())).unwrap_or(default)
    }

    /// Deserializes a JSON-encoded value.
    ///
    /// Returns `None` when the key is absent or the value is not valid JSON
    /// for `T`.
    #[must_use]
    pub fn get_json<T: DeserializeOwned>(&self, section: &str, key: &str) -> Option<T> {
        let raw = self.get(section, key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring malformed JSON at [{section}] {key}: {e}");
                None
            },
        }
    }

    /// Returns the value as a list of strings.
    ///
    /// A JSON array is taken element-wise; any other text is split on `,`
    /// with entries trimmed and empties dropped. Absent keys yield an empty
    /// list.
    #[must_use]
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key).map_or_else(Vec::new, |raw| parse_items(&raw))
    }

    /// Like [`Config::get_list`], but deduplicated into a set.
    #[must_use]
    pub fn get_set(&self, section: &str, key: &str) -> HashSet<String> {
        self.get_list(section, key).into_iter().collect()
    }

    /// Returns a JSON object value as a map. Absent or malformed values
    /// yield an empty map.
    #[must_use]
    pub fn get_map(&self, section: &str, key: &str) -> serde_json::Map<String, serde_json::Value> {
        self.get_json(section, key).unwrap_or_default()
    }

    /// Sets `key` in `section` to the string form of `value`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if auto-save is enabled and the file
    /// cannot be written.
    pub fn set(&self, section: &str, key: &str, value: impl ToString) -> Result<(), ConfigError> {
        self.inner.doc.write().set_to(section_of(section), key.to_owned(), value.to_string());
        self.maybe_save()
    }

    /// Sets `key` in `section` to the compact JSON encoding of `value`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Json`] when serialization fails, or
    /// [`ConfigError::Io`] if auto-save is enabled and the file cannot be
    /// written.
    pub fn set_json<T: Serialize>(
        &self,
        section: &str,
        key: &str,
        value: &T,
    ) -> Result<(), ConfigError> {
        let text = serde_json::to_string(value)?;
        self.set(section, key, text)
    }

    /// Returns whether `key` exists in `section`.
    #[must_use]
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.inner.doc.read().get_from(section_of(section), key).is_some()
    }

    /// Returns whether `section` exists.
    #[must_use]
    pub fn contains_section(&self, section: &str) -> bool {
        self.inner.doc.read().section(section_of(section)).is_some()
    }

    /// Removes `key` from `section`, returning the previous value.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if auto-save is enabled and the file
    /// cannot be written.
    pub fn remove(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        let previous = self.inner.doc.write().delete_from(section_of(section), key);
        self.maybe_save()?;
        Ok(previous)
    }

    /// Removes a whole section, returning whether it existed.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if auto-save is enabled and the file
    /// cannot be written.
    pub fn remove_section(&self, section: &str) -> Result<bool, ConfigError> {
        let existed = self.inner.doc.write().delete(section_of(section)).is_some();
        self.maybe_save()?;
        Ok(existed)
    }

    /// Removes every section and persists the now-empty document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be written.
    pub fn clear(&self) -> Result<(), ConfigError> {
        *self.inner.doc.write() = Ini::new();
        self.save()
    }

    /// Writes the document to disk, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the directory or file cannot be
    /// written.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.inner.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Creating configuration directory")?;
            }
        }

        self.inner
            .doc
            .read()
            .write_to_file(&self.inner.path)
            .context(format!("Writing {}", self.inner.path.display()))
    }

    /// Reloads the document from disk, discarding unsaved edits.
    ///
    /// # Errors
    /// Returns [`ConfigError::Ini`] if the file cannot be parsed.
    pub fn refresh(&self) -> Result<(), ConfigError> {
        let doc = load_document(&self.inner.path)?;
        *self.inner.doc.write() = doc;
        Ok(())
    }

    /// Names of all named sections, in document order.
    #[must_use]
    pub fn sections(&self) -> Vec<String> {
        self.inner.doc.read().sections().flatten().map(str::to_owned).collect()
    }

    /// Keys of `section`, in document order.
    #[must_use]
    pub fn keys(&self, section: &str) -> Vec<String> {
        self.inner
            .doc
            .read()
            .section(section_of(section))
            .map_or_else(Vec::new, |props| props.iter().map(|(key, _)| key.to_owned()).collect())
    }

    fn maybe_save(&self) -> Result<(), ConfigError> {
        if self.inner.auto_save.load(Ordering::Relaxed) { self.save() } else { Ok(()) }
    }
}

/// A layered configuration loader that combines an INI file with environment
/// overrides.
///
/// Values from environment variables prefixed with `SHED__` overlay the file.
/// Nested structures use double underscores, e.g. `SHED__DATABASE__URL` maps
/// to `database.url`.
///
/// # Errors
/// Returns [`ConfigError::Layered`] if the file is missing, cannot be parsed,
/// or does not match the structure of `T`.
///
/// # Example
/// ```rust
/// use shed_config::load;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load("config/local.ini").unwrap_or_default();
/// ```
pub fn load<T>(path: impl AsRef<Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();

    let builder = config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Ini).required(true))
        .add_source(
            Environment::with_prefix("SHED")
                .separator("__")
                .convert_case(config::Case::Snake),
        );

    info!("Loading config from {}", path.display());

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

fn section_of(section: &str) -> Option<&str> {
    (!section.is_empty()).then_some(section)
}

fn load_document(path: &Path) -> Result<Ini, ConfigError> {
    if path.exists() {
        Ini::load_from_file(path).context(format!("Loading {}", path.display()))
    } else {
        Ok(Ini::new())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_items(raw: &str) -> Vec<String> {
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        return values
            .into_iter()
            .map(|value| match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }

    raw.split(ITEM_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_table() {
        for truthy in ["1", "true", "Yes", "ON", "True"] {
            assert_eq!(parse_bool(truthy), Some(true), "{truthy}");
        }
        for falsy in ["0", "false", "No", "OFF", "False"] {
            assert_eq!(parse_bool(falsy), Some(false), "{falsy}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn items_from_json_and_separator() {
        assert_eq!(parse_items(r#"["a", "b", "c"]"#), vec!["a", "b", "c"]);
        assert_eq!(parse_items("[1, 2]"), vec!["1", "2"]);
        assert_eq!(parse_items(" a , b ,, c "), vec!["a", "b", "c"]);
        assert!(parse_items("  ").is_empty());
    }

    #[test]
    fn empty_string_addresses_general_section() {
        assert_eq!(section_of(""), None);
        assert_eq!(section_of("server"), Some("server"));
    }
}
