//! Redis convenience client.
//!
//! [`Redis`] wraps a `fred` client behind a small key/value surface: writes
//! JSON-encode anything that is not already a string or a number, and reads
//! come back as [`RedisJson`], which is decoded JSON when the stored text
//! parses and the raw string otherwise. The full `fred` client stays
//! reachable through [`Redis::client`] for everything else.
//!
//! ```no_run
//! # async fn demo() -> Result<(), shed_redis::RedisError> {
//! let redis = shed_redis::Redis::connect(&shed_redis::RedisParams::default()).await?;
//! redis.set_ex("session:42", &serde_json::json!({ "user": "ada" }), 300).await?;
//! if let Some(value) = redis.get("session:42").await? {
//!     println!("{value:?}");
//! }
//! redis.close().await?;
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::{RedisError, RedisErrorExt};

use fred::prelude::{
    Client, ClientLike, Config, Expiration, HashesInterface, Key, KeysInterface, ServerConfig,
    SetOptions, Value,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Connection settings for one server.
///
/// `url` overrides the individual fields when set.
#[derive(Clone)]
pub struct RedisParams {
    pub host: String,
    pub port: u16,
    pub db: u8,
    pub password: Option<String>,
    pub url: Option<String>,
}

impl Default for RedisParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 6379,
            db: 0,
            password: None,
            url: None,
        }
    }
}

impl fmt::Debug for RedisParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("url", &self.url.as_ref().map(|_| "***"))
            .finish()
    }
}

impl RedisParams {
    /// Parameters for a server reachable on the default port.
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), ..Self::default() }
    }

    /// Parameters from a full connection URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), ..Self::default() }
    }
}

fn build_config(params: &RedisParams) -> Result<Config, RedisError> {
    if let Some(url) = &params.url {
        return Config::from_url(url).context("Parsing Redis URL");
    }
    if params.host.is_empty() {
        return Err(RedisError::Validation {
            message: "missing Redis host".into(),
            context: None,
        });
    }
    Ok(Config {
        server: ServerConfig::new_centralized(params.host.as_str(), params.port),
        password: params.password.clone(),
        database: Some(params.db),
        ..Config::default()
    })
}

/// Turns a value into something the wire protocol carries natively.
///
/// Strings and numbers pass through; everything else is stored as its
/// compact JSON text.
fn coerce<T: Serialize + ?Sized>(value: &T) -> Result<Value, RedisError> {
    let json = serde_json::to_value(value).context("Encoding value")?;
    Ok(match json {
        serde_json::Value::String(text) => text.into(),
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::Integer(int)
            } else if let Some(float) = number.as_f64() {
                Value::Double(float)
            } else {
                number.to_string().into()
            }
        }
        other => other.to_string().into(),
    })
}

/// A value read back from Redis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedisJson {
    /// The stored text parsed as JSON.
    Json(serde_json::Value),
    /// The stored text as-is.
    Raw(String),
}

impl RedisJson {
    /// Decodes stored text, keeping it raw when it is not JSON.
    #[must_use]
    pub fn parse(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Raw(raw),
        }
    }
}

impl From<&str> for RedisJson {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_owned())
    }
}

impl From<String> for RedisJson {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<serde_json::Value> for RedisJson {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Redis client handle.
///
/// Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct Redis {
    client: Client,
}

impl fmt::Debug for Redis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redis")
            .field("connected", &self.client.is_connected())
            .finish_non_exhaustive()
    }
}

impl Redis {
    /// Connects and waits for the connection to come up.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Validation`] when the host is empty and
    /// [`RedisError::Client`] when the URL does not parse or the server is
    /// unreachable.
    pub async fn connect(params: &RedisParams) -> Result<Self, RedisError> {
        let config = build_config(params)?;
        let db = config.database.unwrap_or(0);
        let client = Client::new(config, None, None, None);
        client.connect();
        client.wait_for_connect().await.context("Connecting to Redis")?;
        debug!(db, "Redis client ready");
        Ok(Self { client })
    }

    /// Writes a key.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the write fails.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), RedisError> {
        let value = coerce(value)?;
        self.client.set(key, value, None, None, false).await.context("Writing key")
    }

    /// Writes a key that expires after `seconds`. A non-positive lifetime
    /// writes the key without one.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the write fails.
    pub async fn set_ex<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        seconds: i64,
    ) -> Result<(), RedisError> {
        let value = coerce(value)?;
        let expire = (seconds > 0).then_some(Expiration::EX(seconds));
        self.client.set(key, value, expire, None, false).await.context("Writing key")
    }

    /// Writes a key only when it does not exist yet. Returns whether the
    /// write happened.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the write fails.
    pub async fn set_nx<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<bool, RedisError> {
        let value = coerce(value)?;
        let reply: Option<String> = self
            .client
            .set(key, value, None, Some(SetOptions::NX), false)
            .await
            .context("Writing key")?;
        Ok(reply.is_some())
    }

    /// Reads a key.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the read fails.
    pub async fn get(&self, key: &str) -> Result<Option<RedisJson>, RedisError> {
        let raw: Option<String> = self.client.get(key).await.context("Reading key")?;
        Ok(raw.map(RedisJson::parse))
    }

    /// Reads a key, falling back to `default` when it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the read fails.
    pub async fn get_or(
        &self,
        key: &str,
        default: impl Into<RedisJson> + Send,
    ) -> Result<RedisJson, RedisError> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.into()))
    }

    /// Reads a key and decodes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Json`] when the stored text does not decode
    /// and [`RedisError::Client`] when the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RedisError> {
        let raw: Option<String> = self.client.get(key).await.context("Reading key")?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw).context("Decoding stored value")?)),
            None => Ok(None),
        }
    }

    /// Deletes keys, returning how many existed.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the delete fails.
    pub async fn del(&self, keys: &[&str]) -> Result<u64, RedisError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let keys: Vec<Key> = keys.iter().map(|key| Key::from(*key)).collect();
        self.client.del(keys).await.context("Deleting keys")
    }

    /// Increments a counter by `amount`, creating it at zero first.
    /// Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the key holds something that is
    /// not an integer.
    pub async fn incr(&self, key: &str, amount: i64) -> Result<i64, RedisError> {
        self.client.incr_by(key, amount).await.context("Incrementing key")
    }

    /// Decrements a counter by one, creating it at zero first. Returns the
    /// new value.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the key holds something that is
    /// not an integer.
    pub async fn decr(&self, key: &str) -> Result<i64, RedisError> {
        self.client.decr(key).await.context("Decrementing key")
    }

    /// Writes hash fields, returning how many were new.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the write fails.
    pub async fn hset<T: Serialize>(
        &self,
        name: &str,
        map: &HashMap<String, T>,
    ) -> Result<u64, RedisError> {
        let mut fields: HashMap<Key, Value> = HashMap::with_capacity(map.len());
        for (field, value) in map {
            fields.insert(field.as_str().into(), coerce(value)?);
        }
        self.client.hset(name, fields).await.context("Writing hash fields")
    }

    /// Reads hash fields, with `None` for the ones that do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the read fails.
    pub async fn hget(
        &self,
        name: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<String>>, RedisError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let fields: Vec<Key> = fields.iter().map(|field| Key::from(*field)).collect();
        self.client.hmget(name, fields).await.context("Reading hash fields")
    }

    /// The underlying client, for commands outside this surface.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// # Errors
    ///
    /// Returns [`RedisError::Client`] when the server rejects the close.
    pub async fn close(&self) -> Result<(), RedisError> {
        self.client.quit().await.context("Closing Redis connection")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configs_carry_host_db_and_password() {
        let params = RedisParams {
            port: 6380,
            db: 2,
            password: Some("hunter2".into()),
            ..RedisParams::new("cache.internal")
        };
        let config = build_config(&params).expect("config");
        assert_eq!(config.database, Some(2));
        assert_eq!(config.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn urls_override_the_field_settings() {
        let params = RedisParams::from_url("redis://:pw@cache:6380/3");
        let config = build_config(&params).expect("config");
        assert_eq!(config.database, Some(3));
        assert_eq!(config.password.as_deref(), Some("pw"));
    }

    #[test]
    fn empty_hosts_are_rejected() {
        let params = RedisParams { host: String::new(), ..RedisParams::default() };
        assert!(matches!(build_config(&params), Err(RedisError::Validation { .. })));
    }

    #[test]
    fn primitives_pass_through_and_structs_become_json() {
        assert_eq!(coerce("plain").expect("str"), Value::String("plain".into()));
        assert_eq!(coerce(&7_i64).expect("int"), Value::Integer(7));
        assert_eq!(coerce(&2.5_f64).expect("float"), Value::Double(2.5));
        assert_eq!(coerce(&true).expect("bool"), Value::String("true".into()));
        assert_eq!(
            coerce(&json!({ "a": 1 })).expect("object"),
            Value::String(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn stored_text_parses_as_json_or_stays_raw() {
        assert_eq!(RedisJson::parse(r#"{"a":1}"#.to_owned()), RedisJson::Json(json!({ "a": 1 })));
        assert_eq!(RedisJson::parse("17".to_owned()), RedisJson::Json(json!(17)));
        assert_eq!(RedisJson::parse("plain text".to_owned()), RedisJson::Raw("plain text".into()));
    }

    #[test]
    fn defaults_convert_into_fallback_values() {
        assert_eq!(RedisJson::from("missing"), RedisJson::Raw("missing".into()));
        assert_eq!(RedisJson::from(json!(null)), RedisJson::Json(json!(null)));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let params = RedisParams {
            password: Some("hunter2".into()),
            url: Some("redis://:hunter2@cache/0".into()),
            ..RedisParams::default()
        };
        let debug = format!("{params:?}");
        assert!(!debug.contains("hunter2"));
    }
}
