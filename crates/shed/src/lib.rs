//! Facade crate for the toolshed workspace.
//! Re-exports every toolkit behind a Cargo feature of the same name.
//! Keep this crate thin: it should compose the toolkits, not implement behavior.
//!
//! ## Usage
//! - Add `shed` with the toolkit features you need, or `full` for all of them.
//! - Each toolkit surfaces as a module: `shed::config`, `shed::redis`, ...
//! - With `kafka` or `rabbit` enabled, [`mq`] builds message-queue clients.

#[cfg(feature = "clock")]
pub use shed_clock as clock;
#[cfg(feature = "config")]
pub use shed_config as config;
#[cfg(feature = "crypto")]
pub use shed_crypto as crypto;
#[cfg(feature = "database")]
pub use shed_database as database;
#[cfg(feature = "dingtalk")]
pub use shed_dingtalk as dingtalk;
#[cfg(feature = "fs")]
pub use shed_fs as fs;
#[cfg(feature = "http")]
pub use shed_http as http;
#[cfg(feature = "kafka")]
pub use shed_kafka as kafka;
#[cfg(feature = "kv")]
pub use shed_kv as kv;
#[cfg(feature = "logger")]
pub use shed_logger as logger;
#[cfg(feature = "mail")]
pub use shed_mail as mail;
#[cfg(feature = "rabbit")]
pub use shed_rabbit as rabbit;
#[cfg(feature = "random")]
pub use shed_random as random;
#[cfg(feature = "redis")]
pub use shed_redis as redis;

#[cfg(any(feature = "kafka", feature = "rabbit"))]
pub mod mq;

/// Toolkit registry for runtime introspection.
pub mod toolkits {
    /// Build-time enabled toolkits (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "clock")]
        "clock",
        #[cfg(feature = "config")]
        "config",
        #[cfg(feature = "crypto")]
        "crypto",
        #[cfg(feature = "database")]
        "database",
        #[cfg(feature = "dingtalk")]
        "dingtalk",
        #[cfg(feature = "fs")]
        "fs",
        #[cfg(feature = "http")]
        "http",
        #[cfg(feature = "kafka")]
        "kafka",
        #[cfg(feature = "kv")]
        "kv",
        #[cfg(feature = "logger")]
        "logger",
        #[cfg(feature = "mail")]
        "mail",
        #[cfg(feature = "rabbit")]
        "rabbit",
        #[cfg(feature = "random")]
        "random",
        #[cfg(feature = "redis")]
        "redis",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::toolkits;

    #[test]
    fn enabled_list_tracks_the_build_features() {
        assert_eq!(toolkits::is_enabled("kafka"), cfg!(feature = "kafka"));
        assert_eq!(toolkits::is_enabled("redis"), cfg!(feature = "redis"));
        assert!(!toolkits::is_enabled("unknown"));
    }
}
