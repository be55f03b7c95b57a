//! # Logger
//!
//! Toolkit for initializing the global tracing subscriber with a console
//! layer and, per topic, a daily-rolling log file with bounded retention.
//!
//! A "topic" names a logging destination: files land under
//! `~/logs/{topic}/{topic}.{date}.log` by default, with the base directory
//! overridable for tests and services that keep logs elsewhere.
//!
//! * Use [`LoggerBuilder::env_filter`] to set module-directed filters
//!   (e.g., `"myapp=debug,hyper=info"`), in addition to `RUST_LOG`.
//! * The `json` feature switches the file layer to JSON lines.
//!
//! ## Example
//!
//! ```rust
//! # use shed_logger::{Logger, LevelFilter};
//!
//! let _logger = Logger::builder()
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use private::Sealed;
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 30;
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug)]
pub struct LoggerConfig {
    console: bool,
    dir: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    #[cfg(feature = "json")]
    json: bool,
    env_filter: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: true,
            dir: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            #[cfg(feature = "json")]
            json: false,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoTopic;
#[derive(Debug)]
pub struct WithTopic(String);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoTopic {}
impl Sealed for WithTopic {}

/// A builder for configuring and initializing the global tracing subscriber.
#[derive(Debug)]
pub struct LoggerBuilder<T: Sealed = NoTopic> {
    config: LoggerConfig,
    topic: T,
}

impl<T: Sealed> LoggerBuilder<T> {
    /// Configures the minimum log level to be emitted.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.config.level = level;
        self
    }

    /// Adds an explicit env filter (e.g., `myapp=debug,hyper=info`).
    ///
    /// Environment variables still override via `RUST_LOG`; this is a programmatic default.
    /// Invalid filters will cause [`LoggerBuilder::init`] to return an error.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.env_filter = Some(filter.into());
        self
    }

    /// Enables console logging.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    /// Attaches a rolling log file for the given topic.
    ///
    /// The topic names both the file prefix and its directory beneath the
    /// log base directory.
    pub fn topic(self, topic: impl Into<String>) -> LoggerBuilder<WithTopic> {
        LoggerBuilder { config: self.config, topic: WithTopic(topic.into()) }
    }
}

impl LoggerBuilder<NoTopic> {
    /// Consumes the builder and initializes a console-only subscriber.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber has already been set.
    /// Returns [`LoggerError::InvalidConfiguration`] if console output is disabled,
    /// as that would leave no layers at all.
    pub fn init(self) -> Result<Logger, LoggerError> {
        if !self.config.console {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled. Enable console output or add a topic.".into(),
                context: None,
            });
        }

        let env_filter = build_env_filter(&self.config)?;
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().compact().with_ansi(true))
            .try_init()?;

        Ok(Logger { guard: None, dir: None })
    }
}

impl LoggerBuilder<WithTopic> {
    /// Overrides the base directory for log files (default `~/logs`).
    ///
    /// The topic directory is still appended beneath it.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dir = Some(dir.into());
        self
    }

    /// Configures maximum number of log files to keep.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.config.max_files = max;
        self
    }

    /// Configures the log file rotation strategy.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.config.rotation = rotation;
        self
    }

    /// Switches the file layer to JSON lines.
    #[cfg(feature = "json")]
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self) -> Self {
        self.config.json = true;
        self
    }

    /// Consumes the builder and initializes the global tracing subscriber.
    ///
    /// # Returns
    /// A [`Logger`] handle. **Note:** This handle contains a [`WorkerGuard`]
    /// that must be kept alive for the duration of the program to ensure
    /// that non-blocking logs are flushed correctly.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber has already been set.
    /// Returns [`LoggerError::InvalidConfiguration`] for invalid builder settings.
    /// Returns [`LoggerError::Io`] if the log directory cannot be created.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let topic = self.topic.0;
        validate_config(&self.config, &topic)?;

        let env_filter = build_env_filter(&self.config)?;
        let dir = resolve_dir(self.config.dir, &topic)?;

        fs::create_dir_all(&dir).context(format!("Creating log directory {}", dir.display()))?;

        let file_appender = RollingFileAppender::builder()
            .rotation(self.config.rotation)
            .filename_prefix(&topic)
            .filename_suffix(LOG_FILE_SUFFIX)
            .max_log_files(self.config.max_files)
            .build(&dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = layer().with_writer(non_blocking).with_ansi(false);

        #[cfg(feature = "json")]
        let file_layer =
            if self.config.json { file_layer.json().boxed() } else { file_layer.boxed() };
        #[cfg(not(feature = "json"))]
        let file_layer = file_layer.boxed();

        let mut layers = vec![file_layer];
        if self.config.console {
            layers.push(layer().compact().with_ansi(true).boxed());
        }

        tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;

        Ok(Logger { guard: Some(guard), dir: Some(dir) })
    }
}

/// A handle to the initialized logging system.
///
/// This struct holds the background worker guard. Drop this struct only
/// when the application is shutting down.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
    dir: Option<PathBuf>,
}

impl Logger {
    /// Returns a new [`LoggerBuilder`] to configure the global tracing subscriber.
    ///
    /// Call [`LoggerBuilder::topic`] to attach a rolling log file; the topic
    /// becomes the file prefix (e.g., `worker.2026-08-26.log`).
    ///
    /// # Example
    ///
    /// ```rust
    /// use shed_logger::{LevelFilter, Logger};
    ///
    /// let _logger = Logger::builder()
    ///     .level(LevelFilter::DEBUG)
    ///     .init()
    ///     .unwrap();
    /// ```
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { config: LoggerConfig::default(), topic: NoTopic }
    }

    /// Manually triggers a flush of all pending logs in the non-blocking worker.
    ///
    /// While flushing happens automatically when this handle is dropped, this
    /// method acts as a best-effort synchronization point before shutdown.
    pub fn flush(&self) {
        tracing::debug!("Logger flushed");
    }

    /// Returns a reference to the underlying worker guard, if present.
    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }

    /// The directory receiving rolling log files, if file logging is active.
    #[must_use]
    pub fn log_dir(&self) -> Option<&std::path::Path> {
        self.dir.as_deref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn validate_config(config: &LoggerConfig, topic: &str) -> Result<(), LoggerError> {
    if topic.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Log topic cannot be empty".into(),
            context: None,
        });
    }

    if topic.contains(['/', '\\']) || topic.contains("..") {
        return Err(LoggerError::InvalidConfiguration {
            message: format!("Log topic '{topic}' must not contain path separators").into(),
            context: None,
        });
    }

    if config.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }

    Ok(())
}

fn resolve_dir(base: Option<PathBuf>, topic: &str) -> Result<PathBuf, LoggerError> {
    let base = match base {
        Some(dir) => dir,
        None => home::home_dir()
            .ok_or_else(|| LoggerError::InvalidConfiguration {
                message: "Home directory could not be resolved; set an explicit log dir".into(),
                context: None,
            })?
            .join("logs"),
    };
    Ok(base.join(topic))
}

fn build_env_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(config.level.into());
    config.env_filter.as_ref().map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| {
            builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{filter}': {e}").into(),
                context: None,
            })
        },
    )
}
