use std::borrow::Cow;

/// Configuration error type.
#[shed_derive::shed_error]
pub enum ConfigError {
    #[error("Configuration file error{}: {source}", format_context(context))]
    Ini { source: ini::Error, context: Option<Cow<'static, str>> },

    #[error("Configuration I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Configuration value error{}: {source}", format_context(context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Config error{}: {source}", format_context(context))]
    Layered { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Internal configuration error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
