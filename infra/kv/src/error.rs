use std::borrow::Cow;

/// Key-value store error type.
#[shed_derive::shed_error]
pub enum KvError {
    #[error("Database error{}: {source}", format_context(context))]
    Database { source: shed_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[error("JSON error{}: {source}", format_context(context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal key-value error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
