use std::borrow::Cow;

/// Database error type.
#[shed_derive::shed_error]
pub enum DatabaseError {
    #[error("SQLite error{}: {source}", format_context(context))]
    Sqlite { source: rusqlite::Error, context: Option<Cow<'static, str>> },

    #[cfg(feature = "mysql")]
    #[error("MySQL error{}: {source}", format_context(context))]
    Mysql { source: mysql::Error, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Database connection is closed{}", format_context(context))]
    Closed { context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal database error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
