use std::borrow::Cow;

/// Filesystem error type.
#[shed_derive::shed_error]
pub enum FsError {
    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Traversal error{}: {source}", format_context(context))]
    Walk { source: walkdir::Error, context: Option<Cow<'static, str>> },

    #[error("Zip error{}: {source}", format_context(context))]
    Zip { source: zip::result::ZipError, context: Option<Cow<'static, str>> },

    #[error("Invalid path{}: {message}", format_context(context))]
    InvalidPath { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal filesystem error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
