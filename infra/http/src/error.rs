use std::borrow::Cow;

/// HTTP client error type.
#[shed_derive::shed_error]
pub enum HttpError {
    #[error("Request error{}: {source}", format_context(context))]
    Request { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal HTTP error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
