use std::borrow::Cow;

/// Crypto error type.
#[shed_derive::shed_error]
pub enum CryptoError {
    #[error("RSA error{}: {source}", format_context(context))]
    Rsa { source: rsa::Error, context: Option<Cow<'static, str>> },

    #[error("Base64 error{}: {source}", format_context(context))]
    Base64 { source: base64::DecodeError, context: Option<Cow<'static, str>> },

    #[error("Text decoding error{}: {source}", format_context(context))]
    Utf8 { source: std::string::FromUtf8Error, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid key material{}: {message}", format_context(context))]
    InvalidKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid data{}: {message}", format_context(context))]
    InvalidData { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unsupported operation{}: {message}", format_context(context))]
    Unsupported { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal crypto error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
