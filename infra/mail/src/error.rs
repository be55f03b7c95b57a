use std::borrow::Cow;

/// Mailer error type.
#[shed_derive::shed_error]
pub enum MailError {
    #[error("SMTP error{}: {source}", format_context(context))]
    Smtp { source: lettre::transport::smtp::Error, context: Option<Cow<'static, str>> },

    #[error("Message error{}: {source}", format_context(context))]
    Message { source: lettre::error::Error, context: Option<Cow<'static, str>> },

    #[error("Address error{}: {source}", format_context(context))]
    Address { source: lettre::address::AddressError, context: Option<Cow<'static, str>> },

    #[error("Config error{}: {source}", format_context(context))]
    Config { source: shed_config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal mail error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
