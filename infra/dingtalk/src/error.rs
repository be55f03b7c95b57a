use std::borrow::Cow;

/// DingTalk client error type.
#[shed_derive::shed_error]
pub enum DingTalkError {
    #[error("Request error{}: {source}", format_context(context))]
    Request { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[error("Config error{}: {source}", format_context(context))]
    Config { source: shed_config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("DingTalk refused the message (errcode {code}){}: {message}", format_context(context))]
    Api { code: i64, message: String, context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal DingTalk error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
