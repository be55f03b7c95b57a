use std::borrow::Cow;

/// Clock error type.
#[shed_derive::shed_error]
pub enum ClockError {
    #[error("Date parse error{}: {source}", format_context(context))]
    Parse { source: chrono::ParseError, context: Option<Cow<'static, str>> },

    #[error("Invalid date components{}: {message}", format_context(context))]
    InvalidComponents { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal clock error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
