use std::borrow::Cow;

/// Random generator error type.
#[shed_derive::shed_error]
pub enum RandomError {
    #[error("Internal random error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
