use std::borrow::Cow;

/// RabbitMQ error type.
#[shed_derive::shed_error]
pub enum RabbitError {
    #[error("AMQP error{}: {source}", format_context(context))]
    Client { source: lapin::Error, context: Option<Cow<'static, str>> },

    #[error("JSON error{}: {source}", format_context(context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal RabbitMQ error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
