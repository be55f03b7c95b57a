use std::borrow::Cow;

/// Kafka error type.
#[shed_derive::shed_error]
pub enum KafkaError {
    #[error("Kafka client error{}: {source}", format_context(context))]
    Client { source: kafka::Error, context: Option<Cow<'static, str>> },

    #[error("JSON error{}: {source}", format_context(context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal Kafka error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
