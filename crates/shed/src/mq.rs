//! One-line constructors for the message-queue clients.

#[cfg(feature = "kafka")]
use shed_kafka::{KafkaConsumer, KafkaError, KafkaProducer};
#[cfg(feature = "rabbit")]
use shed_rabbit::{RabbitConsumer, RabbitError, RabbitParams, RabbitProducer};

/// Connects a RabbitMQ producer.
///
/// # Errors
///
/// The errors of [`RabbitProducer::connect`].
#[cfg(feature = "rabbit")]
pub async fn rabbit_producer(params: &RabbitParams) -> Result<RabbitProducer, RabbitError> {
    RabbitProducer::connect(params).await
}

/// Connects a RabbitMQ consumer.
///
/// # Errors
///
/// The errors of [`RabbitConsumer::connect`].
#[cfg(feature = "rabbit")]
pub async fn rabbit_consumer(params: &RabbitParams) -> Result<RabbitConsumer, RabbitError> {
    RabbitConsumer::connect(params).await
}

/// Connects a Kafka producer. The client speaks no SASL, so credentials are
/// rejected instead of silently dropped.
///
/// # Errors
///
/// Returns [`KafkaError::Validation`] when credentials are passed, plus the
/// errors of the producer builder.
#[cfg(feature = "kafka")]
pub fn kafka_producer(
    brokers: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<KafkaProducer, KafkaError> {
    ensure_plaintext(username, password)?;
    KafkaProducer::builder(brokers).init()
}

/// Connects a Kafka consumer for one topic. The client speaks no SASL, so
/// credentials are rejected instead of silently dropped.
///
/// # Errors
///
/// Returns [`KafkaError::Validation`] when credentials are passed, plus the
/// errors of the consumer builder.
#[cfg(feature = "kafka")]
pub fn kafka_consumer(
    brokers: &str,
    topic: &str,
    group: Option<&str>,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<KafkaConsumer, KafkaError> {
    ensure_plaintext(username, password)?;
    let mut builder = KafkaConsumer::builder(brokers).topic(topic);
    if let Some(group) = group {
        builder = builder.group(group);
    }
    builder.init()
}

#[cfg(feature = "kafka")]
fn ensure_plaintext(username: Option<&str>, password: Option<&str>) -> Result<(), KafkaError> {
    if username.is_some() || password.is_some() {
        return Err(KafkaError::Validation {
            message: "Kafka SASL credentials are not supported, connect without them".into(),
            context: None,
        });
    }
    Ok(())
}
