//! Kafka producer and consumer wrapper.
//!
//! [`KafkaProducer`] and [`KafkaConsumer`] wrap the synchronous `kafka`
//! client behind builders. The producer covers raw bytes, keyed records,
//! JSON values, and batches; the consumer either polls in place with
//! [`KafkaConsumer::poll_each`] or runs the blocking poll loop on a detached
//! thread via [`KafkaConsumer::listen`]. Fetched records surface as
//! [`KafkaMessage`].
//!
//! The underlying client speaks plaintext only; SASL and TLS are not
//! available here.
//!
//! ```no_run
//! # fn demo() -> Result<(), shed_kafka::KafkaError> {
//! let producer = shed_kafka::KafkaProducer::builder("localhost:9092").init()?;
//! producer.send_json("events", &serde_json::json!({ "kind": "boot" }))?;
//!
//! let consumer = shed_kafka::KafkaConsumer::builder("localhost:9092")
//!     .topic("events")
//!     .group("shed")
//!     .init()?;
//! let listener = consumer.listen(|message| {
//!     println!("{} @ {}", message.topic, message.offset);
//! })?;
//! # listener.stop();
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::{KafkaError, KafkaErrorExt};
pub use kafka::producer::RequiredAcks;

use kafka::consumer::{Consumer, FetchOffset};
use kafka::producer::{Producer, Record};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

static DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);
static ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Conversion into a broker list; strings split on commas.
pub trait IntoBrokers {
    fn into_brokers(self) -> Vec<String>;
}

impl IntoBrokers for &str {
    fn into_brokers(self) -> Vec<String> {
        self.split(',')
            .map(str::trim)
            .filter(|broker| !broker.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl IntoBrokers for String {
    fn into_brokers(self) -> Vec<String> {
        self.as_str().into_brokers()
    }
}

impl<S: AsRef<str>> IntoBrokers for &[S] {
    fn into_brokers(self) -> Vec<String> {
        self.iter()
            .map(|broker| broker.as_ref().trim().to_owned())
            .filter(|broker| !broker.is_empty())
            .collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoBrokers for &[S; N] {
    fn into_brokers(self) -> Vec<String> {
        self.as_slice().into_brokers()
    }
}

impl<S: AsRef<str>> IntoBrokers for Vec<S> {
    fn into_brokers(self) -> Vec<String> {
        self.as_slice().into_brokers()
    }
}

/// One record pulled from a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KafkaMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Record key, when one was produced.
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

impl KafkaMessage {
    fn from_fetch(topic: &str, partition: i32, offset: i64, key: &[u8], value: &[u8]) -> Self {
        Self {
            topic: topic.to_owned(),
            partition,
            offset,
            key: (!key.is_empty()).then(|| key.to_vec()),
            value: value.to_vec(),
        }
    }

    /// Decodes the record value as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Json`] when the value does not parse.
    pub fn value_json<T: DeserializeOwned>(&self) -> Result<T, KafkaError> {
        serde_json::from_slice(&self.value).context("Decoding record value")
    }
}

struct ProducerInner {
    producer: Mutex<Producer>,
}

/// Kafka producer handle.
///
/// Cheap to clone; all clones share one connection. Every send blocks until
/// the broker acknowledges per the configured [`RequiredAcks`].
#[derive(Clone)]
pub struct KafkaProducer {
    inner: Arc<ProducerInner>,
}

impl fmt::Debug for KafkaProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaProducer").finish_non_exhaustive()
    }
}

impl KafkaProducer {
    /// Starts a builder for the given brokers.
    pub fn builder(brokers: impl IntoBrokers) -> KafkaProducerBuilder {
        KafkaProducerBuilder {
            brokers: brokers.into_brokers(),
            acks: RequiredAcks::One,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            client_id: None,
        }
    }

    /// Sends one record. The broker picks the partition.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Client`] when the broker rejects the record.
    pub fn send(&self, topic: &str, value: &[u8]) -> Result<(), KafkaError> {
        self.inner
            .producer
            .lock()
            .send(&Record::from_value(topic, value))
            .context("Sending record")
    }

    /// Sends one keyed record. Equal keys land on the same partition.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Client`] when the broker rejects the record.
    pub fn send_key(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), KafkaError> {
        self.inner
            .producer
            .lock()
            .send(&Record::from_key_value(topic, key, value))
            .context("Sending keyed record")
    }

    /// JSON-encodes a value and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Json`] when the value does not encode, plus the
    /// errors of [`KafkaProducer::send`].
    pub fn send_json<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        value: &T,
    ) -> Result<(), KafkaError> {
        let encoded = serde_json::to_vec(value).context("Encoding record value")?;
        self.send(topic, &encoded)
    }

    /// Sends a batch of records as one produce request.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Client`] when the broker rejects the batch.
    pub fn send_batch<V: AsRef<[u8]>>(&self, topic: &str, values: &[V]) -> Result<(), KafkaError> {
        if values.is_empty() {
            return Ok(());
        }
        let records: Vec<Record<'_, (), &[u8]>> =
            values.iter().map(|value| Record::from_value(topic, value.as_ref())).collect();
        self.inner.producer.lock().send_all(&records).context("Sending record batch")?;
        Ok(())
    }

    /// Waits for any send in flight on another clone of this handle. Sends
    /// are acknowledged synchronously, so nothing queues beyond that.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the producer call surface uniform.
    pub fn flush(&self) -> Result<(), KafkaError> {
        drop(self.inner.producer.lock());
        Ok(())
    }
}

/// Builder for [`KafkaProducer`].
#[derive(Debug)]
#[must_use = "builders do nothing unless you call .init()"]
pub struct KafkaProducerBuilder {
    brokers: Vec<String>,
    acks: RequiredAcks,
    ack_timeout: Duration,
    client_id: Option<String>,
}

impl KafkaProducerBuilder {
    /// Broker acknowledgement required per send.
    pub const fn acks(mut self, acks: RequiredAcks) -> Self {
        self.acks = acks;
        self
    }

    /// How long the broker may take to acknowledge.
    pub const fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Client id reported to the brokers.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Connects to the brokers and loads topic metadata.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Validation`] when no broker is given and
    /// [`KafkaError::Client`] when the brokers are unreachable.
    pub fn init(self) -> Result<KafkaProducer, KafkaError> {
        if self.brokers.is_empty() {
            return Err(KafkaError::Validation {
                message: "missing Kafka brokers".into(),
                context: None,
            });
        }
        let brokers = self.brokers.join(",");
        let mut builder = Producer::from_hosts(self.brokers)
            .with_required_acks(self.acks)
            .with_ack_timeout(self.ack_timeout);
        if let Some(id) = self.client_id {
            builder = builder.with_client_id(id);
        }
        let producer = builder.create().context("Connecting to Kafka")?;
        debug!(brokers = %brokers, acks = ?self.acks, "Kafka producer ready");
        Ok(KafkaProducer { inner: Arc::new(ProducerInner { producer: Mutex::new(producer) }) })
    }
}

/// Where a consumer starts when the broker has no stored offset for it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FallbackOffset {
    /// Oldest retained record.
    Earliest,
    /// New records only.
    #[default]
    Latest,
}

impl FallbackOffset {
    const fn fetch_offset(self) -> FetchOffset {
        match self {
            Self::Earliest => FetchOffset::Earliest,
            Self::Latest => FetchOffset::Latest,
        }
    }
}

struct ConsumerInner {
    consumer: Mutex<Consumer>,
    topics: Vec<String>,
    commits: bool,
    fallback: FallbackOffset,
}

/// Kafka consumer handle.
///
/// Cheap to clone; all clones share one connection, and polls from
/// different clones are serialized.
#[derive(Clone)]
pub struct KafkaConsumer {
    inner: Arc<ConsumerInner>,
}

impl fmt::Debug for KafkaConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaConsumer")
            .field("topics", &self.inner.topics)
            .field("commits", &self.inner.commits)
            .finish_non_exhaustive()
    }
}

impl KafkaConsumer {
    /// Starts a builder for the given brokers.
    pub fn builder(brokers: impl IntoBrokers) -> KafkaConsumerBuilder {
        KafkaConsumerBuilder {
            brokers: brokers.into_brokers(),
            topics: Vec::new(),
            group: None,
            fallback: FallbackOffset::default(),
            client_id: None,
        }
    }

    /// Runs one poll cycle: each fetched record is handed to `f`, then the
    /// consumed offsets are committed when the consumer has a group.
    /// Returns the number of records delivered.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Client`] when polling or committing fails.
    pub fn poll_each<F>(&self, mut f: F) -> Result<usize, KafkaError>
    where
        F: FnMut(KafkaMessage),
    {
        let mut consumer = self.inner.consumer.lock();
        poll_cycle(&mut consumer, self.inner.commits, &mut f)
    }

    /// Spawns a named thread running the blocking poll loop until stopped.
    /// Poll failures are logged and retried after a short backoff.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Io`] when the thread cannot be spawned.
    pub fn listen<F>(&self, mut f: F) -> Result<ListenerHandle, KafkaError>
    where
        F: FnMut(KafkaMessage) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        info!(
            topics = %self.inner.topics.join(","),
            fallback = ?self.inner.fallback,
            "start listener"
        );
        // The join handle is dropped; the thread runs detached.
        thread::Builder::new()
            .name(format!("kafka-listener-{}", self.inner.topics.join(",")))
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    let polled = {
                        let mut consumer = inner.consumer.lock();
                        poll_cycle(&mut consumer, inner.commits, &mut f)
                    };
                    if let Err(error) = polled {
                        warn!(%error, "listener poll failed");
                        thread::sleep(ERROR_BACKOFF);
                    }
                }
            })
            .context("Spawning listener thread")?;
        Ok(ListenerHandle { stop })
    }
}

fn poll_cycle<F>(consumer: &mut Consumer, commits: bool, f: &mut F) -> Result<usize, KafkaError>
where
    F: FnMut(KafkaMessage),
{
    let sets = consumer.poll().context("Polling Kafka")?;
    let mut delivered = 0;
    for set in sets.iter() {
        for message in set.messages() {
            f(KafkaMessage::from_fetch(
                set.topic(),
                set.partition(),
                message.offset,
                message.key,
                message.value,
            ));
            delivered += 1;
        }
        consumer.consume_messageset(set).context("Marking records consumed")?;
    }
    if commits && delivered > 0 {
        consumer.commit_consumed().context("Committing offsets")?;
    }
    Ok(delivered)
}

/// Handle to a detached listener thread.
///
/// Dropping the handle leaves the thread running.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
}

impl ListenerHandle {
    /// Signals the listener loop to exit. Best effort: a poll already in
    /// flight finishes first.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Builder for [`KafkaConsumer`].
#[derive(Debug)]
#[must_use = "builders do nothing unless you call .init()"]
pub struct KafkaConsumerBuilder {
    brokers: Vec<String>,
    topics: Vec<String>,
    group: Option<String>,
    fallback: FallbackOffset,
    client_id: Option<String>,
}

impl KafkaConsumerBuilder {
    /// Subscribes a topic. May be called repeatedly.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    /// Consumer group for offset commits. Without a group, offsets are
    /// never committed.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Where to start when the group has no stored offset.
    pub const fn fallback_offset(mut self, fallback: FallbackOffset) -> Self {
        self.fallback = fallback;
        self
    }

    /// Client id reported to the brokers.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Connects to the brokers and subscribes the topics.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Validation`] when no broker or no topic is
    /// given and [`KafkaError::Client`] when the brokers are unreachable.
    pub fn init(self) -> Result<KafkaConsumer, KafkaError> {
        if self.brokers.is_empty() {
            return Err(KafkaError::Validation {
                message: "missing Kafka brokers".into(),
                context: None,
            });
        }
        if self.topics.is_empty() {
            return Err(KafkaError::Validation {
                message: "missing Kafka topic".into(),
                context: None,
            });
        }
        let brokers = self.brokers.join(",");
        let mut builder =
            Consumer::from_hosts(self.brokers).with_fallback_offset(self.fallback.fetch_offset());
        for topic in &self.topics {
            builder = builder.with_topic(topic.clone());
        }
        if let Some(group) = &self.group {
            builder = builder.with_group(group.clone());
        }
        if let Some(id) = self.client_id {
            builder = builder.with_client_id(id);
        }
        let consumer = builder.create().context("Connecting to Kafka")?;
        debug!(
            brokers = %brokers,
            topics = %self.topics.join(","),
            fallback = ?self.fallback,
            "Kafka consumer ready"
        );
        Ok(KafkaConsumer {
            inner: Arc::new(ConsumerInner {
                consumer: Mutex::new(consumer),
                topics: self.topics,
                commits: self.group.is_some(),
                fallback: self.fallback,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_strings_split_on_commas() {
        assert_eq!(
            "k1:9092, k2:9092".into_brokers(),
            vec!["k1:9092".to_owned(), "k2:9092".to_owned()]
        );
        assert_eq!(["k1:9092"].into_brokers(), vec!["k1:9092".to_owned()]);
        assert!("".into_brokers().is_empty());
    }

    #[test]
    fn producer_builders_default_to_acked_sends() {
        let builder = KafkaProducer::builder("k1:9092,k2:9092");
        assert_eq!(builder.brokers.len(), 2);
        assert!(matches!(builder.acks, RequiredAcks::One));
        assert_eq!(builder.ack_timeout, DEFAULT_ACK_TIMEOUT);
    }

    #[test]
    fn consumer_builders_accumulate_topics() {
        let builder = KafkaConsumer::builder("k1:9092").topic("alerts").topic("audit");
        assert_eq!(builder.topics, vec!["alerts".to_owned(), "audit".to_owned()]);
        assert!(builder.group.is_none());
    }

    #[test]
    fn builders_reject_missing_settings() {
        let error = KafkaProducer::builder("").init().expect_err("must fail");
        assert!(matches!(error, KafkaError::Validation { .. }));

        let error = KafkaConsumer::builder("").init().expect_err("must fail");
        assert!(matches!(error, KafkaError::Validation { .. }));

        match KafkaConsumer::builder("k1:9092").init().expect_err("must fail") {
            KafkaError::Validation { message, .. } => assert!(message.contains("topic")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fallback_offsets_map_to_the_client() {
        assert!(matches!(FallbackOffset::Earliest.fetch_offset(), FetchOffset::Earliest));
        assert!(matches!(FallbackOffset::Latest.fetch_offset(), FetchOffset::Latest));
        assert_eq!(FallbackOffset::default(), FallbackOffset::Latest);
    }

    #[test]
    fn empty_keys_surface_as_none() {
        let message = KafkaMessage::from_fetch("events", 2, 40, b"", b"payload");
        assert_eq!(message.key, None);
        assert_eq!(message.value, b"payload");

        let keyed = KafkaMessage::from_fetch("events", 2, 41, b"node-1", b"payload");
        assert_eq!(keyed.key.as_deref(), Some(b"node-1".as_slice()));
    }

    #[test]
    fn record_values_decode_as_json() {
        let message = KafkaMessage {
            topic: "events".into(),
            partition: 0,
            offset: 42,
            key: None,
            value: br#"{"kind":"boot"}"#.to_vec(),
        };
        let value: serde_json::Value = message.value_json().expect("decode");
        assert_eq!(value["kind"], "boot");

        let broken = KafkaMessage { value: b"not json".to_vec(), ..message };
        assert!(matches!(broken.value_json::<serde_json::Value>(), Err(KafkaError::Json { .. })));
    }

    #[test]
    fn listener_handles_flag_stop() {
        let handle = ListenerHandle { stop: Arc::new(AtomicBool::new(false)) };
        assert!(!handle.stop.load(Ordering::Relaxed));
        handle.stop();
        assert!(handle.stop.load(Ordering::Relaxed));
    }
}
