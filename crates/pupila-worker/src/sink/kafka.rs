//! [`ProducerClient`] backed by librdkafka.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::message::{DeliveryResult, Message};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer, ProducerContext};
use rdkafka::ClientContext;
use tracing::{debug, warn};

use super::{Delivery, OnDelivery, ProducerClient, Record, SinkConfig, TopicProducer};
use crate::error::SinkError;

type Opaque = Box<Option<OnDelivery>>;

/// Routes delivery reports to the callback passed with each record.
#[derive(Default)]
struct DeliveryRouter {
    served: AtomicUsize,
}

impl ClientContext for DeliveryRouter {}

impl ProducerContext for DeliveryRouter {
    type DeliveryOpaque = Opaque;

    fn delivery(&self, result: &DeliveryResult<'_>, on_delivery: Self::DeliveryOpaque) {
        self.served.fetch_add(1, Ordering::Relaxed);
        let outcome = match result {
            Ok(message) => Ok(Delivery {
                topic: message.topic().to_string(),
                partition: Some(message.partition()),
                offset: Some(message.offset()),
            }),
            Err((err, message)) => {
                warn!(topic = message.topic(), error = %err, "record not delivered");
                Err(err.to_string())
            }
        };
        if let Some(on_delivery) = *on_delivery {
            on_delivery(outcome);
        }
    }
}

/// Kafka producer built from [`SinkConfig::client_properties`].
///
/// Credentials become `sasl.username` / `sasl.password`; setting them
/// rebuilds the underlying producer.
pub struct KafkaClient {
    config: ClientConfig,
    producer: BaseProducer<DeliveryRouter>,
}

impl KafkaClient {
    pub fn connect(properties: &BTreeMap<&'static str, String>) -> Result<Self, SinkError> {
        let mut config = ClientConfig::new();
        for (key, value) in properties {
            config.set(*key, value.as_str());
        }
        let producer = create_producer(&config)?;
        Ok(Self { config, producer })
    }

    /// Effective client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn create_producer(config: &ClientConfig) -> Result<BaseProducer<DeliveryRouter>, SinkError> {
    config
        .create_with_context(DeliveryRouter::default())
        .map_err(|err| SinkError::Client {
            message: err.to_string(),
        })
}

impl ProducerClient for KafkaClient {
    fn set_credentials(&mut self, username: &str, password: &str) -> Result<(), SinkError> {
        self.config
            .set("sasl.username", username)
            .set("sasl.password", password);
        self.producer = create_producer(&self.config)?;
        debug!(username, "sasl credentials applied");
        Ok(())
    }

    fn produce(
        &mut self,
        record: Record<'_>,
        on_delivery: Option<OnDelivery>,
    ) -> Result<(), SinkError> {
        let opaque: Opaque = Box::new(on_delivery);
        let mut base: BaseRecord<'_, [u8], [u8], Opaque> =
            BaseRecord::with_opaque_to(record.topic, opaque).payload(record.value);
        if let Some(key) = record.key {
            base = base.key(key);
        }
        if let Some(partition) = record.partition {
            base = base.partition(partition);
        }
        self.producer
            .send(base)
            .map_err(|(err, _)| SinkError::Produce {
                topic: record.topic.to_string(),
                message: err.to_string(),
            })
    }

    fn poll(&mut self, timeout: Duration) -> usize {
        let served = &self.producer.context().served;
        let before = served.load(Ordering::Relaxed);
        self.producer.poll(timeout);
        served.load(Ordering::Relaxed).wrapping_sub(before)
    }
}

impl TopicProducer<KafkaClient> {
    /// Kafka-backed producer for `config`.
    pub fn kafka(config: &SinkConfig) -> Result<Self, SinkError> {
        Self::new(config, KafkaClient::connect)
    }
}
