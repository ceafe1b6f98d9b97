//! Publishing frame-derived data to a topic-based message bus.
//!
//! The bus client itself stays behind [`ProducerClient`]; this module owns
//! the environment-driven configuration and the produce-then-poll call
//! pattern processing units rely on. With the `kafka` feature,
//! `KafkaClient` implements the seam on librdkafka and
//! `TopicProducer::kafka(&SinkConfig::from_env()?)` gives a ready producer.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, error, trace};

use crate::error::SinkError;

#[cfg(feature = "kafka")]
mod kafka;

#[cfg(feature = "kafka")]
pub use kafka::KafkaClient;

pub const ENV_BOOTSTRAP_SERVERS: &str = "KAFKA_BOOTSTRAP_SERVERS";
pub const ENV_CLIENT_ID: &str = "KAFKA_CLIENT_ID";
pub const ENV_USERNAME: &str = "KAFKA_USERNAME";
pub const ENV_PASSWORD: &str = "KAFKA_PASSWORD";

/// How long `produce` waits for delivery events after each record.
pub const DELIVERY_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// SASL username and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Comma-separated `host:port` list.
    pub bootstrap_servers: String,
    pub client_id: Option<String>,
    pub credentials: Option<Credentials>,
}

impl SinkConfig {
    /// Read `KAFKA_*` environment variables.
    pub fn from_env() -> Result<Self, SinkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`.
    ///
    /// Only one of username and password set is logged as an error and
    /// the config carries no credentials; it is not a failure.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SinkError> {
        let bootstrap_servers = lookup(ENV_BOOTSTRAP_SERVERS)
            .filter(|servers| !servers.trim().is_empty())
            .ok_or(SinkError::MissingBootstrapServers)?;
        let client_id = lookup(ENV_CLIENT_ID);

        let credentials = match (lookup(ENV_USERNAME), lookup(ENV_PASSWORD)) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (Some(_), None) => {
                error!("{ENV_USERNAME} was provided but {ENV_PASSWORD} was not");
                None
            }
            (None, Some(_)) => {
                error!("{ENV_PASSWORD} was provided but {ENV_USERNAME} was not");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            bootstrap_servers,
            client_id,
            credentials,
        })
    }

    /// Client library properties. Credentials are applied separately.
    pub fn client_properties(&self) -> BTreeMap<&'static str, String> {
        let mut properties = BTreeMap::from([("bootstrap.servers", self.bootstrap_servers.clone())]);
        if let Some(client_id) = &self.client_id {
            properties.insert("client.id", client_id.clone());
        }
        properties
    }
}

/// One record to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub topic: &'a str,
    pub value: &'a [u8],
    pub key: Option<&'a [u8]>,
    pub partition: Option<i32>,
}

/// Where a record landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: Option<i32>,
    pub offset: Option<i64>,
}

/// Called once per record with the delivery outcome.
pub type OnDelivery = Box<dyn FnOnce(Result<Delivery, String>) + Send>;

/// Seam to the message bus client library.
pub trait ProducerClient {
    fn set_credentials(&mut self, username: &str, password: &str) -> Result<(), SinkError>;

    /// Queue a record. `on_delivery` runs from a later `poll`.
    fn produce(&mut self, record: Record<'_>, on_delivery: Option<OnDelivery>)
        -> Result<(), SinkError>;

    /// Serve pending delivery events. Returns how many were served.
    fn poll(&mut self, timeout: Duration) -> usize;
}

/// Producer configured from a [`SinkConfig`].
pub struct TopicProducer<C> {
    client: C,
}

impl<C: ProducerClient> TopicProducer<C> {
    /// Build the client from the config's properties and apply credentials.
    pub fn new<F>(config: &SinkConfig, connect: F) -> Result<Self, SinkError>
    where
        F: FnOnce(&BTreeMap<&'static str, String>) -> Result<C, SinkError>,
    {
        let mut client = connect(&config.client_properties())?;
        if let Some(credentials) = &config.credentials {
            client.set_credentials(&credentials.username, &credentials.password)?;
        }
        debug!(
            servers = %config.bootstrap_servers,
            authenticated = config.credentials.is_some(),
            "producer ready"
        );
        Ok(Self { client })
    }

    /// Publish `value` to `topic`, then poll for delivery events for up to
    /// [`DELIVERY_POLL_TIMEOUT`].
    pub fn produce(
        &mut self,
        topic: &str,
        value: impl AsRef<[u8]>,
        key: Option<&[u8]>,
        partition: Option<i32>,
        on_delivery: Option<OnDelivery>,
    ) -> Result<(), SinkError> {
        let record = Record {
            topic,
            value: value.as_ref(),
            key,
            partition,
        };
        self.client.produce(record, on_delivery)?;
        let served = self.client.poll(DELIVERY_POLL_TIMEOUT);
        trace!(topic, served, "delivery events served");
        Ok(())
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key: &str| map.get(key).map(|value| value.to_string())
    }

    #[derive(Default)]
    struct FakeClient {
        properties: BTreeMap<&'static str, String>,
        credentials: Option<(String, String)>,
        produced: Vec<(String, Vec<u8>, Option<Vec<u8>>, Option<i32>)>,
        pending: Vec<(Delivery, OnDelivery)>,
        polls: Vec<Duration>,
        next_offset: i64,
    }

    impl ProducerClient for FakeClient {
        fn set_credentials(&mut self, username: &str, password: &str) -> Result<(), SinkError> {
            self.credentials = Some((username.to_string(), password.to_string()));
            Ok(())
        }

        fn produce(
            &mut self,
            record: Record<'_>,
            on_delivery: Option<OnDelivery>,
        ) -> Result<(), SinkError> {
            if record.topic.is_empty() {
                return Err(SinkError::Produce {
                    topic: String::new(),
                    message: "empty topic".to_string(),
                });
            }
            self.produced.push((
                record.topic.to_string(),
                record.value.to_vec(),
                record.key.map(<[u8]>::to_vec),
                record.partition,
            ));
            if let Some(callback) = on_delivery {
                let delivery = Delivery {
                    topic: record.topic.to_string(),
                    partition: record.partition.or(Some(0)),
                    offset: Some(self.next_offset),
                };
                self.pending.push((delivery, callback));
            }
            self.next_offset += 1;
            Ok(())
        }

        fn poll(&mut self, timeout: Duration) -> usize {
            self.polls.push(timeout);
            let served = self.pending.len();
            for (delivery, callback) in self.pending.drain(..) {
                callback(Ok(delivery));
            }
            served
        }
    }

    fn connect_fake(properties: &BTreeMap<&'static str, String>) -> Result<FakeClient, SinkError> {
        Ok(FakeClient {
            properties: properties.clone(),
            ..FakeClient::default()
        })
    }

    #[test]
    fn bootstrap_servers_are_required() {
        let err = SinkConfig::from_lookup(lookup(&[(ENV_CLIENT_ID, "cam-1")])).unwrap_err();
        assert!(matches!(err, SinkError::MissingBootstrapServers));
    }

    #[test]
    fn properties_include_optional_client_id() {
        let config = SinkConfig::from_lookup(lookup(&[
            (ENV_BOOTSTRAP_SERVERS, "host1:9092,host2:9092"),
            (ENV_CLIENT_ID, "cam-1"),
        ]))
        .unwrap();

        let properties = config.client_properties();
        assert_eq!(properties["bootstrap.servers"], "host1:9092,host2:9092");
        assert_eq!(properties["client.id"], "cam-1");
        assert!(config.credentials.is_none());

        let bare = SinkConfig::from_lookup(lookup(&[(ENV_BOOTSTRAP_SERVERS, "h:1")])).unwrap();
        assert!(!bare.client_properties().contains_key("client.id"));
    }

    #[test]
    fn credential_pair_is_applied() {
        let config = SinkConfig::from_lookup(lookup(&[
            (ENV_BOOTSTRAP_SERVERS, "h:1"),
            (ENV_USERNAME, "alice"),
            (ENV_PASSWORD, "s3cret"),
        ]))
        .unwrap();

        let producer = TopicProducer::new(&config, connect_fake).unwrap();
        assert_eq!(
            producer.client().credentials,
            Some(("alice".to_string(), "s3cret".to_string()))
        );
        assert_eq!(producer.client().properties["bootstrap.servers"], "h:1");
    }

    #[test]
    fn half_credential_pair_is_not_fatal() {
        for half in [(ENV_USERNAME, "alice"), (ENV_PASSWORD, "s3cret")] {
            let config =
                SinkConfig::from_lookup(lookup(&[(ENV_BOOTSTRAP_SERVERS, "h:1"), half])).unwrap();
            assert!(config.credentials.is_none());

            let producer = TopicProducer::new(&config, connect_fake).unwrap();
            assert!(producer.client().credentials.is_none());
        }
    }

    #[test]
    fn debug_output_redacts_password() {
        let credentials = Credentials {
            username: "alice".to_string(),
            password: "s3cret".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn produce_forwards_record_and_polls_one_second() {
        let config = SinkConfig::from_lookup(lookup(&[(ENV_BOOTSTRAP_SERVERS, "h:1")])).unwrap();
        let mut producer = TopicProducer::new(&config, connect_fake).unwrap();

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        producer
            .produce(
                "detections",
                b"{\"people\":2}",
                Some(&b"cam-1"[..]),
                Some(3),
                Some(Box::new(move |result: Result<Delivery, String>| {
                    sink.lock().unwrap().push(result)
                })),
            )
            .unwrap();
        producer.produce("detections", "plain", None, None, None).unwrap();

        let client = producer.into_client();
        assert_eq!(client.produced.len(), 2);
        assert_eq!(
            client.produced[0],
            (
                "detections".to_string(),
                b"{\"people\":2}".to_vec(),
                Some(b"cam-1".to_vec()),
                Some(3)
            )
        );
        assert_eq!(client.produced[1].2, None);
        assert_eq!(client.polls, vec![DELIVERY_POLL_TIMEOUT; 2]);
        assert_eq!(
            *delivered.lock().unwrap(),
            vec![Ok(Delivery {
                topic: "detections".to_string(),
                partition: Some(3),
                offset: Some(0),
            })]
        );
    }

    #[test]
    fn client_rejection_is_returned() {
        let config = SinkConfig::from_lookup(lookup(&[(ENV_BOOTSTRAP_SERVERS, "h:1")])).unwrap();
        let mut producer = TopicProducer::new(&config, connect_fake).unwrap();

        let err = producer.produce("", b"x", None, None, None).unwrap_err();
        assert!(matches!(err, SinkError::Produce { .. }));
        assert!(producer.client().polls.is_empty());
    }
}
