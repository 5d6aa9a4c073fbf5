//! NATS-based implementation of the EventBus trait

use crate::{validate_subject, BusError, BusMessage, BusResult, EventBus};
use async_nats::jetstream::{self, consumer::pull, stream};
use async_nats::Client;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;

/// How long a stream keeps messages nobody has consumed yet
const STREAM_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 14); // 14 days

/// EventBus implementation on a NATS connection
///
/// Plain subscriptions use core NATS. Consumer groups are JetStream durable
/// pull consumers named after the group, so messages published while no
/// member is connected wait in the stream until one rejoins. The subject of a
/// group must be captured by a stream; see [`NatsBus::ensure_stream`].
///
/// # Example
/// ```rust,no_run
/// use event_bus::{EventBus, NatsBus};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = NatsBus::connect("nats://localhost:4222").await?;
/// bus.ensure_stream("LOGISTICA", &["comando-confirmar-orden"]).await?;
///
/// bus.publish("comando-confirmar-orden", b"{}".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
    jetstream: jetstream::Context,
}

impl NatsBus {
    /// Create a new NatsBus from an already-connected `async_nats::Client`
    pub fn new(client: Client) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self { client, jetstream }
    }

    /// Connect to `url` and wrap the resulting client
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::ConnectionError(e.to_string()))?;
        Ok(Self::new(client))
    }

    /// Create stream `name` over `subjects` unless it already exists
    pub async fn ensure_stream(&self, name: &str, subjects: &[&str]) -> BusResult<()> {
        if self.jetstream.get_stream(name).await.is_ok() {
            return Ok(());
        }

        let config = stream::Config {
            name: name.to_string(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            max_age: STREAM_MAX_AGE,
            ..Default::default()
        };

        self.jetstream
            .create_stream(config)
            .await
            .map_err(|e| BusError::StreamSetupError(e.to_string()))?;

        tracing::info!(stream = %name, ?subjects, "Created JetStream stream");
        Ok(())
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        validate_subject(subject)?;

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        validate_subject(subject)?;

        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        Ok(subscriber
            .map(|msg| BusMessage::new(msg.subject.to_string(), msg.payload.to_vec()))
            .boxed())
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        group: &str,
    ) -> BusResult<BoxStream<'static, BusMessage>> {
        validate_subject(subject)?;

        let stream_name = self
            .jetstream
            .stream_by_subject(subject)
            .await
            .map_err(|e| BusError::SubscribeError(format!("no stream captures {}: {}", subject, e)))?;

        let stream = self
            .jetstream
            .get_stream(&stream_name)
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let consumer = stream
            .get_or_create_consumer(
                group,
                pull::Config {
                    durable_name: Some(group.to_string()),
                    filter_subject: subject.to_string(),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        tracing::debug!(
            subject = %subject,
            group = %group,
            stream = %stream_name,
            "Bound durable consumer"
        );

        // Acked on receipt: redelivery covers absent members, not failed handlers
        let stream = async_stream::stream! {
            while let Some(next) = messages.next().await {
                match next {
                    Ok(msg) => {
                        if let Err(e) = msg.ack().await {
                            tracing::warn!(subject = %msg.subject, error = %e, "Failed to ack message");
                        }
                        yield BusMessage::new(msg.subject.to_string(), msg.payload.to_vec());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "JetStream consumer error");
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}
