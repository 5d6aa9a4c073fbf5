use event_bus::{BusError, EventBus};
use std::sync::Arc;

use crate::contracts::Envelope;

/// Errors returned by [`Dispatcher::publish`]
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Serializes envelopes and publishes them to a topic
///
/// Publishing is fire-and-forget: a successful return only means the bus
/// accepted the bytes. Failures are handed back to the caller untouched.
#[derive(Clone)]
pub struct Dispatcher {
    bus: Arc<dyn EventBus>,
}

impl Dispatcher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    pub async fn publish<M: Envelope>(&self, message: &M, topic: &str) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(message)?;
        self.bus.publish(topic, payload).await?;

        tracing::debug!(
            topic = %topic,
            schema = M::SCHEMA,
            datacontenttype = message.content_type(),
            "Message published"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ConfirmOrderCommand, ConfirmOrderPayload, TOPIC_CONFIRM_ORDER};
    use event_bus::InMemoryBus;
    use futures::StreamExt;

    fn confirm_order() -> ConfirmOrderCommand {
        ConfirmOrderCommand::new(ConfirmOrderPayload {
            correlation_id: "389822434".to_string(),
            order_id: "6463454".to_string(),
        })
    }

    #[tokio::test]
    async fn test_publish_serializes_to_topic() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe(TOPIC_CONFIRM_ORDER).await.unwrap();
        let dispatcher = Dispatcher::new(Arc::new(bus));

        let command = confirm_order();
        dispatcher.publish(&command, TOPIC_CONFIRM_ORDER).await.unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(msg.subject, TOPIC_CONFIRM_ORDER);

        let decoded: ConfirmOrderCommand = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(decoded, command);
    }

    #[tokio::test]
    async fn test_transport_error_is_propagated() {
        let dispatcher = Dispatcher::new(Arc::new(InMemoryBus::new()));

        let err = dispatcher
            .publish(&confirm_order(), "not a subject")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Bus(BusError::InvalidSubject(_))));
    }
}
