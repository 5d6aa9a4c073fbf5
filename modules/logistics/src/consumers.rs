//! Topic subscriptions
//!
//! Each subscription joins a consumer group on one topic, decodes every
//! message into its envelope type and passes it to a handler. A message that
//! fails to decode or to handle is logged and dropped; the subscription keeps
//! going until it is cancelled or the bus closes the stream.

use event_bus::{BusMessage, BusResult, EventBus};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::contracts::{
    ConfirmOrderCommand, Envelope, LogisticsEvent, RevertConfirmationCommand,
    TOPIC_CONFIRM_ORDER, TOPIC_LOGISTICS_EVENTS, TOPIC_REVERT_CONFIRMATION,
};
use crate::handlers::HandlerResult;

/// A (topic, consumer group) pair and the envelope kind read from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionBinding {
    pub topic: &'static str,
    pub group: &'static str,
    pub schema: &'static str,
}

pub const LOGISTICS_EVENTS: SubscriptionBinding = SubscriptionBinding {
    topic: TOPIC_LOGISTICS_EVENTS,
    group: "sub-logistica",
    schema: LogisticsEvent::SCHEMA,
};

pub const CONFIRM_ORDER: SubscriptionBinding = SubscriptionBinding {
    topic: TOPIC_CONFIRM_ORDER,
    group: "sub-com-logistica-confirmacion",
    schema: ConfirmOrderCommand::SCHEMA,
};

pub const REVERT_CONFIRMATION: SubscriptionBinding = SubscriptionBinding {
    topic: TOPIC_REVERT_CONFIRMATION,
    group: "sub-com-logistica-revertir-confirmacion",
    schema: RevertConfirmationCommand::SCHEMA,
};

/// Subscriptions opened at startup, in start order
pub const STARTUP_BINDINGS: [SubscriptionBinding; 3] =
    [LOGISTICS_EVENTS, CONFIRM_ORDER, REVERT_CONFIRMATION];

/// Join `group` on `topic` and feed decoded `M` envelopes to `handler`
///
/// Returns once `shutdown` is cancelled or the stream ends. Cancellation
/// interrupts a message that is still being handled. Only the initial
/// subscribe can fail.
pub async fn subscribe_to_topic<M, F, Fut>(
    bus: Arc<dyn EventBus>,
    topic: &str,
    group: &str,
    handler: F,
    shutdown: CancellationToken,
) -> BusResult<()>
where
    M: Envelope,
    F: Fn(M) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    let mut stream = bus.queue_subscribe(topic, group).await?;

    tracing::info!(topic = %topic, group = %group, schema = M::SCHEMA, "Subscribed");

    tokio::select! {
        _ = shutdown.cancelled() => {
            tracing::info!(topic = %topic, group = %group, "Subscription cancelled");
        }
        _ = consume(&mut stream, topic, group, &handler) => {
            tracing::warn!(topic = %topic, group = %group, "Subscription stream ended");
        }
    }

    Ok(())
}

async fn consume<M, F, Fut>(
    stream: &mut BoxStream<'static, BusMessage>,
    topic: &str,
    group: &str,
    handler: &F,
) where
    M: Envelope,
    F: Fn(M) -> Fut,
    Fut: Future<Output = HandlerResult>,
{
    while let Some(msg) = stream.next().await {
        let message: M = match serde_json::from_slice(&msg.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    topic = %topic,
                    group = %group,
                    schema = M::SCHEMA,
                    error = %e,
                    "Failed to decode message"
                );
                continue;
            }
        };

        let datacontenttype = message.content_type();
        if let Err(e) = handler(message).await {
            tracing::error!(
                topic = %topic,
                group = %group,
                datacontenttype = datacontenttype,
                error = %e,
                "Failed to handle message"
            );
        }
    }
}
