//! # EventBus Abstraction
//!
//! Publish/subscribe transport shared by the logistics service and its tests.
//!
//! ## Implementations
//!
//! - **NatsBus**: Production implementation on a NATS connection
//! - **InMemoryBus**: Test/dev implementation using in-memory channels
//!
//! ## Consumer groups
//!
//! A topic can be consumed by a named group through [`EventBus::queue_subscribe`].
//! Every group bound to a topic sees each message once; members of the same
//! group share the messages between them. The binding is durable: messages
//! published while the group has no live member are kept for the next one to
//! join. On NATS this is a JetStream durable consumer.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{EventBus, NatsBus, InMemoryBus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Production: NATS
//! let nats = NatsBus::connect("nats://localhost:4222").await?;
//! nats.ensure_stream("LOGISTICA", &["evento-logistica"]).await?;
//! let bus: Arc<dyn EventBus> = Arc::new(nats);
//!
//! // Dev/Test: In-Memory
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//!
//! // Bind a consumer group before publishing
//! let mut stream = bus.queue_subscribe("evento-logistica", "sub-logistica").await?;
//! bus.publish("evento-logistica", b"{}".to_vec()).await?;
//!
//! while let Some(msg) = futures::StreamExt::next(&mut stream).await {
//!     println!("Received: {} bytes on {}", msg.payload.len(), msg.subject);
//! }
//! # Ok(())
//! # }
//! ```

mod envelope;
mod inmemory_bus;
mod nats_bus;

pub use envelope::{time_millis, CommandEnvelope, MessagePayload};
pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// A message received from the event bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject/topic this message was published to
    pub subject: String,
    /// The message payload (raw bytes)
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Create a new bus message
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self { subject, payload }
    }
}

/// Errors that can occur when using the event bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("stream setup failed: {0}")]
    StreamSetupError(String),

    #[error("invalid subject pattern: {0}")]
    InvalidSubject(String),
}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core event bus abstraction for publish-subscribe messaging
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message to a subject
    ///
    /// Fire-and-forget: `Ok(())` means the transport accepted the message,
    /// not that any consumer received it.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to every message matching a subject pattern
    ///
    /// * `subject` - The subject pattern to subscribe to (supports wildcards: `*`, `>`)
    ///   - `*` matches a single token (e.g., `orders.*.created`)
    ///   - `>` matches one or more tokens (e.g., `orders.>`)
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>>;

    /// Join the consumer group `group` on `subject`
    ///
    /// Each message published to `subject` is delivered to exactly one member
    /// of `group`. Separate groups on the same subject each get their own copy.
    /// Once a group exists, messages published while it has no live member are
    /// held and delivered when a member joins.
    async fn queue_subscribe(
        &self,
        subject: &str,
        group: &str,
    ) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}

/// Reject subjects the NATS server would refuse
pub(crate) fn validate_subject(subject: &str) -> BusResult<()> {
    if subject.is_empty() || subject.split('.').any(|token| token.is_empty()) {
        return Err(BusError::InvalidSubject(subject.to_string()));
    }
    if subject.chars().any(char::is_whitespace) {
        return Err(BusError::InvalidSubject(subject.to_string()));
    }
    Ok(())
}
