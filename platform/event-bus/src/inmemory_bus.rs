//! In-memory implementation of the EventBus trait for testing and development

use crate::{validate_subject, BusMessage, BusResult, EventBus};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc};

/// Members of one consumer group on one subject pattern
///
/// Messages that arrive while no member is live wait in `backlog` and go to
/// the next member that joins.
#[derive(Default)]
struct QueueGroup {
    members: Vec<mpsc::UnboundedSender<BusMessage>>,
    next: usize,
    backlog: VecDeque<BusMessage>,
}

impl QueueGroup {
    /// Hand `msg` to the next live member, dropping members whose stream is
    /// gone. Parks the message in the backlog when nobody is left.
    fn deliver(&mut self, msg: BusMessage) {
        let mut msg = msg;
        while !self.members.is_empty() {
            let idx = self.next % self.members.len();
            match self.members[idx].send(msg) {
                Ok(()) => {
                    self.next = idx + 1;
                    return;
                }
                Err(mpsc::error::SendError(returned)) => {
                    self.members.remove(idx);
                    msg = returned;
                }
            }
        }
        self.backlog.push_back(msg);
    }

    /// Add a member and replay whatever piled up while the group was empty
    fn join(&mut self, member: mpsc::UnboundedSender<BusMessage>) {
        while let Some(msg) = self.backlog.pop_front() {
            if let Err(mpsc::error::SendError(returned)) = member.send(msg) {
                self.backlog.push_front(returned);
                return;
            }
        }
        self.members.push(member);
    }
}

/// EventBus implementation using in-memory channels
///
/// Plain subscribers share one broadcast channel and see every matching
/// message. Consumer groups get an unbounded channel per member and receive
/// messages round-robin, one member per message. A group outlives its
/// members: once bound it keeps collecting messages for the next member.
///
/// # Example
/// ```rust
/// use event_bus::{EventBus, InMemoryBus};
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryBus::new();
///
/// // Subscribe before publishing
/// let mut stream = bus.queue_subscribe("evento-logistica", "sub-logistica").await?;
///
/// bus.publish("evento-logistica", b"hello".to_vec()).await?;
///
/// let msg = stream.next().await.unwrap();
/// assert_eq!(msg.subject, "evento-logistica");
/// assert_eq!(msg.payload, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryBus {
    sender: Arc<broadcast::Sender<BusMessage>>,
    // Keyed by (subject pattern, group name)
    groups: Arc<Mutex<HashMap<(String, String), QueueGroup>>>,
}

impl InMemoryBus {
    /// Create a new in-memory event bus
    ///
    /// The broadcast side buffers 1000 messages. Slow plain subscribers past
    /// that point lose the oldest messages.
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Create a new in-memory event bus with a custom broadcast buffer size
    pub fn with_capacity(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            sender: Arc::new(sender),
            groups: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of live members in `group` on `subject`
    pub fn group_size(&self, subject: &str, group: &str) -> usize {
        self.lock_groups()
            .get(&(subject.to_string(), group.to_string()))
            .map(|g| g.members.iter().filter(|m| !m.is_closed()).count())
            .unwrap_or(0)
    }

    fn lock_groups(&self) -> MutexGuard<'_, HashMap<(String, String), QueueGroup>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.groups.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if a subject matches a subscription pattern
    ///
    /// Supports NATS-style wildcards:
    /// - `*` matches exactly one token
    /// - `>` matches one or more tokens
    fn matches_pattern(subject: &str, pattern: &str) -> bool {
        let subject_tokens: Vec<&str> = subject.split('.').collect();
        let pattern_tokens: Vec<&str> = pattern.split('.').collect();

        let mut s_idx = 0;
        let mut p_idx = 0;

        while s_idx < subject_tokens.len() && p_idx < pattern_tokens.len() {
            let pattern_token = pattern_tokens[p_idx];

            if pattern_token == ">" {
                return true;
            } else if pattern_token == "*" || subject_tokens[s_idx] == pattern_token {
                s_idx += 1;
                p_idx += 1;
            } else {
                return false;
            }
        }

        s_idx == subject_tokens.len() && p_idx == pattern_tokens.len()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        validate_subject(subject)?;
        let msg = BusMessage::new(subject.to_string(), payload);

        // No plain subscribers is fine
        let _ = self.sender.send(msg.clone());

        let mut groups = self.lock_groups();
        for ((pattern, _), group) in groups.iter_mut() {
            if Self::matches_pattern(subject, pattern) {
                group.deliver(msg.clone());
            }
        }

        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        validate_subject(pattern)?;
        let mut receiver = self.sender.subscribe();
        let pattern = pattern.to_string();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => {
                        if Self::matches_pattern(&msg.subject, &pattern) {
                            yield msg;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(pattern = %pattern, skipped, "InMemoryBus subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(stream.boxed())
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        group: &str,
    ) -> BusResult<BoxStream<'static, BusMessage>> {
        validate_subject(subject)?;
        let (tx, mut rx) = mpsc::unbounded_channel();

        self.lock_groups()
            .entry((subject.to_string(), group.to_string()))
            .or_default()
            .join(tx);

        let stream = async_stream::stream! {
            while let Some(msg) = rx.recv().await {
                yield msg;
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn next_within(
        stream: &mut BoxStream<'static, BusMessage>,
        wait: Duration,
    ) -> Option<BusMessage> {
        tokio::time::timeout(wait, stream.next()).await.ok().flatten()
    }

    #[test]
    fn test_pattern_matching() {
        assert!(InMemoryBus::matches_pattern("evento-logistica", "evento-logistica"));
        assert!(!InMemoryBus::matches_pattern("evento-logistica", "comando-confirmar-orden"));

        assert!(InMemoryBus::matches_pattern("orders.events.created", "orders.*.created"));
        assert!(!InMemoryBus::matches_pattern("orders.events.user.created", "orders.*.created"));

        assert!(InMemoryBus::matches_pattern("orders.events.created", "orders.>"));
        assert!(!InMemoryBus::matches_pattern("orders.events.created", "billing.>"));

        assert!(InMemoryBus::matches_pattern("single", "*"));
        assert!(InMemoryBus::matches_pattern("single", ">"));
        assert!(!InMemoryBus::matches_pattern("one.two", "one"));
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("test.events.>").await.unwrap();

        let payload = b"test message".to_vec();
        bus.publish("test.events.order.confirmed", payload.clone())
            .await
            .unwrap();

        let msg = next_within(&mut stream, Duration::from_secs(1))
            .await
            .expect("message");
        assert_eq!(msg.subject, "test.events.order.confirmed");
        assert_eq!(msg.payload, payload);
    }

    #[tokio::test]
    async fn test_queue_group_delivers_each_message_once() {
        let bus = InMemoryBus::new();
        let mut first = bus.queue_subscribe("jobs", "workers").await.unwrap();
        let mut second = bus.queue_subscribe("jobs", "workers").await.unwrap();
        assert_eq!(bus.group_size("jobs", "workers"), 2);

        for i in 0..4 {
            bus.publish("jobs", format!("job {}", i).into_bytes())
                .await
                .unwrap();
        }

        let wait = Duration::from_millis(100);
        let mut received = Vec::new();
        while let Some(msg) = next_within(&mut first, wait).await {
            received.push(msg.payload);
        }
        let first_count = received.len();
        while let Some(msg) = next_within(&mut second, wait).await {
            received.push(msg.payload);
        }

        // Round-robin splits the four jobs evenly, nothing duplicated
        assert_eq!(first_count, 2);
        assert_eq!(received.len(), 4);
        received.sort();
        received.dedup();
        assert_eq!(received.len(), 4);
    }

    #[tokio::test]
    async fn test_separate_groups_each_receive_a_copy() {
        let bus = InMemoryBus::new();
        let mut confirmations = bus.queue_subscribe("orders", "sub-a").await.unwrap();
        let mut reversals = bus.queue_subscribe("orders", "sub-b").await.unwrap();

        bus.publish("orders", b"payload".to_vec()).await.unwrap();

        let wait = Duration::from_secs(1);
        assert!(next_within(&mut confirmations, wait).await.is_some());
        assert!(next_within(&mut reversals, wait).await.is_some());
    }

    #[tokio::test]
    async fn test_dropped_member_is_skipped() {
        let bus = InMemoryBus::new();
        let dropped = bus.queue_subscribe("jobs", "workers").await.unwrap();
        let mut live = bus.queue_subscribe("jobs", "workers").await.unwrap();
        drop(dropped);

        bus.publish("jobs", b"one".to_vec()).await.unwrap();
        bus.publish("jobs", b"two".to_vec()).await.unwrap();

        let wait = Duration::from_secs(1);
        assert_eq!(next_within(&mut live, wait).await.unwrap().payload, b"one");
        assert_eq!(next_within(&mut live, wait).await.unwrap().payload, b"two");
        assert_eq!(bus.group_size("jobs", "workers"), 1);
    }

    #[tokio::test]
    async fn test_group_keeps_messages_until_a_member_rejoins() {
        let bus = InMemoryBus::new();
        let member = bus.queue_subscribe("jobs", "workers").await.unwrap();
        drop(member);

        bus.publish("jobs", b"one".to_vec()).await.unwrap();
        bus.publish("jobs", b"two".to_vec()).await.unwrap();
        assert_eq!(bus.group_size("jobs", "workers"), 0);

        let mut rejoined = bus.queue_subscribe("jobs", "workers").await.unwrap();

        let wait = Duration::from_secs(1);
        assert_eq!(next_within(&mut rejoined, wait).await.unwrap().payload, b"one");
        assert_eq!(next_within(&mut rejoined, wait).await.unwrap().payload, b"two");

        // Backlog is drained, live delivery resumes
        bus.publish("jobs", b"three".to_vec()).await.unwrap();
        assert_eq!(next_within(&mut rejoined, wait).await.unwrap().payload, b"three");
        assert!(next_within(&mut rejoined, Duration::from_millis(50)).await.is_none());
    }

    #[tokio::test]
    async fn test_unbound_group_does_not_collect() {
        let bus = InMemoryBus::new();
        bus.publish("jobs", b"early".to_vec()).await.unwrap();

        let mut member = bus.queue_subscribe("jobs", "workers").await.unwrap();
        assert!(next_within(&mut member, Duration::from_millis(50)).await.is_none());
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let bus = InMemoryBus::new();
        let mut stream = bus.queue_subscribe("test.msg", "ordered").await.unwrap();

        for i in 0..5 {
            bus.publish("test.msg", format!("message {}", i).into_bytes())
                .await
                .unwrap();
        }

        for i in 0..5 {
            let msg = next_within(&mut stream, Duration::from_secs(1))
                .await
                .expect("message");
            assert_eq!(msg.payload, format!("message {}", i).into_bytes());
        }
    }

    #[tokio::test]
    async fn test_invalid_subject_rejected() {
        let bus = InMemoryBus::new();
        assert!(bus.publish("", b"x".to_vec()).await.is_err());
        assert!(bus.queue_subscribe("a..b", "g").await.is_err());
    }
}
