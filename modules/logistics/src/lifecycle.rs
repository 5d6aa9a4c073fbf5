//! Ownership of the long-lived subscription tasks
//!
//! [`SubscriptionSet`] is built once at startup and torn down once at
//! shutdown. Every task it spawns listens on one shared cancellation token;
//! dropping the set cancels the token, so an early return out of `main` still
//! stops the subscriptions.

use event_bus::EventBus;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::consumers::{
    subscribe_to_topic, SubscriptionBinding, CONFIRM_ORDER, LOGISTICS_EVENTS, REVERT_CONFIRMATION,
};
use crate::contracts::{ConfirmOrderCommand, Envelope, LogisticsEvent, RevertConfirmationCommand};
use crate::handlers::{HandlerResult, LogisticsHandler};

struct SubscriptionTask {
    binding: SubscriptionBinding,
    handle: JoinHandle<()>,
}

pub struct SubscriptionSet {
    tasks: Vec<SubscriptionTask>,
    shutdown: CancellationToken,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Spawn the three startup subscriptions, all routed to `handler`
    pub fn start(bus: Arc<dyn EventBus>, handler: Arc<dyn LogisticsHandler>) -> Self {
        let mut set = Self::new();

        let h = handler.clone();
        set.spawn(bus.clone(), LOGISTICS_EVENTS, move |event: LogisticsEvent| {
            let h = h.clone();
            async move { h.on_logistics_event(event).await }
        });

        let h = handler.clone();
        set.spawn(bus.clone(), CONFIRM_ORDER, move |command: ConfirmOrderCommand| {
            let h = h.clone();
            async move { h.on_confirm_order(command).await }
        });

        let h = handler;
        set.spawn(bus, REVERT_CONFIRMATION, move |command: RevertConfirmationCommand| {
            let h = h.clone();
            async move { h.on_revert_confirmation(command).await }
        });

        set
    }

    /// Spawn one subscription task bound to `binding`
    pub fn spawn<M, F, Fut>(&mut self, bus: Arc<dyn EventBus>, binding: SubscriptionBinding, handler: F)
    where
        M: Envelope,
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let token = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = subscribe_to_topic::<M, F, Fut>(
                bus,
                binding.topic,
                binding.group,
                handler,
                token,
            )
            .await
            {
                tracing::error!(
                    topic = %binding.topic,
                    group = %binding.group,
                    error = %e,
                    "Failed to subscribe"
                );
            }
        });

        tracing::debug!(topic = %binding.topic, group = %binding.group, "Registered subscription task");
        self.tasks.push(SubscriptionTask { binding, handle });
    }

    pub fn bindings(&self) -> Vec<SubscriptionBinding> {
        self.tasks.iter().map(|t| t.binding).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Token observed by every task in the set
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn log_summary(&self) {
        for task in &self.tasks {
            tracing::info!(
                topic = %task.binding.topic,
                group = %task.binding.group,
                schema = task.binding.schema,
                "Subscription started"
            );
        }
        tracing::info!("{} subscriptions running", self.tasks.len());
    }

    /// Cancel every task and wait for it to stop
    ///
    /// Returns the number of tasks stopped. Messages still in flight are
    /// abandoned, not drained.
    pub async fn shutdown(mut self) -> usize {
        self.shutdown.cancel();

        let tasks = std::mem::take(&mut self.tasks);
        let count = tasks.len();
        for task in tasks {
            if let Err(e) = task.handle.await {
                tracing::error!(
                    topic = %task.binding.topic,
                    group = %task.binding.group,
                    error = %e,
                    "Subscription task did not stop cleanly"
                );
            }
        }

        tracing::info!("{} subscriptions stopped", count);
        count
    }
}

impl Default for SubscriptionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
