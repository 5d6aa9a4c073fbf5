use async_trait::async_trait;

use crate::contracts::{
    ConfirmOrderCommand, LogisticsEvent, LogisticsEventPayload, RevertConfirmationCommand,
};

/// Error raised by application handling of a received message
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("handler failed: {0}")]
    Failed(String),
}

pub type HandlerResult = Result<(), HandlerError>;

/// Application handling for the three startup subscriptions
#[async_trait]
pub trait LogisticsHandler: Send + Sync + 'static {
    async fn on_logistics_event(&self, event: LogisticsEvent) -> HandlerResult;

    async fn on_confirm_order(&self, command: ConfirmOrderCommand) -> HandlerResult;

    async fn on_revert_confirmation(&self, command: RevertConfirmationCommand) -> HandlerResult;
}

/// Handler that records each received message in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl LogisticsHandler for LoggingHandler {
    async fn on_logistics_event(&self, event: LogisticsEvent) -> HandlerResult {
        match &event.payload {
            LogisticsEventPayload::OrderConfirmed(p) => tracing::info!(
                order_id = %p.order_id,
                correlation_id = %p.correlation_id,
                confirmed_at = p.confirmed_at,
                "Order confirmed"
            ),
            LogisticsEventPayload::ConfirmationReverted(p) => tracing::info!(
                order_id = %p.order_id,
                correlation_id = %p.correlation_id,
                updated_at = p.updated_at,
                "Order confirmation reverted"
            ),
        }
        Ok(())
    }

    async fn on_confirm_order(&self, command: ConfirmOrderCommand) -> HandlerResult {
        tracing::info!(
            order_id = %command.data.order_id,
            correlation_id = %command.data.correlation_id,
            "Confirm order command received"
        );
        Ok(())
    }

    async fn on_revert_confirmation(&self, command: RevertConfirmationCommand) -> HandlerResult {
        tracing::info!(
            order_id = %command.data.order_id,
            correlation_id = %command.data.correlation_id,
            "Revert confirmation command received"
        );
        Ok(())
    }
}
