//! HTTP surface: health plus the debug publish endpoints
//!
//! The `/prueba-*` routes publish a fixed sample message and always answer
//! `{"status": "ok"}`. They are smoke-test aids and are not part of any
//! published API description.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::contracts::{
    ConfirmOrderCommand, ConfirmOrderPayload, ConfirmationReverted, Envelope, LogisticsEvent,
    OrderConfirmed, RevertConfirmationCommand, RevertConfirmationPayload, TOPIC_CONFIRM_ORDER,
    TOPIC_LOGISTICS_EVENTS, TOPIC_REVERT_CONFIRMATION,
};
use crate::dispatcher::Dispatcher;
use event_bus::time_millis;

const SAMPLE_ID: &str = "1232321321";
const SAMPLE_CORRELATION_ID: &str = "389822434";
const SAMPLE_ORDER_ID: &str = "6463454";

const SERVICE_TITLE: &str = "Logistica AlpesOnline";

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub app_version: String,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, app_version: String) -> Self {
        Self {
            dispatcher,
            app_version,
        }
    }
}

pub fn logistics_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/prueba-orden-confirmada", get(publish_order_confirmed))
        .route("/prueba-confirmacion-revertida", get(publish_confirmation_reverted))
        .route("/prueba-confirmar-orden", get(publish_confirm_order))
        .route("/prueba-revertir-confirmacion", get(publish_revert_confirmation))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "module": "logistics",
        "title": SERVICE_TITLE,
        "version": state.app_version
    }))
}

async fn publish_order_confirmed(State(state): State<AppState>) -> Json<Value> {
    let event = LogisticsEvent::new(OrderConfirmed {
        id: SAMPLE_ID.to_string(),
        correlation_id: SAMPLE_CORRELATION_ID.to_string(),
        order_id: SAMPLE_ORDER_ID.to_string(),
        confirmed_at: time_millis(),
    });

    publish_and_ack(&state, &event, TOPIC_LOGISTICS_EVENTS).await
}

async fn publish_confirmation_reverted(State(state): State<AppState>) -> Json<Value> {
    let event = LogisticsEvent::new(ConfirmationReverted {
        id: SAMPLE_ID.to_string(),
        correlation_id: SAMPLE_CORRELATION_ID.to_string(),
        order_id: SAMPLE_ORDER_ID.to_string(),
        updated_at: time_millis(),
    });

    publish_and_ack(&state, &event, TOPIC_LOGISTICS_EVENTS).await
}

async fn publish_confirm_order(State(state): State<AppState>) -> Json<Value> {
    let command = ConfirmOrderCommand::new(ConfirmOrderPayload {
        correlation_id: SAMPLE_CORRELATION_ID.to_string(),
        order_id: SAMPLE_ORDER_ID.to_string(),
    });

    publish_and_ack(&state, &command, TOPIC_CONFIRM_ORDER).await
}

async fn publish_revert_confirmation(State(state): State<AppState>) -> Json<Value> {
    let command = RevertConfirmationCommand::new(RevertConfirmationPayload {
        id: SAMPLE_ID.to_string(),
        correlation_id: SAMPLE_CORRELATION_ID.to_string(),
        order_id: SAMPLE_ORDER_ID.to_string(),
    });

    publish_and_ack(&state, &command, TOPIC_REVERT_CONFIRMATION).await
}

// The caller always gets an ack; a failed publish only shows up in the log
async fn publish_and_ack<M: Envelope>(state: &AppState, message: &M, topic: &str) -> Json<Value> {
    if let Err(e) = state.dispatcher.publish(message, topic).await {
        tracing::error!(
            topic = %topic,
            datacontenttype = message.content_type(),
            error = %e,
            "Debug publish failed"
        );
    }

    Json(json!({ "status": "ok" }))
}
