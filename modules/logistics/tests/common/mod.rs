#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use event_bus::{BusError, BusMessage, BusResult, EventBus};
use futures::stream::{BoxStream, StreamExt};
use http_body_util::BodyExt;
use logistics_rs::routes::{logistics_router, AppState};
use logistics_rs::Dispatcher;
use std::sync::{Arc, Mutex};

/// EventBus double that records every call instead of delivering anything.
/// Subscriptions return streams that never yield.
#[derive(Clone, Default)]
pub struct RecordingBus {
    published: Arc<Mutex<Vec<BusMessage>>>,
    bindings: Arc<Mutex<Vec<(String, String)>>>,
    fail_publish: bool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose every publish fails
    pub fn failing() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn bindings(&self) -> Vec<(String, String)> {
        self.bindings.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        if self.fail_publish {
            return Err(BusError::PublishError("connection closed".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push(BusMessage::new(subject.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, _subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        Ok(futures::stream::pending().boxed())
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        group: &str,
    ) -> BusResult<BoxStream<'static, BusMessage>> {
        self.bindings
            .lock()
            .unwrap()
            .push((subject.to_string(), group.to_string()));
        Ok(futures::stream::pending().boxed())
    }
}

/// Build the full router on top of `bus`
pub fn app(bus: Arc<dyn EventBus>) -> Router {
    logistics_router(AppState::new(Dispatcher::new(bus), "1".to_string()))
}

/// Read response body as JSON.
pub async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
