use event_bus::{time_millis, MessagePayload};
use serde::{Deserialize, Serialize};

use super::Envelope;

/// Payload for an order confirmed by logistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub id: String,
    #[serde(rename = "id_correlacion")]
    pub correlation_id: String,
    #[serde(rename = "orden_id")]
    pub order_id: String,
    /// Epoch millis
    #[serde(rename = "fecha_confirmacion")]
    pub confirmed_at: i64,
}

impl MessagePayload for OrderConfirmed {
    const CONTENT_TYPE: &'static str = "OrdenConfirmada";
}

/// Payload for a confirmation that was rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationReverted {
    pub id: String,
    #[serde(rename = "id_correlacion")]
    pub correlation_id: String,
    #[serde(rename = "orden_id")]
    pub order_id: String,
    /// Epoch millis
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: i64,
}

impl MessagePayload for ConfirmationReverted {
    const CONTENT_TYPE: &'static str = "ConfirmacionRevertida";
}

/// The payload carried by a [`LogisticsEvent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogisticsEventPayload {
    OrderConfirmed(OrderConfirmed),
    ConfirmationReverted(ConfirmationReverted),
}

impl LogisticsEventPayload {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::OrderConfirmed(_) => OrderConfirmed::CONTENT_TYPE,
            Self::ConfirmationReverted(_) => ConfirmationReverted::CONTENT_TYPE,
        }
    }
}

impl From<OrderConfirmed> for LogisticsEventPayload {
    fn from(payload: OrderConfirmed) -> Self {
        Self::OrderConfirmed(payload)
    }
}

impl From<ConfirmationReverted> for LogisticsEventPayload {
    fn from(payload: ConfirmationReverted) -> Self {
        Self::ConfirmationReverted(payload)
    }
}

/// Order confirmation event published on `evento-logistica`
///
/// On the wire each variant has its own optional slot (`orden_pagada`,
/// `pago_revertido`) and `datacontenttype` names the one that is set. The
/// empty slot is written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "LogisticsEventWire", try_from = "LogisticsEventWire")]
pub struct LogisticsEvent {
    /// Producer timestamp (epoch millis)
    pub time: i64,
    /// Publish timestamp (epoch millis), set by the producer
    pub ingestion: i64,
    pub payload: LogisticsEventPayload,
}

impl LogisticsEvent {
    /// Wrap `payload`, stamping `time` and `ingestion` with the current time
    pub fn new(payload: impl Into<LogisticsEventPayload>) -> Self {
        Self {
            time: time_millis(),
            ingestion: time_millis(),
            payload: payload.into(),
        }
    }
}

impl Envelope for LogisticsEvent {
    const SCHEMA: &'static str = "EventoConfirmacionGDS";

    fn content_type(&self) -> &'static str {
        self.payload.content_type()
    }
}

/// Reasons an incoming event envelope is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventDecodeError {
    #[error("unknown datacontenttype: {0}")]
    UnknownContentType(String),

    #[error("datacontenttype {0} but its payload slot is empty")]
    MissingPayload(&'static str),

    #[error("more than one payload slot populated")]
    AmbiguousPayload,
}

#[derive(Serialize, Deserialize)]
struct LogisticsEventWire {
    time: i64,
    ingestion: i64,
    datacontenttype: String,
    #[serde(default)]
    orden_pagada: Option<OrderConfirmed>,
    #[serde(default)]
    pago_revertido: Option<ConfirmationReverted>,
}

impl From<LogisticsEvent> for LogisticsEventWire {
    fn from(event: LogisticsEvent) -> Self {
        let datacontenttype = event.payload.content_type().to_string();
        let (orden_pagada, pago_revertido) = match event.payload {
            LogisticsEventPayload::OrderConfirmed(p) => (Some(p), None),
            LogisticsEventPayload::ConfirmationReverted(p) => (None, Some(p)),
        };

        Self {
            time: event.time,
            ingestion: event.ingestion,
            datacontenttype,
            orden_pagada,
            pago_revertido,
        }
    }
}

impl TryFrom<LogisticsEventWire> for LogisticsEvent {
    type Error = EventDecodeError;

    fn try_from(wire: LogisticsEventWire) -> Result<Self, Self::Error> {
        if wire.orden_pagada.is_some() && wire.pago_revertido.is_some() {
            return Err(EventDecodeError::AmbiguousPayload);
        }

        let payload = match wire.datacontenttype.as_str() {
            OrderConfirmed::CONTENT_TYPE => wire
                .orden_pagada
                .map(LogisticsEventPayload::OrderConfirmed)
                .ok_or(EventDecodeError::MissingPayload(OrderConfirmed::CONTENT_TYPE))?,
            ConfirmationReverted::CONTENT_TYPE => wire
                .pago_revertido
                .map(LogisticsEventPayload::ConfirmationReverted)
                .ok_or(EventDecodeError::MissingPayload(
                    ConfirmationReverted::CONTENT_TYPE,
                ))?,
            other => return Err(EventDecodeError::UnknownContentType(other.to_string())),
        };

        Ok(Self {
            time: wire.time,
            ingestion: wire.ingestion,
            payload,
        })
    }
}
