//! # Message Envelope
//!
//! Timestamped wrapper shared by every command published on the bus.
//!
//! ## Envelope Fields
//!
//! - `time`: epoch millis when the producer built the message
//! - `ingestion`: epoch millis, stamped by the producer at publish time
//! - `datacontenttype`: name of the payload type carried in `data`
//! - `data`: the payload
//!
//! `datacontenttype` is not stored on the struct. It comes from
//! [`MessagePayload::CONTENT_TYPE`] when serializing and is checked against it
//! when deserializing, so an envelope can never carry a tag that disagrees with
//! its payload.

use chrono::Utc;
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Current wall-clock time in epoch milliseconds
pub fn time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A payload type that can travel inside an envelope
///
/// `CONTENT_TYPE` is the value written to `datacontenttype`. Consumers
/// select the decoder by it, so it must be unique per payload type.
pub trait MessagePayload: Serialize + DeserializeOwned {
    const CONTENT_TYPE: &'static str;
}

/// Command envelope carrying a single typed `data` payload
///
/// # Examples
///
/// ```rust
/// use event_bus::{CommandEnvelope, MessagePayload};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct ShipOrder {
///     order_id: String,
/// }
///
/// impl MessagePayload for ShipOrder {
///     const CONTENT_TYPE: &'static str = "ShipOrder";
/// }
///
/// let command = CommandEnvelope::new(ShipOrder { order_id: "42".to_string() });
/// let json = serde_json::to_value(&command).unwrap();
/// assert_eq!(json["datacontenttype"], "ShipOrder");
/// assert_eq!(json["data"]["order_id"], "42");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope<T> {
    /// Producer timestamp (epoch millis)
    pub time: i64,

    /// Publish timestamp (epoch millis), set by the producer
    pub ingestion: i64,

    /// Command payload
    pub data: T,
}

impl<T: MessagePayload> CommandEnvelope<T> {
    /// Wrap `data`, stamping `time` and `ingestion` with the current time
    pub fn new(data: T) -> Self {
        Self {
            time: time_millis(),
            ingestion: time_millis(),
            data,
        }
    }

    /// Wrap `data` with explicit timestamps (useful for testing)
    pub fn with_timestamps(time: i64, ingestion: i64, data: T) -> Self {
        Self {
            time,
            ingestion,
            data,
        }
    }

    /// The `datacontenttype` this envelope is written with
    pub fn content_type(&self) -> &'static str {
        T::CONTENT_TYPE
    }
}

impl<T: MessagePayload> Serialize for CommandEnvelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CommandEnvelope", 4)?;
        state.serialize_field("time", &self.time)?;
        state.serialize_field("ingestion", &self.ingestion)?;
        state.serialize_field("datacontenttype", T::CONTENT_TYPE)?;
        state.serialize_field("data", &self.data)?;
        state.end()
    }
}

impl<'de, T: MessagePayload> Deserialize<'de> for CommandEnvelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire<P> {
            time: i64,
            ingestion: i64,
            datacontenttype: String,
            data: P,
        }

        let wire = Wire::<T>::deserialize(deserializer)?;
        if wire.datacontenttype != T::CONTENT_TYPE {
            return Err(D::Error::custom(format!(
                "datacontenttype mismatch: expected {}, got {}",
                T::CONTENT_TYPE,
                wire.datacontenttype
            )));
        }

        Ok(Self {
            time: wire.time,
            ingestion: wire.ingestion,
            data: wire.data,
        })
    }
}
