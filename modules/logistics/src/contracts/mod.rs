//! Contract types for logistics messages
//!
//! Field names and `datacontenttype` values are the wire contract shared with
//! the other services on the bus; they are not renamed with the Rust types.

pub mod commands;
pub mod events;

pub use commands::*;
pub use events::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Topic carrying order confirmation events
pub const TOPIC_LOGISTICS_EVENTS: &str = "evento-logistica";
/// Topic carrying confirm-order commands
pub const TOPIC_CONFIRM_ORDER: &str = "comando-confirmar-orden";
/// Topic carrying revert-confirmation commands
pub const TOPIC_REVERT_CONFIRMATION: &str = "comando-revertir-confirmacion";

/// JetStream stream holding every logistics topic
pub const LOGISTICS_STREAM: &str = "LOGISTICA";

/// Every topic this service publishes to or consumes from
pub const ALL_TOPICS: [&str; 3] = [
    TOPIC_LOGISTICS_EVENTS,
    TOPIC_CONFIRM_ORDER,
    TOPIC_REVERT_CONFIRMATION,
];

/// A complete message as it travels on a topic
pub trait Envelope: Serialize + DeserializeOwned + Send + 'static {
    /// Schema name of the envelope kind
    const SCHEMA: &'static str;

    /// Value of `datacontenttype` for this message
    fn content_type(&self) -> &'static str;
}
