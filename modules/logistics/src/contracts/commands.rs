use event_bus::{CommandEnvelope, MessagePayload};
use serde::{Deserialize, Serialize};

use super::Envelope;

/// Payload for the confirm-order command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrderPayload {
    #[serde(rename = "id_correlacion")]
    pub correlation_id: String,
    #[serde(rename = "orden_id")]
    pub order_id: String,
}

impl MessagePayload for ConfirmOrderPayload {
    const CONTENT_TYPE: &'static str = "ConfirmarOrdenPayload";
}

/// Payload for the revert-confirmation command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertConfirmationPayload {
    pub id: String,
    #[serde(rename = "id_correlacion")]
    pub correlation_id: String,
    #[serde(rename = "orden_id")]
    pub order_id: String,
}

impl MessagePayload for RevertConfirmationPayload {
    const CONTENT_TYPE: &'static str = "RevertirConfirmacionPayload";
}

/// Command published on `comando-confirmar-orden`
pub type ConfirmOrderCommand = CommandEnvelope<ConfirmOrderPayload>;

/// Command published on `comando-revertir-confirmacion`
pub type RevertConfirmationCommand = CommandEnvelope<RevertConfirmationPayload>;

impl Envelope for ConfirmOrderCommand {
    const SCHEMA: &'static str = "ComandoConfirmarOrden";

    fn content_type(&self) -> &'static str {
        CommandEnvelope::content_type(self)
    }
}

impl Envelope for RevertConfirmationCommand {
    const SCHEMA: &'static str = "ComandoRevertirConfirmacion";

    fn content_type(&self) -> &'static str {
        CommandEnvelope::content_type(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confirm_order_round_trip() {
        let command = ConfirmOrderCommand::new(ConfirmOrderPayload {
            correlation_id: "389822434".to_string(),
            order_id: "6463454".to_string(),
        });

        let bytes = serde_json::to_vec(&command).unwrap();
        let decoded: ConfirmOrderCommand = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(Envelope::content_type(&decoded), "ConfirmarOrdenPayload");
    }

    #[test]
    fn test_revert_confirmation_round_trip() {
        let command = RevertConfirmationCommand::new(RevertConfirmationPayload {
            id: "1232321321".to_string(),
            correlation_id: "389822434".to_string(),
            order_id: "6463454".to_string(),
        });

        let bytes = serde_json::to_vec(&command).unwrap();
        let decoded: RevertConfirmationCommand = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn test_revert_confirmation_wire_shape() {
        let command = RevertConfirmationCommand::with_timestamps(
            5,
            6,
            RevertConfirmationPayload {
                id: "1232321321".to_string(),
                correlation_id: "389822434".to_string(),
                order_id: "6463454".to_string(),
            },
        );

        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({
                "time": 5,
                "ingestion": 6,
                "datacontenttype": "RevertirConfirmacionPayload",
                "data": {
                    "id": "1232321321",
                    "id_correlacion": "389822434",
                    "orden_id": "6463454"
                }
            })
        );
    }

    #[test]
    fn test_command_on_wrong_topic_rejected() {
        // A confirm-order command cannot be read as a revert-confirmation
        let command = ConfirmOrderCommand::new(ConfirmOrderPayload {
            correlation_id: "1".to_string(),
            order_id: "2".to_string(),
        });
        let bytes = serde_json::to_vec(&command).unwrap();

        assert!(serde_json::from_slice::<RevertConfirmationCommand>(&bytes).is_err());
    }
}
