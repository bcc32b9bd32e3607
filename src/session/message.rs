//! Messages delivered to participants through their session handles
//!
//! Serialized as `{"type": "...", "data": {...}}` objects by the transport.

use crate::error::MatchmakingError;
use crate::types::{Diagnostics, PawnType, PlayerId, RoomSummary, SessionId};
use serde::Serialize;

/// Messages sent to participants
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    RegisterUserId { id: PlayerId },
    Queued { players: u8, position: usize },
    RoomAssembled(RoomSummary),
    PlayerDisconnected {
        session_id: SessionId,
        pawn_type: PawnType,
    },
    QuitAck { status: String, removed: bool },
    ShowDataResponse(Diagnostics),
    TestAck { status: String },
    Toast { msg: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn test_ack() -> Self {
        ServerMessage::TestAck {
            status: "received".to_string(),
        }
    }

    pub fn quit_ack(removed: bool) -> Self {
        ServerMessage::QuitAck {
            status: "success".to_string(),
            removed,
        }
    }

    /// How a rejected join request is reported to its sender
    pub fn rejection(error: &MatchmakingError) -> Self {
        match error {
            MatchmakingError::NoOpponent { .. } => ServerMessage::Toast {
                msg: "Something went wrong, try again".to_string(),
            },
            MatchmakingError::InvalidRequest { .. } => {
                ServerMessage::error("Invalid join room data")
            }
            other => ServerMessage::error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_message_shape() {
        let value = serde_json::to_value(ServerMessage::PlayerDisconnected {
            session_id: "s1".to_string(),
            pawn_type: PawnType::new(2, 4).unwrap(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "playerDisconnected", "data": {"sessionId": "s1", "pawnType": 2}})
        );

        let value = serde_json::to_value(ServerMessage::test_ack()).unwrap();
        assert_eq!(value, json!({"type": "testAck", "data": {"status": "received"}}));
    }

    #[test]
    fn test_rejection_messages() {
        assert!(matches!(
            ServerMessage::rejection(&MatchmakingError::NoOpponent { pawn_type: 5 }),
            ServerMessage::Toast { .. }
        ));
        assert_eq!(
            ServerMessage::rejection(&MatchmakingError::InvalidRequest {
                reason: "missing pawn type".to_string()
            }),
            ServerMessage::error("Invalid join room data")
        );
    }
}
