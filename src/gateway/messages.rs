//! Wire messages exchanged with participants over the WebSocket gateway
//!
//! Frames are JSON objects of the form `{"type": "...", "data": {...}}`.
//! Outbound frames are the session layer's [`ServerMessage`].

use crate::types::ArrivalRequest;
use serde::Deserialize;

pub use crate::session::ServerMessage;

/// Messages sent by participants
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Announce a stored identity, or ask for a guest one
    UserId {
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Ask to be matched into a room
    JoinRoom(ArrivalRequest),
    /// Leave the waiting queue for a room size
    Quit {
        #[serde(default)]
        players: u8,
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Request queue diagnostics
    ShowData,
    Test,
}

impl ClientMessage {
    /// Message type label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::UserId { .. } => "userId",
            ClientMessage::JoinRoom(_) => "joinRoom",
            ClientMessage::Quit { .. } => "quit",
            ClientMessage::ShowData => "showData",
            ClientMessage::Test => "test",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_messages() {
        let join: ClientMessage = serde_json::from_value(json!({
            "type": "joinRoom",
            "data": {"players": 2, "pawnType": 4, "userId": "Guest1"}
        }))
        .unwrap();
        assert_eq!(
            join,
            ClientMessage::JoinRoom(ArrivalRequest::new("Guest1", 4, 2))
        );

        let quit: ClientMessage = serde_json::from_value(json!({
            "type": "quit",
            "data": {"players": 3, "userId": "Guest1"}
        }))
        .unwrap();
        assert_eq!(
            quit,
            ClientMessage::Quit {
                players: 3,
                user_id: Some("Guest1".to_string())
            }
        );

        let show: ClientMessage = serde_json::from_value(json!({"type": "showData"})).unwrap();
        assert_eq!(show, ClientMessage::ShowData);

        let anonymous: ClientMessage =
            serde_json::from_value(json!({"type": "userId", "data": {}})).unwrap();
        assert_eq!(anonymous, ClientMessage::UserId { user_id: None });
    }

    #[test]
    fn test_unknown_message_fails_to_parse() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "launchRockets"}));
        assert!(result.is_err());
    }
}
