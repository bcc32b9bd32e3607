//! Participant-facing transport
//!
//! JSON messages over WebSocket, dispatched into the matchmaking engine.

pub mod messages;
pub mod websocket;

pub use messages::{ClientMessage, ServerMessage};
pub use websocket::{handle_client_message, router, GatewayServer};
