//! Session handles
//!
//! A handle is the engine's only view of a connected participant: it can be
//! addressed by id, receive messages, and report whether its transport is
//! still open. The engine never closes a handle.

use crate::session::message::ServerMessage;
use crate::types::SessionId;
use tokio::sync::mpsc;
use tracing::debug;

/// Addressable reference to a connected participant
#[cfg_attr(test, mockall::automock)]
pub trait SessionHandle: Send + Sync {
    /// Stable identifier of this session
    fn session_id(&self) -> SessionId;

    /// Deliver a message to the participant, returning whether it was accepted
    fn send(&self, message: ServerMessage) -> bool;

    /// Whether the underlying transport is still open
    fn is_connected(&self) -> bool;
}

/// Handle backed by an unbounded channel drained by the connection's writer task
#[derive(Debug, Clone)]
pub struct ChannelSessionHandle {
    session_id: SessionId,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelSessionHandle {
    pub fn new(session_id: SessionId, sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { session_id, sender }
    }

    /// Create a handle together with the receiving end of its outbound channel
    pub fn channel(session_id: SessionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(session_id, sender), receiver)
    }
}

impl SessionHandle for ChannelSessionHandle {
    fn session_id(&self) -> SessionId {
        self.session_id.clone()
    }

    fn send(&self, message: ServerMessage) -> bool {
        match self.sender.send(message) {
            Ok(()) => true,
            Err(_) => {
                debug!(session_id = %self.session_id, "Dropping message for closed session");
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
