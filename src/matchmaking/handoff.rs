//! Session handoff to the game-session owner
//!
//! Once a room is assembled the engine hands it off and keeps only the
//! membership records needed to classify later disconnects.

use crate::error::Result;
use crate::session::{ServerMessage, SessionHandle};
use crate::types::{MemberLeft, Room};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// External collaborator that runs the game once a room is assembled
#[async_trait]
pub trait GameSessionOwner: Send + Sync {
    /// Take ownership of a freshly assembled room
    async fn start_game(&self, room: Room) -> Result<()>;

    /// A seated member disconnected; `remaining` are the other connected members
    async fn member_left(
        &self,
        notice: MemberLeft,
        remaining: Vec<Arc<dyn SessionHandle>>,
    ) -> Result<()>;
}

/// Owner that announces rooms and departures to the seated participants
#[derive(Debug, Default, Clone)]
pub struct NotifyingSessionOwner;

impl NotifyingSessionOwner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GameSessionOwner for NotifyingSessionOwner {
    async fn start_game(&self, room: Room) -> Result<()> {
        let summary = room.summary();
        let mut delivered = 0;
        for member in &room.members {
            if member.handle.send(ServerMessage::RoomAssembled(summary.clone())) {
                delivered += 1;
            } else {
                warn!(
                    room_id = %room.room_id,
                    session_id = %member.session_id,
                    "Room announcement not delivered"
                );
            }
        }

        info!(
            room_id = %room.room_id,
            size = %room.size,
            delivered,
            "Room handed off"
        );
        Ok(())
    }

    async fn member_left(
        &self,
        notice: MemberLeft,
        remaining: Vec<Arc<dyn SessionHandle>>,
    ) -> Result<()> {
        let message = ServerMessage::PlayerDisconnected {
            session_id: notice.session_id.clone(),
            pawn_type: notice.pawn_type,
        };
        for handle in &remaining {
            handle.send(message.clone());
        }

        info!(
            room_id = %notice.room_id,
            session_id = %notice.session_id,
            pawn_type = %notice.pawn_type,
            notified = remaining.len(),
            "Room member left"
        );
        Ok(())
    }
}
