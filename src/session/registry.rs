//! Session registry
//!
//! Tracks every connected session and, separately, the room membership of
//! sessions that have been matched. A session is queued for at most one room
//! size and seated in at most one room; seating a session clears its queue
//! marker.

use crate::session::handle::SessionHandle;
use crate::types::{MemberLeft, PawnType, PlayerId, RoomId, RoomMember, RoomSize, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Room membership recorded when a room is assembled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    pub room_id: RoomId,
    pub pawn_type: PawnType,
}

/// Everything the engine knows about one session
#[derive(Clone)]
pub struct SessionRecord {
    pub handle: Arc<dyn SessionHandle>,
    pub player_id: Option<PlayerId>,
    pub queued: Option<RoomSize>,
    pub room: Option<RoomMembership>,
    pub connected: bool,
}

/// What was known about a session at the moment it disconnected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartedSession {
    /// The session was never registered
    Unknown,
    /// The session was registered but not seated; its record is gone
    Forgotten,
    /// The session was seated; its membership is kept for the room owner
    Seated(MemberLeft),
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionRecord>,
    rooms: HashMap<RoomId, Vec<SessionId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connected session, refreshing the handle and identity if known
    pub fn register(&mut self, handle: Arc<dyn SessionHandle>, player_id: Option<PlayerId>) {
        let session_id = handle.session_id();
        match self.sessions.get_mut(&session_id) {
            Some(record) => {
                record.handle = handle;
                record.connected = true;
                if player_id.is_some() {
                    record.player_id = player_id;
                }
            }
            None => {
                debug!(session_id = %session_id, "Registering session");
                self.sessions.insert(
                    session_id,
                    SessionRecord {
                        handle,
                        player_id,
                        queued: None,
                        room: None,
                        connected: true,
                    },
                );
            }
        }
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionRecord> {
        self.sessions.get(session_id)
    }

    pub fn queued_size(&self, session_id: &str) -> Option<RoomSize> {
        self.sessions.get(session_id).and_then(|r| r.queued)
    }

    pub fn room_of(&self, session_id: &str) -> Option<&RoomMembership> {
        self.sessions.get(session_id).and_then(|r| r.room.as_ref())
    }

    pub fn mark_queued(&mut self, session_id: &str, size: RoomSize) {
        if let Some(record) = self.sessions.get_mut(session_id) {
            record.queued = Some(size);
        }
    }

    pub fn clear_queued(&mut self, session_id: &str) {
        if let Some(record) = self.sessions.get_mut(session_id) {
            record.queued = None;
        }
    }

    /// Seat every member in the room
    pub fn seat(&mut self, room_id: RoomId, members: &[RoomMember]) {
        for member in members {
            let record = self
                .sessions
                .entry(member.session_id.clone())
                .or_insert_with(|| SessionRecord {
                    handle: member.handle.clone(),
                    player_id: Some(member.player_id.clone()),
                    queued: None,
                    room: None,
                    connected: true,
                });
            record.queued = None;
            record.room = Some(RoomMembership {
                room_id,
                pawn_type: member.pawn_type,
            });
        }
        self.rooms.insert(
            room_id,
            members.iter().map(|m| m.session_id.clone()).collect(),
        );
    }

    /// Handles of the still-connected members of a room, excluding one session
    pub fn room_handles(&self, room_id: RoomId, except: &str) -> Vec<Arc<dyn SessionHandle>> {
        self.rooms
            .get(&room_id)
            .into_iter()
            .flatten()
            .filter(|id| id.as_str() != except)
            .filter_map(|id| self.sessions.get(id))
            .filter(|record| record.connected)
            .map(|record| record.handle.clone())
            .collect()
    }

    /// Mark a session as gone.
    ///
    /// Unseated sessions are dropped entirely. Seated sessions keep their
    /// membership record until the room is released; departing them a second
    /// time reports `Unknown`.
    pub fn depart(&mut self, session_id: &str) -> DepartedSession {
        let Some(record) = self.sessions.get_mut(session_id) else {
            return DepartedSession::Unknown;
        };
        if !record.connected {
            return DepartedSession::Unknown;
        }
        record.queued = None;

        match record.room.clone() {
            Some(membership) => {
                record.connected = false;
                DepartedSession::Seated(MemberLeft {
                    room_id: membership.room_id,
                    session_id: session_id.to_string(),
                    player_id: record.player_id.clone().unwrap_or_default(),
                    pawn_type: membership.pawn_type,
                })
            }
            None => {
                self.sessions.remove(session_id);
                DepartedSession::Forgotten
            }
        }
    }

    /// Give up a seat while staying connected.
    ///
    /// The session drops out of its room's member list; a room left with no
    /// members is forgotten.
    pub fn vacate(&mut self, session_id: &str) -> Option<MemberLeft> {
        let record = self.sessions.get_mut(session_id)?;
        let membership = record.room.take()?;
        let notice = MemberLeft {
            room_id: membership.room_id,
            session_id: session_id.to_string(),
            player_id: record.player_id.clone().unwrap_or_default(),
            pawn_type: membership.pawn_type,
        };

        if let Some(members) = self.rooms.get_mut(&membership.room_id) {
            members.retain(|id| id != session_id);
            if members.is_empty() {
                self.rooms.remove(&membership.room_id);
            }
        }
        Some(notice)
    }

    /// Rooms none of whose members is still connected
    pub fn abandoned_rooms(&self) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|(_, members)| {
                members.iter().all(|id| {
                    !matches!(
                        self.sessions.get(id),
                        Some(record) if record.connected && record.handle.is_connected()
                    )
                })
            })
            .map(|(room_id, _)| *room_id)
            .collect()
    }

    /// Clear the membership records of a finished room, returning how many were cleared
    pub fn release_room(&mut self, room_id: RoomId) -> usize {
        let Some(members) = self.rooms.remove(&room_id) else {
            return 0;
        };

        let mut released = 0;
        for session_id in members {
            let disconnected = match self.sessions.get_mut(&session_id) {
                Some(record) if record.room.as_ref().map(|m| m.room_id) == Some(room_id) => {
                    record.room = None;
                    released += 1;
                    !record.connected
                }
                _ => false,
            };
            if disconnected {
                self.sessions.remove(&session_id);
            }
        }
        released
    }

    /// Drop idle records whose transport already closed, returning their ids
    pub fn forget_closed_idle(&mut self) -> Vec<SessionId> {
        let closed: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, r)| r.queued.is_none() && r.room.is_none())
            .filter(|(_, r)| !r.handle.is_connected())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &closed {
            self.sessions.remove(id);
        }
        closed
    }

    /// Number of sessions currently connected
    pub fn connected_count(&self) -> usize {
        self.sessions.values().filter(|r| r.connected).count()
    }

    /// Number of sessions holding a room membership record
    pub fn seated_count(&self) -> usize {
        self.sessions.values().filter(|r| r.room.is_some()).count()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
