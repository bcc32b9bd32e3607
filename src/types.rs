//! Common types used throughout the matchmaking service

use crate::error::{MatchResult, MatchmakingError};
use crate::session::SessionHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a connected session, assigned by the transport layer
pub type SessionId = String;

/// Stable cross-session identity of a participant
pub type PlayerId = String;

/// Unique identifier for assembled rooms
pub type RoomId = Uuid;

/// Default number of pawn types offered by the board
pub const DEFAULT_MAX_PAWN_TYPE: u8 = 4;

/// Largest pawn palette a deployment may configure
pub const PAWN_TYPE_CEILING: u8 = 8;

/// Declared in-game role of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PawnType(u8);

impl PawnType {
    /// Validate a raw pawn type against the configured palette
    pub fn new(value: u8, max_pawn_type: u8) -> MatchResult<Self> {
        if value == 0 || value > max_pawn_type {
            return Err(MatchmakingError::invalid(format!(
                "pawn type {} is outside 1..={}",
                value, max_pawn_type
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The pawn type this one faces in a two-player room.
    ///
    /// Even pawns oppose each other (2 and 4), as do odd pawns (1 and 3).
    /// Pawns beyond the four-colour board have no opponent.
    pub fn opponent(self) -> Option<PawnType> {
        match self.0 {
            1 => Some(PawnType(3)),
            2 => Some(PawnType(4)),
            3 => Some(PawnType(1)),
            4 => Some(PawnType(2)),
            _ => None,
        }
    }
}

impl fmt::Display for PawnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of participants a room is assembled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomSize {
    Two,
    Three,
    Four,
}

impl RoomSize {
    /// All supported room sizes, smallest first
    pub const ALL: [RoomSize; 3] = [RoomSize::Two, RoomSize::Three, RoomSize::Four];

    pub fn from_players(players: u8) -> MatchResult<Self> {
        match players {
            2 => Ok(RoomSize::Two),
            3 => Ok(RoomSize::Three),
            4 => Ok(RoomSize::Four),
            other => Err(MatchmakingError::invalid(format!(
                "unsupported room size {}",
                other
            ))),
        }
    }

    pub fn players(self) -> u8 {
        match self {
            RoomSize::Two => 2,
            RoomSize::Three => 3,
            RoomSize::Four => 4,
        }
    }

    pub fn capacity(self) -> usize {
        self.players() as usize
    }

    /// Label used for metrics
    pub fn label(self) -> &'static str {
        match self {
            RoomSize::Two => "2",
            RoomSize::Three => "3",
            RoomSize::Four => "4",
        }
    }
}

impl fmt::Display for RoomSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.players())
    }
}

/// Raw join payload as it arrives from the transport layer.
///
/// Every field is optional and the numeric fields accept any JSON value, so
/// that missing or malformed values are reported as `InvalidRequest` instead
/// of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalRequest {
    #[serde(rename = "players")]
    pub room_size: Option<Value>,
    pub pawn_type: Option<Value>,
    #[serde(rename = "userId")]
    pub player_id: Option<PlayerId>,
}

impl ArrivalRequest {
    pub fn new(player_id: impl Into<PlayerId>, pawn_type: u8, room_size: u8) -> Self {
        Self {
            room_size: Some(Value::from(room_size)),
            pawn_type: Some(Value::from(pawn_type)),
            player_id: Some(player_id.into()),
        }
    }

    /// Room size asked for, if the payload names a supported one
    pub fn requested_size(&self) -> Option<RoomSize> {
        small_number(self.room_size.as_ref(), "room size")
            .and_then(RoomSize::from_players)
            .ok()
    }

    /// Check the payload and produce a strict join request
    pub fn validate(&self, session_id: &str, max_pawn_type: u8) -> MatchResult<JoinRequest> {
        if session_id.is_empty() {
            return Err(MatchmakingError::invalid("missing session id"));
        }

        let player_id = match self.player_id.as_deref() {
            Some(id) if !id.trim().is_empty() && id != "null" => id.to_string(),
            _ => return Err(MatchmakingError::invalid("missing player id")),
        };

        let room_size = small_number(self.room_size.as_ref(), "room size")
            .and_then(RoomSize::from_players)?;

        let pawn_type = small_number(self.pawn_type.as_ref(), "pawn type")
            .and_then(|value| PawnType::new(value, max_pawn_type))?;

        Ok(JoinRequest {
            session_id: session_id.to_string(),
            player_id,
            pawn_type,
            room_size,
            queued_at: Utc::now(),
        })
    }
}

/// Read a non-negative integer that fits in a byte
fn small_number(value: Option<&Value>, field: &str) -> MatchResult<u8> {
    match value {
        None | Some(Value::Null) => Err(MatchmakingError::invalid(format!("missing {}", field))),
        Some(value) => value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| MatchmakingError::invalid(format!("malformed {}: {}", field, value))),
    }
}

/// A validated request to be matched into a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinRequest {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub pawn_type: PawnType,
    pub room_size: RoomSize,
    pub queued_at: DateTime<Utc>,
}

/// One participant of an assembled room
#[derive(Clone)]
pub struct RoomMember {
    pub handle: Arc<dyn SessionHandle>,
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub pawn_type: PawnType,
}

impl fmt::Debug for RoomMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomMember")
            .field("session_id", &self.session_id)
            .field("player_id", &self.player_id)
            .field("pawn_type", &self.pawn_type)
            .finish()
    }
}

/// A group of participants handed to the game-session owner
#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: RoomId,
    pub size: RoomSize,
    pub members: Vec<RoomMember>,
    pub assembled_at: DateTime<Utc>,
}

impl Room {
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.members.iter().map(|m| m.session_id.clone()).collect()
    }

    pub fn pawn_types(&self) -> Vec<PawnType> {
        self.members.iter().map(|m| m.pawn_type).collect()
    }

    /// Serializable view sent to members
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id,
            size: self.size.players(),
            members: self
                .members
                .iter()
                .map(|m| MemberSummary {
                    session_id: m.session_id.clone(),
                    player_id: m.player_id.clone(),
                    pawn_type: m.pawn_type,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub size: u8,
    pub members: Vec<MemberSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub pawn_type: PawnType,
}

/// Notice that a member of an assembled room went away
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLeft {
    pub room_id: RoomId,
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub pawn_type: PawnType,
}

/// Why a session left a waiting queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveReason {
    Withdrawn,
    Disconnected,
    Swept,
}

impl LeaveReason {
    pub fn label(self) -> &'static str {
        match self {
            LeaveReason::Withdrawn => "withdrawn",
            LeaveReason::Disconnected => "disconnected",
            LeaveReason::Swept => "swept",
        }
    }
}

/// Read view of one waiting queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub room_size: RoomSize,
    pub entries: Vec<JoinRequest>,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.entries.iter().map(|e| e.session_id.clone()).collect()
    }
}

/// Counters reported to the status surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Pending entries keyed by room size
    pub queue_lengths: BTreeMap<u8, usize>,
    /// Sessions currently connected
    pub registered_sessions: usize,
    /// Sessions holding a room membership record
    pub sessions_in_rooms: usize,
    /// Rooms assembled since the engine started
    pub rooms_assembled: u64,
}

impl Diagnostics {
    pub fn queue_length(&self, size: RoomSize) -> usize {
        self.queue_lengths
            .get(&size.players())
            .copied()
            .unwrap_or_default()
    }

    pub fn total_waiting(&self) -> usize {
        self.queue_lengths.values().sum()
    }
}
