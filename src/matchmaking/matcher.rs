//! Compatibility matching for each room size
//!
//! Matchers only decide. They read the queue (which already holds the new
//! arrival) and return the session ids of a complete group; removing those
//! entries is left to the room assembler.

use crate::error::{MatchResult, MatchmakingError};
use crate::matchmaking::queue::WaitingQueue;
use crate::types::{JoinRequest, PawnType, RoomSize, SessionId};
use std::collections::HashSet;

/// Trait for per-room-size matching policies
pub trait GroupMatcher: Send + Sync {
    /// Room size this policy assembles
    fn room_size(&self) -> RoomSize;

    /// Reject a request before it is queued
    fn admit(&self, _request: &JoinRequest) -> MatchResult<()> {
        Ok(())
    }

    /// Select a complete group after `arrival` joined `queue`.
    ///
    /// Insertion order is the only tie-break: the first eligible entry wins.
    fn select(&self, queue: &WaitingQueue, arrival: &JoinRequest) -> Option<Vec<SessionId>>;
}

/// Two-player rooms: every pawn faces its fixed opposite
#[derive(Debug, Default, Clone, Copy)]
pub struct OpposingPairMatcher;

impl OpposingPairMatcher {
    fn opponent_of(pawn_type: PawnType) -> MatchResult<PawnType> {
        pawn_type.opponent().ok_or(MatchmakingError::NoOpponent {
            pawn_type: pawn_type.value(),
        })
    }
}

impl GroupMatcher for OpposingPairMatcher {
    fn room_size(&self) -> RoomSize {
        RoomSize::Two
    }

    fn admit(&self, request: &JoinRequest) -> MatchResult<()> {
        Self::opponent_of(request.pawn_type).map(|_| ())
    }

    fn select(&self, queue: &WaitingQueue, arrival: &JoinRequest) -> Option<Vec<SessionId>> {
        let opponent = Self::opponent_of(arrival.pawn_type).ok()?;

        queue
            .requests()
            .filter(|r| r.session_id != arrival.session_id)
            .find(|r| r.pawn_type == opponent)
            .map(|found| vec![arrival.session_id.clone(), found.session_id.clone()])
    }
}

/// Three-player rooms: distinct pawns, and never the arriving player twice
#[derive(Debug, Default, Clone, Copy)]
pub struct DistinctPawnMatcher;

impl GroupMatcher for DistinctPawnMatcher {
    fn room_size(&self) -> RoomSize {
        RoomSize::Three
    }

    fn select(&self, queue: &WaitingQueue, arrival: &JoinRequest) -> Option<Vec<SessionId>> {
        let capacity = self.room_size().capacity();
        // The arrival plus at least two others
        if queue.len() < capacity {
            return None;
        }

        let mut group = vec![arrival.session_id.clone()];
        let mut pawns: HashSet<PawnType> = HashSet::from([arrival.pawn_type]);

        for candidate in queue.requests() {
            if group.len() == capacity {
                break;
            }
            if candidate.session_id == arrival.session_id
                || candidate.player_id == arrival.player_id
            {
                continue;
            }
            if pawns.insert(candidate.pawn_type) {
                group.push(candidate.session_id.clone());
            }
        }

        (group.len() == capacity).then_some(group)
    }
}

/// Four-player rooms: the four earliest arrivals, regardless of pawn
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstArrivalsMatcher;

impl GroupMatcher for FirstArrivalsMatcher {
    fn room_size(&self) -> RoomSize {
        RoomSize::Four
    }

    fn select(&self, queue: &WaitingQueue, _arrival: &JoinRequest) -> Option<Vec<SessionId>> {
        let capacity = self.room_size().capacity();
        if queue.len() < capacity {
            return None;
        }

        Some(
            queue
                .requests()
                .take(capacity)
                .map(|r| r.session_id.clone())
                .collect(),
        )
    }
}

/// Default matcher for a room size
pub fn default_matcher(room_size: RoomSize) -> Box<dyn GroupMatcher> {
    match room_size {
        RoomSize::Two => Box::new(OpposingPairMatcher),
        RoomSize::Three => Box::new(DistinctPawnMatcher),
        RoomSize::Four => Box::new(FirstArrivalsMatcher),
    }
}
