//! Matchmaking engine
//!
//! Owns the waiting queues and the session registry behind a single lock.
//! Every entry point runs to completion under that lock; the only awaited
//! calls (handoff to the game-session owner) happen after it is released,
//! once the registry already reflects the new room.

use crate::error::{MatchResult, MatchmakingError};
use crate::matchmaking::assembler::RoomAssembler;
use crate::matchmaking::handoff::GameSessionOwner;
use crate::matchmaking::matcher::{default_matcher, GroupMatcher};
use crate::matchmaking::queue::WaitingQueue;
use crate::metrics::MetricsCollector;
use crate::session::{DepartedSession, ServerMessage, SessionHandle, SessionRegistry};
use crate::types::{
    ArrivalRequest, Diagnostics, LeaveReason, MemberLeft, PlayerId, QueueSnapshot, Room, RoomId,
    RoomSize, SessionId, PAWN_TYPE_CEILING,
};
use crate::utils::generate_guest_id;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of a join request that was accepted
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// The request is waiting; `position` is 1-based
    Queued { room_size: RoomSize, position: usize },
    /// The request completed a group and a room was handed off
    Matched(Room),
}

/// What the engine knew about a session when it disconnected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    NotFound,
    /// Connected but neither queued nor seated
    Registered,
    WasQueued(RoomSize),
    InRoom(MemberLeft),
}

impl DisconnectOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DisconnectOutcome::NotFound => "not_found",
            DisconnectOutcome::Registered => "registered",
            DisconnectOutcome::WasQueued(_) => "queued",
            DisconnectOutcome::InRoom(_) => "in_room",
        }
    }
}

/// Identity in use after a session announced itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub player_id: PlayerId,
    /// True when a guest identity was generated for the session
    pub guest: bool,
}

/// Everything guarded by the engine lock
struct EngineState {
    /// One waiting queue per supported room size
    queues: HashMap<RoomSize, WaitingQueue>,
    /// Connection and room membership records
    registry: SessionRegistry,
    /// Rooms assembled since startup
    rooms_assembled: u64,
}

impl EngineState {
    fn new() -> Self {
        Self {
            queues: RoomSize::ALL
                .iter()
                .map(|&size| (size, WaitingQueue::new(size)))
                .collect(),
            registry: SessionRegistry::new(),
            rooms_assembled: 0,
        }
    }

    fn queue_mut(&mut self, size: RoomSize) -> &mut WaitingQueue {
        self.queues
            .entry(size)
            .or_insert_with(|| WaitingQueue::new(size))
    }
}

/// The matchmaking engine
#[derive(Clone)]
pub struct MatchmakingEngine {
    /// Queues and registry, shared by every clone of the engine
    state: Arc<Mutex<EngineState>>,
    /// Matching policy for each room size
    matchers: HashMap<RoomSize, Arc<dyn GroupMatcher>>,
    /// Receives assembled rooms and departures of seated members
    owner: Arc<dyn GameSessionOwner>,
    /// Metrics collector
    metrics_collector: Arc<MetricsCollector>,
    /// Highest pawn type accepted from participants
    max_pawn_type: u8,
}

impl MatchmakingEngine {
    /// Create an engine with its own metrics collector
    pub fn new(max_pawn_type: u8, owner: Arc<dyn GameSessionOwner>) -> MatchResult<Self> {
        let metrics_collector =
            MetricsCollector::new().map_err(|e| MatchmakingError::ConfigurationError {
                message: format!("Failed to create metrics collector: {}", e),
            })?;
        Self::with_metrics(max_pawn_type, owner, Arc::new(metrics_collector))
    }

    /// Create an engine reporting into an existing metrics collector
    pub fn with_metrics(
        max_pawn_type: u8,
        owner: Arc<dyn GameSessionOwner>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> MatchResult<Self> {
        if !(4..=PAWN_TYPE_CEILING).contains(&max_pawn_type) {
            return Err(MatchmakingError::ConfigurationError {
                message: format!(
                    "max pawn type must be between 4 and {}, got {}",
                    PAWN_TYPE_CEILING, max_pawn_type
                ),
            });
        }

        let matchers = RoomSize::ALL
            .iter()
            .map(|&size| (size, Arc::from(default_matcher(size))))
            .collect();

        Ok(Self {
            state: Arc::new(Mutex::new(EngineState::new())),
            matchers,
            owner,
            metrics_collector,
            max_pawn_type,
        })
    }

    /// Replace the matching policy for the matcher's room size
    pub fn with_matcher(mut self, matcher: Arc<dyn GroupMatcher>) -> Self {
        self.matchers.insert(matcher.room_size(), matcher);
        self
    }

    pub fn max_pawn_type(&self) -> u8 {
        self.max_pawn_type
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    fn lock(&self) -> MatchResult<MutexGuard<'_, EngineState>> {
        self.state.lock().map_err(|_| MatchmakingError::InternalError {
            message: "Failed to acquire engine state lock".to_string(),
        })
    }

    fn matcher(&self, size: RoomSize) -> MatchResult<Arc<dyn GroupMatcher>> {
        self.matchers
            .get(&size)
            .cloned()
            .ok_or_else(|| MatchmakingError::InternalError {
                message: format!("No matcher configured for {}-player rooms", size),
            })
    }

    fn publish_gauges(&self, state: &EngineState) {
        for (size, queue) in &state.queues {
            self.metrics_collector.set_queue_length(*size, queue.len());
        }
        self.metrics_collector
            .set_connected_sessions(state.registry.connected_count());
    }

    /// Record a connected session and settle on the identity it plays under.
    ///
    /// A missing, blank or `"null"` identity is replaced by a guest id.
    pub fn register_session(
        &self,
        handle: Arc<dyn SessionHandle>,
        player_id: Option<PlayerId>,
    ) -> MatchResult<Registration> {
        let registration = match player_id {
            Some(id) if !id.trim().is_empty() && id != "null" => Registration {
                player_id: id,
                guest: false,
            },
            _ => Registration {
                player_id: generate_guest_id(),
                guest: true,
            },
        };

        let mut state = self.lock()?;
        state
            .registry
            .register(handle.clone(), Some(registration.player_id.clone()));
        self.publish_gauges(&state);

        info!(
            session_id = %handle.session_id(),
            player_id = %registration.player_id,
            guest = registration.guest,
            "Session registered"
        );
        Ok(registration)
    }

    /// Process a join request.
    ///
    /// The sender is told about the outcome: a `queued` acknowledgement, the
    /// room announcement (through the game-session owner), or the rejection.
    pub async fn handle_arrival(
        &self,
        handle: Arc<dyn SessionHandle>,
        request: ArrivalRequest,
    ) -> MatchResult<JoinOutcome> {
        let start_time = Instant::now();
        let session_id = handle.session_id();

        let result = self.arrive(handle.clone(), &request);
        let room_size = match &result {
            Ok((outcome, _)) => Some(match outcome {
                JoinOutcome::Queued { room_size, .. } => *room_size,
                JoinOutcome::Matched(room) => room.size,
            }),
            Err(_) => request.requested_size(),
        };
        self.metrics_collector
            .record_arrival(room_size, start_time.elapsed());

        match result {
            Ok((JoinOutcome::Queued { room_size, position }, _)) => {
                handle.send(ServerMessage::Queued {
                    players: room_size.players(),
                    position,
                });
                info!(
                    session_id = %session_id,
                    room_size = %room_size,
                    position,
                    "Join request queued"
                );
                Ok(JoinOutcome::Queued {
                    room_size,
                    position,
                })
            }
            Ok((JoinOutcome::Matched(room), waits)) => {
                self.metrics_collector
                    .record_room_assembled(room.size, &waits);
                info!(
                    room_id = %room.room_id,
                    room_size = %room.size,
                    members = ?room.session_ids(),
                    "Room assembled"
                );

                if let Err(e) = self.owner.start_game(room.clone()).await {
                    error!(room_id = %room.room_id, error = %e, "Room handoff failed");
                }
                Ok(JoinOutcome::Matched(room))
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Join request rejected");
                self.metrics_collector.record_rejection(e.kind());
                handle.send(ServerMessage::rejection(&e));
                Err(e)
            }
        }
    }

    /// Validate, enqueue, match and assemble under the state lock
    fn arrive(
        &self,
        handle: Arc<dyn SessionHandle>,
        request: &ArrivalRequest,
    ) -> MatchResult<(JoinOutcome, Vec<Duration>)> {
        let session_id = handle.session_id();
        let join = request.validate(&session_id, self.max_pawn_type)?;
        let size = join.room_size;
        let matcher = self.matcher(size)?;

        let mut guard = self.lock()?;
        let state = &mut *guard;

        if let Some(membership) = state.registry.room_of(&session_id) {
            return Err(MatchmakingError::AlreadyInRoom {
                session_id,
                room_id: membership.room_id.to_string(),
            });
        }
        if let Some(queued) = state.registry.queued_size(&session_id) {
            return Err(MatchmakingError::DuplicateSession {
                session_id,
                room_size: queued.players(),
            });
        }
        matcher.admit(&join)?;

        state
            .registry
            .register(handle.clone(), Some(join.player_id.clone()));
        let queue = state
            .queues
            .entry(size)
            .or_insert_with(|| WaitingQueue::new(size));
        let position = queue.enqueue(join.clone(), handle)?;
        state.registry.mark_queued(&session_id, size);

        debug!(
            session_id = %session_id,
            pawn_type = %join.pawn_type,
            room_size = %size,
            queue_length = queue.len(),
            "Evaluating queue"
        );

        let outcome = match matcher.select(queue, &join) {
            Some(group) => {
                let now = Utc::now();
                let waits: Vec<Duration> = queue
                    .requests()
                    .filter(|r| group.contains(&r.session_id))
                    .map(|r| (now - r.queued_at).to_std().unwrap_or_default())
                    .collect();

                match RoomAssembler::assemble(queue, &mut state.registry, &group) {
                    Ok(room) => {
                        state.rooms_assembled += 1;
                        (JoinOutcome::Matched(room), waits)
                    }
                    Err(e) => {
                        // Members stay queued and the arrival waits like any other
                        self.metrics_collector.record_rejection(e.kind());
                        let position = queue
                            .requests()
                            .position(|r| r.session_id == session_id)
                            .map_or(position, |index| index + 1);
                        (
                            JoinOutcome::Queued {
                                room_size: size,
                                position,
                            },
                            Vec::new(),
                        )
                    }
                }
            }
            None => (
                JoinOutcome::Queued {
                    room_size: size,
                    position,
                },
                Vec::new(),
            ),
        };

        self.publish_gauges(state);
        Ok(outcome)
    }

    /// Leave the queue for `room_size`, returning whether an entry was removed
    pub fn withdraw(&self, session_id: &str, room_size: RoomSize) -> MatchResult<bool> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        let removed = state.queue_mut(room_size).remove(session_id);
        if removed {
            state.registry.clear_queued(session_id);
            self.metrics_collector
                .record_queue_departure(room_size, LeaveReason::Withdrawn);
            info!(session_id = %session_id, room_size = %room_size, "Withdrew from queue");
        } else {
            debug!(session_id = %session_id, room_size = %room_size, "Nothing to withdraw");
        }

        self.publish_gauges(state);
        Ok(removed)
    }

    /// Reconcile a closed connection.
    ///
    /// The session leaves every queue. If it was seated, the game-session
    /// owner is told which member left and who remains.
    pub async fn disconnect(&self, session_id: &str) -> MatchResult<DisconnectOutcome> {
        let (outcome, remaining) = {
            let mut guard = self.lock()?;
            let state = &mut *guard;

            let mut was_queued = None;
            for (size, queue) in state.queues.iter_mut() {
                if queue.remove(session_id) {
                    was_queued = Some(*size);
                    self.metrics_collector
                        .record_queue_departure(*size, LeaveReason::Disconnected);
                }
            }

            let result = match state.registry.depart(session_id) {
                DepartedSession::Unknown => (
                    was_queued.map_or(DisconnectOutcome::NotFound, DisconnectOutcome::WasQueued),
                    Vec::new(),
                ),
                DepartedSession::Forgotten => (
                    was_queued.map_or(DisconnectOutcome::Registered, DisconnectOutcome::WasQueued),
                    Vec::new(),
                ),
                DepartedSession::Seated(notice) => {
                    let remaining = state.registry.room_handles(notice.room_id, session_id);
                    (DisconnectOutcome::InRoom(notice), remaining)
                }
            };

            self.publish_gauges(state);
            result
        };

        self.metrics_collector.record_disconnect(outcome.label());
        info!(
            session_id = %session_id,
            outcome = outcome.label(),
            "Session disconnected"
        );

        if let DisconnectOutcome::InRoom(notice) = &outcome {
            if let Err(e) = self.owner.member_left(notice.clone(), remaining).await {
                error!(
                    room_id = %notice.room_id,
                    session_id = %session_id,
                    error = %e,
                    "Failed to report departed room member"
                );
            }
        }

        Ok(outcome)
    }

    /// Give up a seat in an assembled room while staying connected.
    ///
    /// Clears the member's room record so the session may queue again and
    /// tells the game-session owner who left. Returns `None` when the session
    /// holds no seat.
    pub async fn leave_room(&self, session_id: &str) -> MatchResult<Option<MemberLeft>> {
        let (notice, remaining) = {
            let mut state = self.lock()?;
            let Some(notice) = state.registry.vacate(session_id) else {
                return Ok(None);
            };
            let remaining = state.registry.room_handles(notice.room_id, session_id);
            self.publish_gauges(&state);
            (notice, remaining)
        };

        info!(
            session_id = %session_id,
            room_id = %notice.room_id,
            remaining = remaining.len(),
            "Left room"
        );

        if let Err(e) = self.owner.member_left(notice.clone(), remaining).await {
            error!(
                room_id = %notice.room_id,
                session_id = %session_id,
                error = %e,
                "Failed to report departed room member"
            );
        }
        Ok(Some(notice))
    }

    /// Clear the membership records of a finished room
    pub fn release_room(&self, room_id: RoomId) -> MatchResult<usize> {
        let mut state = self.lock()?;
        let released = state.registry.release_room(room_id);
        self.publish_gauges(&state);

        if released > 0 {
            info!(room_id = %room_id, released, "Room released");
        }
        Ok(released)
    }

    /// Drop queued entries whose transport has already closed.
    ///
    /// Returns how many queued entries were removed. Rooms whose members have
    /// all disconnected are released, and idle records of closed sessions are
    /// forgotten as well.
    pub fn sweep_disconnected(&self) -> MatchResult<usize> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        let mut swept: Vec<SessionId> = Vec::new();
        for (size, queue) in state.queues.iter_mut() {
            for session_id in queue.remove_disconnected() {
                self.metrics_collector
                    .record_queue_departure(*size, LeaveReason::Swept);
                swept.push(session_id);
            }
        }
        for session_id in &swept {
            state.registry.depart(session_id);
        }
        let abandoned = state.registry.abandoned_rooms();
        for room_id in &abandoned {
            let released = state.registry.release_room(*room_id);
            debug!(room_id = %room_id, released, "Released abandoned room");
        }
        let forgotten = state.registry.forget_closed_idle();

        self.publish_gauges(state);

        if !swept.is_empty() || !abandoned.is_empty() || !forgotten.is_empty() {
            info!(
                swept = swept.len(),
                rooms_released = abandoned.len(),
                forgotten = forgotten.len(),
                "Swept closed sessions"
            );
        }
        Ok(swept.len())
    }

    pub fn diagnostics(&self) -> MatchResult<Diagnostics> {
        let state = self.lock()?;
        let queue_lengths: BTreeMap<u8, usize> = RoomSize::ALL
            .iter()
            .map(|size| {
                (
                    size.players(),
                    state.queues.get(size).map_or(0, WaitingQueue::len),
                )
            })
            .collect();

        Ok(Diagnostics {
            queue_lengths,
            registered_sessions: state.registry.connected_count(),
            sessions_in_rooms: state.registry.seated_count(),
            rooms_assembled: state.rooms_assembled,
        })
    }

    pub fn queue_snapshot(&self, room_size: RoomSize) -> MatchResult<QueueSnapshot> {
        let state = self.lock()?;
        Ok(state
            .queues
            .get(&room_size)
            .map(WaitingQueue::snapshot)
            .unwrap_or_else(|| WaitingQueue::new(room_size).snapshot()))
    }

    /// Room size the session is currently queued for
    pub fn queued_size(&self, session_id: &str) -> MatchResult<Option<RoomSize>> {
        Ok(self.lock()?.registry.queued_size(session_id))
    }

    /// Room the session is currently seated in
    pub fn room_of(&self, session_id: &str) -> MatchResult<Option<RoomId>> {
        Ok(self.lock()?.registry.room_of(session_id).map(|m| m.room_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::session::ChannelSessionHandle;
    use crate::types::DEFAULT_MAX_PAWN_TYPE;
    use async_trait::async_trait;
    use tokio::sync::mpsc::UnboundedReceiver;

    #[derive(Default)]
    struct RecordingOwner {
        started: Mutex<Vec<Room>>,
        departures: Mutex<Vec<(MemberLeft, usize)>>,
    }

    #[async_trait]
    impl GameSessionOwner for RecordingOwner {
        async fn start_game(&self, room: Room) -> Result<()> {
            self.started.lock().unwrap().push(room);
            Ok(())
        }

        async fn member_left(
            &self,
            notice: MemberLeft,
            remaining: Vec<Arc<dyn SessionHandle>>,
        ) -> Result<()> {
            self.departures
                .lock()
                .unwrap()
                .push((notice, remaining.len()));
            Ok(())
        }
    }

    fn engine() -> (MatchmakingEngine, Arc<RecordingOwner>) {
        let owner = Arc::new(RecordingOwner::default());
        let engine = MatchmakingEngine::new(DEFAULT_MAX_PAWN_TYPE, owner.clone()).unwrap();
        (engine, owner)
    }

    fn session(id: &str) -> (Arc<dyn SessionHandle>, UnboundedReceiver<ServerMessage>) {
        let (handle, rx) = ChannelSessionHandle::channel(id.to_string());
        (Arc::new(handle), rx)
    }

    async fn join(
        engine: &MatchmakingEngine,
        handle: &Arc<dyn SessionHandle>,
        pawn: u8,
        players: u8,
    ) -> MatchResult<JoinOutcome> {
        let request = ArrivalRequest::new(format!("player-{}", handle.session_id()), pawn, players);
        engine.handle_arrival(handle.clone(), request).await
    }

    #[test]
    fn test_rejects_bad_palette() {
        let owner = Arc::new(RecordingOwner::default());
        assert!(matches!(
            MatchmakingEngine::new(3, owner.clone()),
            Err(MatchmakingError::ConfigurationError { .. })
        ));
        assert!(MatchmakingEngine::new(9, owner).is_err());
    }

    #[tokio::test]
    async fn test_pair_match_hands_off_room() {
        let (engine, owner) = engine();
        let (a, mut rx_a) = session("a");
        let (b, _rx_b) = session("b");

        let first = join(&engine, &a, 2, 2).await.unwrap();
        assert!(matches!(
            first,
            JoinOutcome::Queued {
                room_size: RoomSize::Two,
                position: 1
            }
        ));
        assert_eq!(
            rx_a.try_recv().unwrap(),
            ServerMessage::Queued {
                players: 2,
                position: 1
            }
        );

        let room = match join(&engine, &b, 4, 2).await.unwrap() {
            JoinOutcome::Matched(room) => room,
            other => panic!("expected a room, got {:?}", other),
        };
        assert_eq!(room.session_ids(), vec!["b", "a"]);
        assert_eq!(owner.started.lock().unwrap().len(), 1);
        assert_eq!(engine.room_of("a").unwrap(), Some(room.room_id));
        assert_eq!(engine.queued_size("a").unwrap(), None);

        let diagnostics = engine.diagnostics().unwrap();
        assert_eq!(diagnostics.total_waiting(), 0);
        assert_eq!(diagnostics.sessions_in_rooms, 2);
        assert_eq!(diagnostics.rooms_assembled, 1);
    }

    #[tokio::test]
    async fn test_no_opponent_is_not_queued() {
        let owner = Arc::new(RecordingOwner::default());
        let engine = MatchmakingEngine::new(6, owner).unwrap();
        let (a, mut rx) = session("a");

        let err = join(&engine, &a, 5, 2).await.unwrap_err();
        assert_eq!(err, MatchmakingError::NoOpponent { pawn_type: 5 });
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Toast { .. }));
        assert!(engine.queue_snapshot(RoomSize::Two).unwrap().is_empty());

        // Same pawn is fine for larger rooms
        assert!(join(&engine, &a, 5, 3).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_request_changes_nothing() {
        let (engine, _) = engine();
        let (a, mut rx) = session("a");

        let request = ArrivalRequest {
            pawn_type: None,
            ..ArrivalRequest::new("player-a", 2, 2)
        };
        let err = engine.handle_arrival(a, request).await.unwrap_err();
        assert!(matches!(err, MatchmakingError::InvalidRequest { .. }));
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::error("Invalid join room data")
        );
        assert_eq!(engine.diagnostics().unwrap(), {
            let mut expected = Diagnostics::default();
            for size in RoomSize::ALL {
                expected.queue_lengths.insert(size.players(), 0);
            }
            expected
        });
    }

    #[tokio::test]
    async fn test_duplicate_arrival_keeps_original_entry() {
        let (engine, _) = engine();
        let (a, _rx) = session("a");

        join(&engine, &a, 1, 3).await.unwrap();
        let err = join(&engine, &a, 2, 4).await.unwrap_err();
        assert_eq!(
            err,
            MatchmakingError::DuplicateSession {
                session_id: "a".to_string(),
                room_size: 3
            }
        );

        let snapshot = engine.queue_snapshot(RoomSize::Three).unwrap();
        assert_eq!(snapshot.session_ids(), vec!["a"]);
        assert_eq!(snapshot.entries[0].pawn_type.value(), 1);
        assert!(engine.queue_snapshot(RoomSize::Four).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seated_session_cannot_queue_again() {
        let (engine, _) = engine();
        let (a, _rx_a) = session("a");
        let (b, _rx_b) = session("b");
        join(&engine, &a, 1, 2).await.unwrap();
        join(&engine, &b, 3, 2).await.unwrap();

        let err = join(&engine, &a, 2, 4).await.unwrap_err();
        assert!(matches!(err, MatchmakingError::AlreadyInRoom { .. }));
        assert!(engine.queue_snapshot(RoomSize::Four).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_is_idempotent() {
        let (engine, _) = engine();
        let (a, _rx) = session("a");
        join(&engine, &a, 2, 2).await.unwrap();

        assert!(!engine.withdraw("a", RoomSize::Three).unwrap());
        assert!(engine.withdraw("a", RoomSize::Two).unwrap());
        assert!(!engine.withdraw("a", RoomSize::Two).unwrap());
        assert_eq!(engine.queued_size("a").unwrap(), None);

        // Withdrawn sessions may queue again
        assert!(join(&engine, &a, 2, 2).await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_outcomes() {
        let (engine, owner) = engine();
        let (idle, _rx_idle) = session("idle");
        let (queued, _rx_q) = session("queued");
        let (a, _rx_a) = session("a");
        let (b, _rx_b) = session("b");

        engine.register_session(idle, None).unwrap();
        join(&engine, &queued, 1, 4).await.unwrap();
        join(&engine, &a, 2, 2).await.unwrap();
        join(&engine, &b, 4, 2).await.unwrap();

        assert_eq!(
            engine.disconnect("idle").await.unwrap(),
            DisconnectOutcome::Registered
        );
        assert_eq!(
            engine.disconnect("queued").await.unwrap(),
            DisconnectOutcome::WasQueued(RoomSize::Four)
        );
        match engine.disconnect("a").await.unwrap() {
            DisconnectOutcome::InRoom(notice) => assert_eq!(notice.pawn_type.value(), 2),
            other => panic!("unexpected outcome: {:?}", other),
        }

        {
            let departures = owner.departures.lock().unwrap();
            assert_eq!(departures.len(), 1);
            assert_eq!(departures[0].0.session_id, "a");
            assert_eq!(departures[0].1, 1);
        }

        // Second notices are no-ops
        assert_eq!(
            engine.disconnect("a").await.unwrap(),
            DisconnectOutcome::NotFound
        );
        assert_eq!(
            engine.disconnect("ghost").await.unwrap(),
            DisconnectOutcome::NotFound
        );
        assert_eq!(owner.departures.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_release_room_clears_membership() {
        let (engine, _) = engine();
        let (a, _rx_a) = session("a");
        let (b, _rx_b) = session("b");
        join(&engine, &a, 1, 2).await.unwrap();
        let room = match join(&engine, &b, 3, 2).await.unwrap() {
            JoinOutcome::Matched(room) => room,
            other => panic!("expected a room, got {:?}", other),
        };

        engine.disconnect("a").await.unwrap();
        assert_eq!(engine.release_room(room.room_id).unwrap(), 2);
        assert_eq!(engine.room_of("b").unwrap(), None);
        assert_eq!(engine.diagnostics().unwrap().sessions_in_rooms, 0);

        // Released members may queue again
        assert!(join(&engine, &b, 3, 2).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_removes_closed_queued_sessions() {
        let (engine, _) = engine();
        let (open, _rx_open) = session("open");
        let (closed, rx_closed) = session("closed");
        join(&engine, &open, 1, 3).await.unwrap();
        join(&engine, &closed, 2, 3).await.unwrap();

        drop(rx_closed);
        assert_eq!(engine.sweep_disconnected().unwrap(), 1);
        assert_eq!(
            engine.queue_snapshot(RoomSize::Three).unwrap().session_ids(),
            vec!["open"]
        );
        assert_eq!(engine.sweep_disconnected().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_session_assigns_guest_ids() {
        let (engine, _) = engine();
        let (a, _rx_a) = session("a");
        let (b, _rx_b) = session("b");

        let known = engine
            .register_session(a, Some("player-a".to_string()))
            .unwrap();
        assert_eq!(
            known,
            Registration {
                player_id: "player-a".to_string(),
                guest: false
            }
        );

        let guest = engine
            .register_session(b, Some("null".to_string()))
            .unwrap();
        assert!(guest.guest);
        assert!(guest.player_id.starts_with("Guest"));
        assert_eq!(engine.diagnostics().unwrap().registered_sessions, 2);
    }

    #[tokio::test]
    async fn test_leave_room_lets_member_queue_again() {
        let (engine, owner) = engine();
        let (a, _rx_a) = session("a");
        let (b, _rx_b) = session("b");
        join(&engine, &a, 2, 2).await.unwrap();
        join(&engine, &b, 4, 2).await.unwrap();

        let notice = engine.leave_room("a").await.unwrap().unwrap();
        assert_eq!(notice.pawn_type.value(), 2);
        assert_eq!(engine.room_of("a").unwrap(), None);
        assert_eq!(engine.room_of("b").unwrap(), Some(notice.room_id));
        assert_eq!(engine.diagnostics().unwrap().sessions_in_rooms, 1);
        {
            let departures = owner.departures.lock().unwrap();
            assert_eq!(departures.len(), 1);
            assert_eq!(departures[0].0.session_id, "a");
            assert_eq!(departures[0].1, 1);
        }

        assert_eq!(engine.leave_room("a").await.unwrap(), None);
        assert!(matches!(
            join(&engine, &a, 2, 2).await.unwrap(),
            JoinOutcome::Queued { .. }
        ));
    }

    #[tokio::test]
    async fn test_sweep_releases_rooms_everyone_left() {
        let (engine, _) = engine();
        let (a, _rx_a) = session("a");
        let (b, _rx_b) = session("b");
        let (c, _rx_c) = session("c");
        let (d, _rx_d) = session("d");
        join(&engine, &a, 2, 2).await.unwrap();
        join(&engine, &b, 4, 2).await.unwrap();
        join(&engine, &c, 1, 2).await.unwrap();
        join(&engine, &d, 3, 2).await.unwrap();

        engine.disconnect("a").await.unwrap();
        engine.disconnect("b").await.unwrap();
        engine.disconnect("c").await.unwrap();
        assert_eq!(engine.diagnostics().unwrap().sessions_in_rooms, 4);

        assert_eq!(engine.sweep_disconnected().unwrap(), 0);

        // Only the room with a connected member survives
        let diagnostics = engine.diagnostics().unwrap();
        assert_eq!(diagnostics.sessions_in_rooms, 2);
        assert_eq!(engine.room_of("a").unwrap(), None);
        assert!(engine.room_of("d").unwrap().is_some());
    }
}
