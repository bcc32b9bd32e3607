//! Test fixtures and recording implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use pawn_parlor::error::Result;
use pawn_parlor::gateway::ServerMessage;
use pawn_parlor::matchmaking::{GameSessionOwner, MatchmakingEngine};
use pawn_parlor::session::SessionHandle;
use pawn_parlor::types::{ArrivalRequest, MemberLeft, Room, DEFAULT_MAX_PAWN_TYPE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Session handle that keeps every message it is sent
#[derive(Debug)]
pub struct RecordingSessionHandle {
    session_id: String,
    connected: AtomicBool,
    messages: Mutex<Vec<ServerMessage>>,
}

impl RecordingSessionHandle {
    pub fn new(session_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            session_id: session_id.into(),
            connected: AtomicBool::new(true),
            messages: Mutex::new(Vec::new()),
        })
    }

    /// Simulate the transport closing underneath the engine
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<ServerMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn last_message(&self) -> Option<ServerMessage> {
        self.messages().pop()
    }

    /// Count messages matching a predicate
    pub fn count(&self, predicate: impl Fn(&ServerMessage) -> bool) -> usize {
        self.messages().iter().filter(|m| predicate(m)).count()
    }
}

impl SessionHandle for RecordingSessionHandle {
    fn session_id(&self) -> String {
        self.session_id.clone()
    }

    fn send(&self, message: ServerMessage) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
        true
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Game-session owner that captures handoffs and departures
#[derive(Debug, Default)]
pub struct RecordingGameOwner {
    rooms: Mutex<Vec<Room>>,
    departures: Mutex<Vec<MemberLeft>>,
}

impl RecordingGameOwner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.rooms
            .lock()
            .map(|rooms| rooms.clone())
            .unwrap_or_default()
    }

    pub fn departures(&self) -> Vec<MemberLeft> {
        self.departures
            .lock()
            .map(|departures| departures.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GameSessionOwner for RecordingGameOwner {
    async fn start_game(&self, room: Room) -> Result<()> {
        if let Ok(mut rooms) = self.rooms.lock() {
            rooms.push(room);
        }
        Ok(())
    }

    async fn member_left(
        &self,
        notice: MemberLeft,
        _remaining: Vec<Arc<dyn SessionHandle>>,
    ) -> Result<()> {
        if let Ok(mut departures) = self.departures.lock() {
            departures.push(notice);
        }
        Ok(())
    }
}

/// Engine with the default palette and a recording owner
pub fn create_test_engine() -> (MatchmakingEngine, Arc<RecordingGameOwner>) {
    let owner = RecordingGameOwner::new();
    let engine = MatchmakingEngine::new(DEFAULT_MAX_PAWN_TYPE, owner.clone())
        .expect("default palette is valid");
    (engine, owner)
}

/// Join request using the session id as the player id
pub fn arrival(handle: &RecordingSessionHandle, pawn_type: u8, players: u8) -> ArrivalRequest {
    ArrivalRequest::new(format!("player-{}", handle.session_id()), pawn_type, players)
}
