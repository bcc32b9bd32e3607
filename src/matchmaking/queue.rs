//! Waiting queues
//!
//! One queue exists per room size. Entries keep arrival order, which is the
//! only tie-break the matchers use.

use crate::error::{MatchResult, MatchmakingError};
use crate::session::SessionHandle;
use crate::types::{JoinRequest, QueueSnapshot, RoomSize, SessionId};
use std::sync::Arc;

/// A pending join request together with the handle that submitted it
#[derive(Clone)]
pub struct QueuedEntry {
    pub request: JoinRequest,
    pub handle: Arc<dyn SessionHandle>,
}

impl std::fmt::Debug for QueuedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedEntry")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of pending join requests for one room size
#[derive(Debug, Clone)]
pub struct WaitingQueue {
    room_size: RoomSize,
    entries: Vec<QueuedEntry>,
}

impl WaitingQueue {
    pub fn new(room_size: RoomSize) -> Self {
        Self {
            room_size,
            entries: Vec::new(),
        }
    }

    pub fn room_size(&self) -> RoomSize {
        self.room_size
    }

    /// Append a request to the back, returning its 1-based position
    pub fn enqueue(
        &mut self,
        request: JoinRequest,
        handle: Arc<dyn SessionHandle>,
    ) -> MatchResult<usize> {
        if self.contains(&request.session_id) {
            return Err(MatchmakingError::DuplicateSession {
                session_id: request.session_id,
                room_size: self.room_size.players(),
            });
        }

        self.entries.push(QueuedEntry { request, handle });
        Ok(self.entries.len())
    }

    /// Remove the first request of a session; absent sessions are a no-op
    pub fn remove(&mut self, session_id: &str) -> bool {
        match self
            .entries
            .iter()
            .position(|e| e.request.session_id == session_id)
        {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove a whole group at once.
    ///
    /// Every member must still be queued; otherwise nothing is removed and the
    /// group is reported stale. Entries come back in group order.
    pub fn take_group(&mut self, group: &[SessionId]) -> MatchResult<Vec<QueuedEntry>> {
        if let Some(missing) = group.iter().find(|id| !self.contains(id)) {
            return Err(MatchmakingError::StaleGroup {
                session_id: missing.clone(),
            });
        }

        let mut taken = Vec::with_capacity(group.len());
        for session_id in group {
            if let Some(index) = self
                .entries
                .iter()
                .position(|e| &e.request.session_id == session_id)
            {
                taken.push(self.entries.remove(index));
            }
        }
        Ok(taken)
    }

    /// Remove entries whose transport already closed, returning their session ids
    pub fn remove_disconnected(&mut self) -> Vec<SessionId> {
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            let connected = entry.handle.is_connected();
            if !connected {
                removed.push(entry.request.session_id.clone());
            }
            connected
        });
        removed
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.request.session_id == session_id)
    }

    /// Requests in arrival order
    pub fn requests(&self) -> impl Iterator<Item = &JoinRequest> {
        self.entries.iter().map(|e| &e.request)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            room_size: self.room_size,
            entries: self.requests().cloned().collect(),
        }
    }
}
