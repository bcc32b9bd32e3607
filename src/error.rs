//! Error types for the matchmaking service
//!
//! Service plumbing (configuration, servers, background tasks) uses anyhow.
//! Engine entry points return [`MatchResult`] so callers can tell rejections
//! apart and report them to the originating participant.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Result type for matchmaking engine operations
pub type MatchResult<T> = std::result::Result<T, MatchmakingError>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid join request: {reason}")]
    InvalidRequest { reason: String },

    #[error("No opponent exists for pawn type {pawn_type}")]
    NoOpponent { pawn_type: u8 },

    #[error("Session {session_id} is already queued for a {room_size}-player room")]
    DuplicateSession { session_id: String, room_size: u8 },

    #[error("Session {session_id} is already seated in room {room_id}")]
    AlreadyInRoom { session_id: String, room_id: String },

    #[error("Matched group went stale before assembly: {session_id} left the queue")]
    StaleGroup { session_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            MatchmakingError::InvalidRequest { .. } => "invalid_request",
            MatchmakingError::NoOpponent { .. } => "no_opponent",
            MatchmakingError::DuplicateSession { .. } => "duplicate_session",
            MatchmakingError::AlreadyInRoom { .. } => "already_in_room",
            MatchmakingError::StaleGroup { .. } => "stale_group",
            MatchmakingError::ConfigurationError { .. } => "configuration",
            MatchmakingError::InternalError { .. } => "internal",
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        MatchmakingError::InvalidRequest {
            reason: reason.into(),
        }
    }
}
