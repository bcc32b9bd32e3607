//! Pawn Parlor - room matchmaking for pawn-based board games
//!
//! This crate queues participants per room size, matches them by declared
//! pawn type, assembles rooms and hands them to a game-session owner. A
//! WebSocket gateway and a health/metrics server wrap the engine.

pub mod config;
pub mod error;
pub mod gateway;
pub mod matchmaking;
pub mod metrics;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchResult, MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use matchmaking::{
    DisconnectOutcome, GameSessionOwner, GroupMatcher, JoinOutcome, MatchmakingEngine,
    NotifyingSessionOwner,
};
pub use session::{ChannelSessionHandle, SessionHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
