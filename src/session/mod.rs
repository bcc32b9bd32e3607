//! Session tracking for the matchmaking engine
//!
//! Handles are owned by the transport layer; the registry records which of
//! them are connected, queued, or seated in an assembled room.

pub mod handle;
pub mod message;
pub mod registry;

pub use handle::{ChannelSessionHandle, SessionHandle};
pub use message::ServerMessage;
pub use registry::{DepartedSession, RoomMembership, SessionRecord, SessionRegistry};
