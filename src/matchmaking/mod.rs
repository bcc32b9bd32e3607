//! Queueing, matching and room assembly
//!
//! Arrivals flow through a per-size [`WaitingQueue`], are checked by the
//! size's [`GroupMatcher`], and complete groups are turned into rooms by the
//! [`RoomAssembler`] before being handed to a [`GameSessionOwner`].

pub mod assembler;
pub mod engine;
pub mod handoff;
pub mod matcher;
pub mod queue;

pub use assembler::RoomAssembler;
pub use engine::{DisconnectOutcome, JoinOutcome, MatchmakingEngine, Registration};
pub use handoff::{GameSessionOwner, NotifyingSessionOwner};
pub use matcher::{
    default_matcher, DistinctPawnMatcher, FirstArrivalsMatcher, GroupMatcher,
    OpposingPairMatcher,
};
pub use queue::{QueuedEntry, WaitingQueue};
