//! Room assembly
//!
//! Turns a selected group into a room: the members leave their queue, the
//! room receives a fresh id, and every member is seated in the registry. The
//! caller holds the engine lock across all three steps.

use crate::error::{MatchResult, MatchmakingError};
use crate::matchmaking::queue::WaitingQueue;
use crate::session::SessionRegistry;
use crate::types::{Room, RoomMember, SessionId};
use crate::utils::{current_timestamp, generate_room_id};
use tracing::{debug, warn};

pub struct RoomAssembler;

impl RoomAssembler {
    /// Assemble `group` out of `queue`.
    ///
    /// A group with any member no longer queued is stale: the queue and the
    /// registry are left exactly as they were.
    pub fn assemble(
        queue: &mut WaitingQueue,
        registry: &mut SessionRegistry,
        group: &[SessionId],
    ) -> MatchResult<Room> {
        let size = queue.room_size();
        if group.len() != size.capacity() {
            return Err(MatchmakingError::InternalError {
                message: format!(
                    "group of {} cannot fill a {}-player room",
                    group.len(),
                    size
                ),
            });
        }

        let entries = queue.take_group(group).inspect_err(|e| {
            warn!(room_size = %size, error = %e, "Discarding stale group");
        })?;

        let members: Vec<RoomMember> = entries
            .into_iter()
            .map(|entry| RoomMember {
                session_id: entry.request.session_id,
                player_id: entry.request.player_id,
                pawn_type: entry.request.pawn_type,
                handle: entry.handle,
            })
            .collect();

        let room = Room {
            room_id: generate_room_id(),
            size,
            members,
            assembled_at: current_timestamp(),
        };
        registry.seat(room.room_id, &room.members);

        for member in &room.members {
            debug!(
                room_id = %room.room_id,
                session_id = %member.session_id,
                pawn_type = %member.pawn_type,
                "Seated member"
            );
        }

        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::handle::MockSessionHandle;
    use crate::session::SessionHandle;
    use crate::types::{ArrivalRequest, RoomSize, PAWN_TYPE_CEILING};
    use std::sync::Arc;

    fn queued(queue: &mut WaitingQueue, registry: &mut SessionRegistry, session: &str, pawn: u8) {
        let request = ArrivalRequest::new(format!("player-{}", session), pawn, 2)
            .validate(session, PAWN_TYPE_CEILING)
            .unwrap();
        let mut handle = MockSessionHandle::new();
        let id = session.to_string();
        handle.expect_session_id().returning(move || id.clone());
        handle.expect_is_connected().return_const(true);
        let handle: Arc<dyn SessionHandle> = Arc::new(handle);

        registry.register(handle.clone(), Some(request.player_id.clone()));
        registry.mark_queued(session, queue.room_size());
        queue.enqueue(request, handle).unwrap();
    }

    #[test]
    fn test_assemble_seats_members_and_empties_queue() {
        let mut queue = WaitingQueue::new(RoomSize::Two);
        let mut registry = SessionRegistry::new();
        queued(&mut queue, &mut registry, "a", 2);
        queued(&mut queue, &mut registry, "b", 4);

        let room = RoomAssembler::assemble(
            &mut queue,
            &mut registry,
            &["b".to_string(), "a".to_string()],
        )
        .unwrap();

        assert_eq!(room.size, RoomSize::Two);
        assert_eq!(room.session_ids(), vec!["b", "a"]);
        assert_eq!(room.pawn_types().iter().map(|p| p.value()).collect::<Vec<_>>(), vec![4, 2]);
        assert!(queue.is_empty());
        assert_eq!(registry.room_of("a").unwrap().room_id, room.room_id);
        assert_eq!(registry.queued_size("b"), None);
    }

    #[test]
    fn test_stale_group_leaves_state_untouched() {
        let mut queue = WaitingQueue::new(RoomSize::Two);
        let mut registry = SessionRegistry::new();
        queued(&mut queue, &mut registry, "a", 2);

        let err = RoomAssembler::assemble(
            &mut queue,
            &mut registry,
            &["a".to_string(), "departed".to_string()],
        )
        .unwrap_err();

        assert_eq!(
            err,
            MatchmakingError::StaleGroup {
                session_id: "departed".to_string()
            }
        );
        assert_eq!(queue.len(), 1);
        assert_eq!(registry.queued_size("a"), Some(RoomSize::Two));
        assert!(registry.room_of("a").is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_wrong_group_size_is_rejected() {
        let mut queue = WaitingQueue::new(RoomSize::Two);
        let mut registry = SessionRegistry::new();
        queued(&mut queue, &mut registry, "a", 2);

        let err = RoomAssembler::assemble(&mut queue, &mut registry, &["a".to_string()]);
        assert!(matches!(err, Err(MatchmakingError::InternalError { .. })));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_room_ids_are_unique() {
        let mut queue = WaitingQueue::new(RoomSize::Two);
        let mut registry = SessionRegistry::new();
        let mut ids = Vec::new();
        for round in 0..3 {
            let a = format!("a{}", round);
            let b = format!("b{}", round);
            queued(&mut queue, &mut registry, &a, 1);
            queued(&mut queue, &mut registry, &b, 3);
            ids.push(
                RoomAssembler::assemble(&mut queue, &mut registry, &[a, b])
                    .unwrap()
                    .room_id,
            );
        }
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(registry.room_count(), 3);
    }
}
