//! Performance benchmarks for matching and arrival processing

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pawn_parlor::matchmaking::{
    DistinctPawnMatcher, GroupMatcher, MatchmakingEngine, NotifyingSessionOwner,
    OpposingPairMatcher, WaitingQueue,
};
use pawn_parlor::session::{ChannelSessionHandle, SessionHandle};
use pawn_parlor::types::{ArrivalRequest, JoinRequest, RoomSize, PAWN_TYPE_CEILING};
use std::sync::Arc;

fn join_request(session: &str, pawn: u8, players: u8) -> JoinRequest {
    ArrivalRequest::new(format!("player-{}", session), pawn, players)
        .validate(session, PAWN_TYPE_CEILING)
        .unwrap()
}

/// Queue of `len` entries that never completes a group on its own
fn filled_queue(size: RoomSize, len: usize, pawn: u8) -> WaitingQueue {
    let mut queue = WaitingQueue::new(size);
    for i in 0..len {
        let session = format!("q{}", i);
        let (handle, _rx) = ChannelSessionHandle::channel(session.clone());
        let handle: Arc<dyn SessionHandle> = Arc::new(handle);
        queue
            .enqueue(join_request(&session, pawn, size.players()), handle)
            .unwrap();
    }
    queue
}

fn bench_pair_selection(c: &mut Criterion) {
    let matcher = OpposingPairMatcher;
    // Opponent sits at the very back
    let mut queue = filled_queue(RoomSize::Two, 500, 2);
    let (handle, _rx) = ChannelSessionHandle::channel("opponent".to_string());
    queue
        .enqueue(join_request("opponent", 1, 2), Arc::new(handle))
        .unwrap();
    let arrival = join_request("arrival", 3, 2);

    c.bench_function("pair_select_500_queued", |b| {
        b.iter(|| black_box(matcher.select(black_box(&queue), black_box(&arrival))))
    });
}

fn bench_distinct_selection(c: &mut Criterion) {
    let matcher = DistinctPawnMatcher;
    let queue = filled_queue(RoomSize::Three, 500, 1);
    let arrival = join_request("arrival", 2, 3);

    c.bench_function("distinct_select_500_duplicates", |b| {
        b.iter(|| black_box(matcher.select(black_box(&queue), black_box(&arrival))))
    });
}

fn bench_arrival_to_room(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("four_arrivals_to_room", |b| {
        b.iter(|| {
            rt.block_on(async {
                let engine =
                    MatchmakingEngine::new(4, Arc::new(NotifyingSessionOwner::new())).unwrap();

                for i in 0..4u8 {
                    let (handle, _rx) = ChannelSessionHandle::channel(format!("s{}", i));
                    let request = ArrivalRequest::new(format!("p{}", i), i + 1, 4);
                    let _ = engine.handle_arrival(Arc::new(handle), request).await;
                }

                black_box(engine.diagnostics())
            })
        })
    });
}

criterion_group!(
    benches,
    bench_pair_selection,
    bench_distinct_selection,
    bench_arrival_to_room
);
criterion_main!(benches);
