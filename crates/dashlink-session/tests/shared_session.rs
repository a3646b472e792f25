//! Integration tests for the shared session record.
//!
//! Drives `SharedSession` the way the receiver task does and checks
//! what a concurrent consumer can observe.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use dashlink_protocol::{Codec, Message, ObstacleKind, ObstacleState, PlayerId, PlayerState, TextCodec};
use dashlink_session::{Callbacks, SessionEvent, SessionPhase, SessionSnapshot, SharedSession};

fn new_session() -> (SharedSession, dashlink_session::EventQueue) {
    SharedSession::new("127.0.0.1:4321".parse().unwrap(), 256)
}

// =========================================================================
// Snapshot atomicity
// =========================================================================

/// Every published state has `x == y` and `ducking == (x is even)`. A
/// reader that ever sees those disagree has seen a torn value.
#[test]
fn test_peer_snapshot_is_never_torn() {
    let (session, _queue) = new_session();
    let session = Arc::new(session);
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let session = Arc::clone(&session);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..20_000u32 {
                let v = i as f32;
                let state = PlayerState::new(PlayerId(2), v, v, i % 2 == 0);
                session.apply(Message::State(state)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let reader = {
        let session = Arc::clone(&session);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut observed = 0usize;
            while !done.load(Ordering::SeqCst) {
                if let Some(state) = session.other_player() {
                    assert_eq!(state.x, state.y, "x/y from different messages");
                    assert_eq!(
                        state.ducking,
                        (state.x as u32) % 2 == 0,
                        "ducking from a different message"
                    );
                    assert_eq!(state.player_id, PlayerId(2));
                    observed += 1;
                }
            }
            observed
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    let last = session.other_player().unwrap();
    assert_eq!(last.x, 19_999.0);
}

// =========================================================================
// Receive-side scenario
// =========================================================================

#[test]
fn test_lobby_to_game_scenario() {
    let (session, mut queue) = new_session();
    let callbacks = Callbacks::default();

    let starts = Arc::new(AtomicUsize::new(0));
    let obstacles = Arc::new(Mutex::new(Vec::new()));
    {
        let starts = Arc::clone(&starts);
        callbacks.set_game_start(move || {
            starts.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let obstacles = Arc::clone(&obstacles);
        callbacks.set_obstacle(move |o| obstacles.lock().unwrap().push(o));
    }

    let inbound = [
        "ASSIGN;id=1",
        "COUNT;players=2",
        "START",
        "STATE;id=2;x=140.0;y=40.0;duck=1",
        "OBST;x=800;y=40;w=24;h=38;t=0",
    ];
    for datagram in inbound {
        let message = TextCodec.decode(datagram.as_bytes()).unwrap();
        let applied = session.apply(message).unwrap();
        callbacks.dispatch(&applied);
    }

    let expected_obstacle = ObstacleState {
        x: 800.0,
        y: 40.0,
        width: 24.0,
        height: 38.0,
        kind: ObstacleKind::Cactus,
    };
    let expected_peer = PlayerState::new(PlayerId(2), 140.0, 40.0, true);

    // Live fields.
    assert_eq!(session.my_id(), PlayerId(1));
    assert_eq!(session.player_count(), 2);
    assert!(session.start_game());
    assert_eq!(session.other_player(), Some(expected_peer));
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(*obstacles.lock().unwrap(), vec![expected_obstacle]);

    // The same story through the event queue.
    let events = queue.drain();
    assert_eq!(
        events,
        vec![
            SessionEvent::Assigned(PlayerId(1)),
            SessionEvent::PlayerCount(2),
            SessionEvent::GameStarted,
            SessionEvent::PeerState(expected_peer),
            SessionEvent::Obstacle(expected_obstacle),
        ]
    );

    let mut snapshot = SessionSnapshot::default();
    for event in &events {
        snapshot.apply(event);
    }
    assert_eq!(snapshot.my_id, session.my_id());
    assert_eq!(snapshot.player_count, session.player_count());
    assert_eq!(snapshot.other_player, session.other_player());
    assert!(snapshot.start_game);
    assert_eq!(snapshot.phase(), SessionPhase::InGame);
}

#[test]
fn test_start_flag_and_callback_agree_whichever_is_seen_first() {
    let (session, _queue) = new_session();
    let callbacks = Callbacks::default();
    let seen_in_callback = Arc::new(AtomicBool::new(false));
    {
        let seen = Arc::clone(&seen_in_callback);
        callbacks.set_game_start(move || seen.store(true, Ordering::SeqCst));
    }

    let applied = session.apply(Message::Start).unwrap();
    // The flag is already up when the callback runs.
    assert!(session.start_game());
    callbacks.dispatch(&applied);
    assert!(seen_in_callback.load(Ordering::SeqCst));

    // Consumer acts on the flag; the phase stays in-game either way.
    assert!(session.take_start_game());
    assert_eq!(session.phase(), SessionPhase::InGame);
}

#[tokio::test]
async fn test_subscriber_sees_peer_updates() {
    let (session, _queue) = new_session();
    let mut rx = session.subscribe_other_player();

    let state = PlayerState::new(PlayerId(1), 3.0, 4.0, false);
    session.apply(Message::State(state)).unwrap();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Some(state));
}
