use rendezvous_core::{Error, PeerId, RoomId, RoomStatus};
use rendezvous_server::{RoomStore, SessionState};

use crate::integration::{init_tracing, memory_store};
use crate::utils::{open_session, peers};

#[tokio::test]
async fn test_join_nonexistent_room_is_not_found() {
    init_tracing();

    let (b, _events) = open_session(memory_store(), "B");

    let err = b.join_room(RoomId::from("nope")).await.unwrap_err();
    assert_eq!(err, Error::RoomNotFound(RoomId::from("nope")));
    assert_eq!(b.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_create_existing_room_fails_for_other_peer() {
    init_tracing();

    let store = memory_store();
    let (a, _) = open_session(store.clone(), "A");
    let (c, _) = open_session(store, "C");

    a.create_room(RoomId::from("room1"), peers(&["A", "B"]))
        .await
        .unwrap();

    let err = c
        .create_room(RoomId::from("room1"), peers(&["A", "B"]))
        .await
        .unwrap_err();
    assert_eq!(err, Error::RoomExists(RoomId::from("room1")));
    assert_eq!(c.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_creator_retry_is_idempotent() {
    init_tracing();

    let store = memory_store();
    let (first, _) = open_session(store.clone(), "A");
    let (retry, _) = open_session(store, "A");

    first
        .create_room(RoomId::from("room1"), peers(&["A", "B"]))
        .await
        .unwrap();
    let room = retry
        .create_room(RoomId::from("room1"), peers(&["A", "B"]))
        .await
        .expect("retry by creator should succeed");

    assert_eq!(room.created_by, PeerId::from("A"));
    assert_eq!(retry.state(), SessionState::Joined);
}

#[tokio::test]
async fn test_join_ended_room_fails() {
    init_tracing();

    let store = memory_store();
    let room_id = RoomId::from("room1");
    store
        .create_room(&room_id, &peers(&["A", "B"]), &PeerId::from("A"))
        .await
        .unwrap();
    store
        .set_status(&room_id, RoomStatus::Ended, &PeerId::from("A"))
        .await
        .unwrap();

    let (b, _) = open_session(store, "B");
    assert_eq!(
        b.join_room(room_id.clone()).await.unwrap_err(),
        Error::RoomEnded(room_id)
    );
}

#[tokio::test]
async fn test_join_by_outsider_is_rejected() {
    init_tracing();

    let store = memory_store();
    let (a, _) = open_session(store.clone(), "A");
    let (mallory, _) = open_session(store, "M");

    a.create_room(RoomId::from("room1"), peers(&["A", "B"]))
        .await
        .unwrap();

    let err = mallory.join_room(RoomId::from("room1")).await.unwrap_err();
    assert!(matches!(err, Error::NotParticipant { .. }));
}
