use rendezvous_core::{Error, RoomStatus};
use rendezvous_server::{RoomStore, SessionState};
use std::sync::Arc;

use crate::integration::{OFFER_SDP, create_joined_pair, init_tracing};
use crate::utils::{EVENT_TIMEOUT_MS, ScriptedStore, quiet_period};

#[tokio::test]
async fn test_leave_twice_writes_status_once() {
    init_tracing();

    let store = ScriptedStore::new();
    let pair = create_joined_pair(Arc::new(store.clone()), "room1").await;

    pair.a.leave().await;
    pair.a.leave().await;

    assert_eq!(store.status_writes(), 1);
    assert_eq!(pair.a.state(), SessionState::Ended);

    let room = store.get_room(&pair.room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Ended);
}

#[tokio::test]
async fn test_commands_after_leave_fail_with_session_ended() {
    init_tracing();

    let pair = create_joined_pair(Arc::new(ScriptedStore::new()), "room1").await;
    pair.a.leave().await;

    assert_eq!(
        pair.a.send_offer(OFFER_SDP).await.unwrap_err(),
        Error::SessionEnded
    );
    assert_eq!(
        pair.a.send_message("hello").await.unwrap_err(),
        Error::SessionEnded
    );
    assert_eq!(
        pair.a.is_room_active(&pair.room_id).await.unwrap_err(),
        Error::SessionEnded
    );
}

#[tokio::test]
async fn test_failed_final_status_write_is_not_escalated() {
    init_tracing();

    let store = ScriptedStore::new();
    let pair = create_joined_pair(Arc::new(store.clone()), "room1").await;
    store.fail_status_writes(true);

    pair.a.leave().await;

    assert_eq!(pair.a.state(), SessionState::Ended);
    assert_eq!(store.status_writes(), 1);
    let room = store.get_room(&pair.room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Active);
}

#[tokio::test]
async fn test_remote_end_requires_local_cleanup() {
    init_tracing();

    let store = ScriptedStore::new();
    let pair = create_joined_pair(Arc::new(store.clone()), "room1").await;

    pair.b.leave().await;
    assert!(pair.a_events.wait_for_events(1, EVENT_TIMEOUT_MS).await);

    // The room is over but A still holds its subscriptions until cleanup
    assert_ne!(pair.a.state(), SessionState::Ended);

    pair.a.cleanup().await;
    pair.a.leave().await;

    assert_eq!(pair.a.state(), SessionState::Ended);
    assert_eq!(store.status_writes(), 1);

    quiet_period().await;
    assert_eq!(pair.a_events.terminations().await.len(), 1);
}

#[tokio::test]
async fn test_leave_on_idle_session_writes_nothing() {
    init_tracing();

    let store = ScriptedStore::new();
    let (session, _) = crate::utils::open_session(Arc::new(store.clone()), "A");

    session.leave().await;

    assert_eq!(session.state(), SessionState::Ended);
    assert_eq!(store.status_writes(), 0);
}
