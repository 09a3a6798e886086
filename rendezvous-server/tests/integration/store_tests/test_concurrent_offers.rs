use rendezvous_core::{Error, PeerId, RoomId, SdpKind, SessionDescription};
use rendezvous_server::{MemoryRoomStore, RoomStore};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::peers;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_one_concurrent_offer_wins() {
    init_tracing();

    let store = Arc::new(MemoryRoomStore::new());
    let room_id = RoomId::from("contested");
    store
        .create_room(&room_id, &[], &PeerId::from("host"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        let room_id = room_id.clone();
        handles.push(tokio::spawn(async move {
            let from = PeerId::from(format!("peer-{}", i));
            store
                .write_offer(&room_id, SessionDescription::offer(format!("sdp-{}", i)), &from)
                .await
                .map(|_| from)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(from) => winners.push(from),
            Err(e) => assert!(matches!(
                e,
                Error::Conflict {
                    kind: SdpKind::Offer,
                    ..
                }
            )),
        }
    }

    assert_eq!(winners.len(), 1);
    let stored = store.get_room(&room_id).await.unwrap().offer.unwrap();
    assert_eq!(stored.from, winners[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_get_distinct_sequences() {
    init_tracing();

    let store = Arc::new(MemoryRoomStore::new());
    let room_id = RoomId::from("busy");
    store
        .create_room(&room_id, &peers(&["A", "B"]), &PeerId::from("A"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        let room_id = room_id.clone();
        handles.push(tokio::spawn(async move {
            store
                .append_message(&room_id, format!("msg-{}", i), &PeerId::from("A"))
                .await
                .unwrap()
                .sequence
        }));
    }

    let mut sequences = Vec::new();
    for handle in handles {
        sequences.push(handle.await.unwrap());
    }
    sequences.sort_unstable();
    sequences.dedup();
    assert_eq!(sequences.len(), 32);
}
