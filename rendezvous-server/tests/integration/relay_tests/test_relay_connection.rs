use axum::extract::{Path, State};
use rendezvous_core::{
    ClientFrame, EnvelopeKind, IceCandidate, PeerId, RoomId, ServerFrame, SessionDescription,
    SignalEnvelope,
};
use rendezvous_server::{
    MemoryRoomStore, RelayConfig, RelayConnection, RelayService, room_active_handler,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::integration::{ANSWER_SDP, OFFER_SDP, init_tracing};
use crate::utils::EVENT_TIMEOUT_MS;

struct Peer {
    conn: RelayConnection,
    rx: mpsc::UnboundedReceiver<ServerFrame>,
}

impl Peer {
    fn open(service: &RelayService, id: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = RelayConnection::open(service, PeerId::from(id), tx);
        Self { conn, rx }
    }

    async fn next(&mut self) -> ServerFrame {
        tokio::time::timeout(Duration::from_millis(EVENT_TIMEOUT_MS), self.rx.recv())
            .await
            .expect("no frame within timeout")
            .expect("frame channel closed")
    }

    async fn next_signal(&mut self) -> SignalEnvelope {
        match self.next().await {
            ServerFrame::Signal(envelope) => envelope,
            other => panic!("expected signal, got {:?}", other),
        }
    }
}

fn service() -> RelayService {
    RelayService::new(Arc::new(MemoryRoomStore::new()), RelayConfig::default())
}

fn envelope(room: &str, kind: EnvelopeKind, from: &str, payload: serde_json::Value) -> SignalEnvelope {
    SignalEnvelope {
        room_id: RoomId::from(room),
        kind,
        from_peer: PeerId::from(from),
        payload,
        timestamp: 0,
    }
}

/// A creates "room1", B joins; both welcome and joined frames consumed.
async fn joined_peers(service: &RelayService) -> (Peer, Peer) {
    let mut a = Peer::open(service, "A");
    let mut b = Peer::open(service, "B");
    assert!(matches!(a.next().await, ServerFrame::Welcome { .. }));
    assert!(matches!(b.next().await, ServerFrame::Welcome { .. }));

    assert!(
        a.conn
            .handle_frame(ClientFrame::CreateRoom {
                room_id: Some(RoomId::from("room1")),
                participants: vec![PeerId::from("A"), PeerId::from("B")],
            })
            .await
    );
    assert!(matches!(a.next().await, ServerFrame::Joined { .. }));

    assert!(
        b.conn
            .handle_frame(ClientFrame::JoinRoom {
                room_id: RoomId::from("room1"),
            })
            .await
    );
    assert!(matches!(b.next().await, ServerFrame::Joined { .. }));

    (a, b)
}

#[tokio::test]
async fn test_welcome_carries_ice_servers() {
    init_tracing();

    let service = service();
    let mut peer = Peer::open(&service, "A");

    match peer.next().await {
        ServerFrame::Welcome {
            peer_id,
            ice_servers,
        } => {
            assert_eq!(peer_id, PeerId::from("A"));
            assert_eq!(ice_servers, service.get_ice_servers());
        }
        other => panic!("expected welcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_relay_forwards_full_exchange() {
    init_tracing();

    let service = service();
    let (mut a, mut b) = joined_peers(&service).await;

    let offer = serde_json::to_value(SessionDescription::offer(OFFER_SDP)).unwrap();
    assert!(
        a.conn
            .handle_frame(ClientFrame::Signal(envelope(
                "room1",
                EnvelopeKind::Offer,
                "A",
                offer
            )))
            .await
    );

    let received = b.next_signal().await;
    assert_eq!(received.kind, EnvelopeKind::Offer);
    assert_eq!(received.from_peer, PeerId::from("A"));
    assert_eq!(received.to_description().unwrap().sdp, OFFER_SDP);

    let answer = serde_json::to_value(SessionDescription::answer(ANSWER_SDP)).unwrap();
    assert!(
        b.conn
            .handle_frame(ClientFrame::Signal(envelope(
                "room1",
                EnvelopeKind::Answer,
                "B",
                answer
            )))
            .await
    );
    let received = a.next_signal().await;
    assert_eq!(received.kind, EnvelopeKind::Answer);

    let candidate = serde_json::to_value(IceCandidate::new("candidate:0")).unwrap();
    assert!(
        a.conn
            .handle_frame(ClientFrame::Signal(envelope(
                "room1",
                EnvelopeKind::Candidate,
                "A",
                candidate
            )))
            .await
    );
    let received = b.next_signal().await;
    assert_eq!(received.to_candidate().unwrap().candidate, "candidate:0");

    assert!(!a.conn.handle_frame(ClientFrame::Leave).await);
    let ended = b.next_signal().await;
    assert_eq!(ended.kind, EnvelopeKind::Status);
    assert_eq!(ended.from_peer, PeerId::from("A"));
}

#[tokio::test]
async fn test_spoofed_sender_is_rejected() {
    init_tracing();

    let service = service();
    let (mut a, _b) = joined_peers(&service).await;

    let offer = serde_json::to_value(SessionDescription::offer(OFFER_SDP)).unwrap();
    assert!(
        a.conn
            .handle_frame(ClientFrame::Signal(envelope(
                "room1",
                EnvelopeKind::Offer,
                "B",
                offer
            )))
            .await
    );

    match a.next().await {
        ServerFrame::Error { code, .. } => assert_eq!(code, "protocol_violation"),
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_envelope_for_foreign_room_is_rejected() {
    init_tracing();

    let service = service();
    let (mut a, _b) = joined_peers(&service).await;

    let payload = serde_json::json!({ "text": "hello" });
    assert!(
        a.conn
            .handle_frame(ClientFrame::Signal(envelope(
                "room2",
                EnvelopeKind::Message,
                "A",
                payload
            )))
            .await
    );

    match a.next().await {
        ServerFrame::Error { code, .. } => assert_eq!(code, "protocol_violation"),
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_errors_become_error_frames() {
    init_tracing();

    let service = service();
    let mut a = Peer::open(&service, "A");
    a.next().await;

    assert!(
        a.conn
            .handle_frame(ClientFrame::JoinRoom {
                room_id: RoomId::from("missing"),
            })
            .await
    );
    match a.next().await {
        ServerFrame::Error { code, message } => {
            assert_eq!(code, "room_not_found");
            assert!(message.contains("missing"));
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_leave_frame_and_status_envelope_close_connection() {
    init_tracing();

    let service = service();
    let (mut a, mut b) = joined_peers(&service).await;

    assert!(!a.conn.handle_frame(ClientFrame::Leave).await);
    assert!(a.conn.session().is_ended());
    assert_eq!(b.next_signal().await.kind, EnvelopeKind::Status);

    let status = serde_json::json!({ "status": "ended" });
    assert!(
        !b.conn
            .handle_frame(ClientFrame::Signal(envelope(
                "room1",
                EnvelopeKind::Status,
                "B",
                status
            )))
            .await
    );
    assert!(b.conn.session().is_ended());
}

#[tokio::test]
async fn test_room_activity_endpoint() {
    init_tracing();

    let service = service();
    let (mut a, _b) = joined_peers(&service).await;

    let activity = room_active_handler(Path("room1".to_owned()), State(service.clone())).await;
    assert!(activity.0.active);

    assert!(!a.conn.handle_frame(ClientFrame::Leave).await);

    let activity = room_active_handler(Path("room1".to_owned()), State(service.clone())).await;
    assert!(!activity.0.active);

    let activity = room_active_handler(Path("nowhere".to_owned()), State(service)).await;
    assert!(!activity.0.active);
}

#[test]
fn test_peer_registry_rejects_duplicates() {
    let service = service();

    assert!(service.add_peer(PeerId::from("A")));
    assert!(!service.add_peer(PeerId::from("A")));
    assert_eq!(service.connected_peers(), 1);

    service.remove_peer(&PeerId::from("A"));
    assert_eq!(service.connected_peers(), 0);
}
