use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use rendezvous_core::{ClientFrame, Error, PeerId, RoomId, ServerFrame};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::relay::{RelayConnection, RelayService};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomActivity {
    pub room_id: RoomId,
    pub active: bool,
}

pub fn router(service: RelayService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/{peer_id}", get(ws_handler))
        .route("/rooms/{room_id}/active", get(room_active_handler))
        .layer(cors)
        .with_state(service)
}

pub async fn serve(addr: SocketAddr, service: RelayService) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Signaling relay listening on http://{}", addr);

    axum::serve(listener, router(service))
        .await
        .context("Relay server terminated")?;
    Ok(())
}

pub async fn room_active_handler(
    Path(room_id): Path<String>,
    State(service): State<RelayService>,
) -> Json<RoomActivity> {
    let room_id = RoomId::from(room_id);
    let active = service.monitor().is_active(&room_id).await;

    Json(RoomActivity { room_id, active })
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(peer_id): Path<String>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    let peer_id = PeerId::from(peer_id);

    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, service))
}

async fn handle_socket(socket: WebSocket, peer_id: PeerId, service: RelayService) {
    let (mut sender, mut receiver) = socket.split();

    if !service.add_peer(peer_id.clone()) {
        warn!("Rejected second connection for {}", peer_id);
        let frame = ServerFrame::error(&Error::ProtocolViolation(format!(
            "peer '{}' is already connected",
            peer_id
        )));
        if let Ok(json) = serde_json::to_string(&frame) {
            let _ = sender.send(Message::Text(json.into())).await;
        }
        return;
    }
    info!("New WebSocket connection: {}", peer_id);

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut connection = RelayConnection::open(&service, peer_id.clone(), tx);

    loop {
        tokio::select! {
            _ = &mut send_task => break,

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => {
                        if !connection.handle_frame(frame).await {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid ClientFrame from {}: {:?}", peer_id, e),
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    connection.close().await;
    send_task.abort();

    service.remove_peer(&peer_id);
    info!("WebSocket disconnected: {}", peer_id);
}
