use chrono::{DateTime, Local, Utc};
use log::{debug, error, info, warn};
use rainboard_shared::{ClientMessage, Point, ServerMessage};
use uuid::Uuid;

use crate::raster::Capture;
use crate::registry::PeerSender;
use crate::state::{AppState, Board};

/// Work left over once the board lock is released.
#[derive(Debug)]
pub enum SideEffect {
    RecordClick,
    Capture(Capture),
}

/// Applies one inbound message. Fan-out happens here, under the caller's
/// lock, so every peer sees appends and clears in the order they hit the log.
pub fn apply_client_message(
    board: &mut Board,
    sender: Uuid,
    message: ClientMessage,
    now_ms: i64,
) -> Option<SideEffect> {
    match message {
        ClientMessage::RecordClick => Some(SideEffect::RecordClick),
        ClientMessage::MousePosition { x, y } => {
            board.strokes.append(Point {
                timestamp: now_ms,
                x,
                y,
            });
            board
                .peers
                .broadcast_except(sender, &ServerMessage::MousePosition { x, y });
            None
        }
        ClientMessage::ClearCanvas => {
            let capture = Capture::take(&mut board.strokes, &mut board.palette, now_ms);
            board.peers.broadcast_all(&ServerMessage::ClearCanvas);
            Some(SideEffect::Capture(capture))
        }
        ClientMessage::GetRecordedCircles => {
            debug!("getRecordedCircles from conn={sender}");
            board
                .peers
                .send_to(sender, ServerMessage::recorded_circles(board.strokes.points()));
            None
        }
        ClientMessage::Unrecognized => None,
    }
}

/// Reset-then-replay for a client joining a non-empty board.
pub fn late_joiner_handshake(points: &[Point]) -> Vec<ServerMessage> {
    if points.is_empty() {
        return Vec::new();
    }
    vec![ServerMessage::ClearCanvas, ServerMessage::replay(points)]
}

/// Registers a connection. The handshake is queued before the connection
/// becomes visible to broadcasts, so no incremental update can overtake it.
pub async fn join(state: &AppState, tx: PeerSender) -> Uuid {
    let connection_id = Uuid::new_v4();
    let mut board = state.board.write().await;
    let handshake = late_joiner_handshake(board.strokes.points());
    if !handshake.is_empty() {
        info!(
            "WS replay conn={connection_id} points={}",
            board.strokes.len()
        );
    }
    for message in handshake {
        if tx.try_send(message).is_err() {
            warn!("WS replay could not be queued conn={connection_id}");
        }
    }
    board.peers.register(connection_id, tx);
    info!(
        "WS connected conn={connection_id} peers={}",
        board.peers.len()
    );
    connection_id
}

pub async fn handle_text(state: &AppState, sender: Uuid, text: &str) {
    let message = ClientMessage::parse(text);
    if message == ClientMessage::Unrecognized {
        debug!("Ignoring message from conn={sender}: {text:?}");
        return;
    }
    let now = Utc::now();
    let side_effect = {
        let mut board = state.board.write().await;
        apply_client_message(&mut board, sender, message, now.timestamp_millis())
    };
    match side_effect {
        Some(SideEffect::RecordClick) => record_click(state, now.with_timezone(&Local)),
        Some(SideEffect::Capture(capture)) => {
            info!(
                "Clear from conn={sender}, capturing {} points",
                capture.points.len()
            );
            state.rasterizer.spawn(capture).await;
        }
        None => {}
    }
}

pub async fn leave(state: &AppState, connection_id: Uuid) {
    let mut board = state.board.write().await;
    board.peers.unregister(connection_id);
    info!(
        "WS disconnected conn={connection_id} peers={}",
        board.peers.len()
    );
}

fn record_click(state: &AppState, at: DateTime<Local>) {
    let clicks = state.clicks.clone();
    tokio::spawn(async move {
        match clicks.record(at).await {
            Ok(()) => debug!("Click recorded"),
            Err(error) => error!("Failed to record click: {error}"),
        }
    });
}
