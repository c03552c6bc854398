use std::path::PathBuf;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_http::services::ServeDir;

use crate::gallery::{delete_image, list_images, paginate, DeleteOutcome, IMAGES_PER_PAGE};
use crate::logic::{handle_text, join, leave};
use crate::raster::parse_image_file_name;
use crate::registry::OUTBOUND_QUEUE;
use crate::state::AppState;

pub fn router(state: AppState, public_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/drawings", get(gallery_handler))
        .route("/drawings/:filename", get(image_handler))
        .route("/delete-image/:filename", delete(delete_image_handler))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(axum::Extension(public_dir.join("index.html")))
        .with_state(state)
}

/// The board page and the socket share `/`, as the browser client expects.
pub async fn root_handler(
    ws: Option<WebSocketUpgrade>,
    State(state): State<AppState>,
    axum::Extension(index_file): axum::Extension<PathBuf>,
) -> Response {
    if let Some(ws) = ws {
        return ws.on_upgrade(move |socket| handle_socket(socket, state));
    }
    match tokio::fs::read_to_string(index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);
    let connection_id = join(&state, tx).await;

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(error) = socket_sender.send(Message::Text(message.encode())).await {
                debug!("WS send failed conn={connection_id} error={error}");
                break;
            }
        }
    });

    while let Some(frame) = socket_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&state, connection_id, &text).await,
            Ok(Message::Close(close)) => {
                if let Some(close) = close {
                    info!(
                        "WS close frame conn={connection_id} code={} reason={:?}",
                        close.code, close.reason
                    );
                }
                break;
            }
            Ok(_) => {}
            Err(error) => {
                warn!("WS error conn={connection_id} error={error}");
                break;
            }
        }
    }

    leave(&state, connection_id).await;
    send_task.abort();
}

#[derive(Deserialize)]
pub struct GalleryQuery {
    page: Option<usize>,
}

pub async fn gallery_handler(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Response {
    match list_images(state.rasterizer.image_dir()).await {
        Ok(images) => {
            Json(paginate(images, query.page.unwrap_or(1), IMAGES_PER_PAGE)).into_response()
        }
        Err(error) => {
            error!("Failed to list drawings: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn image_handler(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if parse_image_file_name(&filename).is_none() {
        return (StatusCode::NOT_FOUND, "Drawing not found").into_response();
    }
    match tokio::fs::read(state.rasterizer.image_dir().join(&filename)).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Drawing not found").into_response(),
    }
}

pub async fn delete_image_handler(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match delete_image(state.rasterizer.image_dir(), &filename).await {
        Ok(DeleteOutcome::Deleted) => {
            info!("Deleted drawing {filename}");
            (StatusCode::OK, "Image deleted successfully")
        }
        Ok(DeleteOutcome::NotFound) => (StatusCode::NOT_FOUND, "Image not found"),
        Ok(DeleteOutcome::Rejected) => (StatusCode::BAD_REQUEST, "Invalid image name"),
        Err(error) => {
            error!("Failed to delete drawing {filename}: {error}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete image")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::clicks::ClickAudit;
    use crate::storage::FilePointStore;
    use crate::stroke_log::StrokeLog;

    fn app(dir: &std::path::Path) -> Router {
        let state = AppState::new(
            StrokeLog::new(),
            dir.join("drawings"),
            Arc::new(FilePointStore::new(dir.join("points.bin"))),
            ClickAudit::new(dir.join("clicks.txt")),
        );
        router(state, &dir.join("public"))
    }

    async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn seed_drawings(dir: &std::path::Path, names: &[&str]) {
        let drawings = dir.join("drawings");
        std::fs::create_dir_all(&drawings).unwrap();
        for name in names {
            std::fs::write(drawings.join(name), b"png bytes").unwrap();
        }
    }

    #[tokio::test]
    async fn gallery_lists_saved_drawings_as_json() {
        let dir = tempfile::tempdir().unwrap();
        seed_drawings(dir.path(), &["100.png", "200.png", "notes.txt"]);

        let (status, body) = send(app(dir.path()), Method::GET, "/drawings?page=4").await;
        assert_eq!(status, StatusCode::OK);
        let page: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(page["page"], 1);
        assert_eq!(page["total_pages"], 1);
        assert_eq!(page["images"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn image_fetch_serves_png_and_guards_names() {
        let dir = tempfile::tempdir().unwrap();
        seed_drawings(dir.path(), &["100.png"]);
        std::fs::write(dir.path().join("points.png"), b"secret").unwrap();

        let (status, body) = send(app(dir.path()), Method::GET, "/drawings/100.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"png bytes");

        let (status, _) = send(app(dir.path()), Method::GET, "/drawings/300.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            send(app(dir.path()), Method::GET, "/drawings/..%2Fpoints.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_maps_outcomes_to_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        seed_drawings(dir.path(), &["100.png", "notes.txt"]);

        let (status, _) = send(app(dir.path()), Method::DELETE, "/delete-image/100.png").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!dir.path().join("drawings/100.png").exists());

        let (status, _) = send(app(dir.path()), Method::DELETE, "/delete-image/100.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app(dir.path()), Method::DELETE, "/delete-image/notes.txt").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(dir.path().join("drawings/notes.txt").exists());
    }
}
