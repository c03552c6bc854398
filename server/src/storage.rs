use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use rainboard_shared::{decode_point_log_file, encode_point_log_file, Point};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::Result;
use crate::state::Board;
use crate::stroke_log::StrokeLog;

#[async_trait]
pub trait PointStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    async fn load_points(&self) -> Result<Option<Vec<Point>>>;
    async fn save_points(&self, points: &[Point]) -> Result<()>;
}

pub struct FilePointStore {
    path: PathBuf,
}

impl FilePointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Unique per write, so concurrent saves never share a staging file.
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!(".{name}.{}.partial", Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl PointStore for FilePointStore {
    async fn load_points(&self) -> Result<Option<Vec<Point>>> {
        let payload = match tokio::fs::read(&self.path).await {
            Ok(payload) => payload,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        Ok(Some(decode_point_log_file(&payload)?))
    }

    async fn save_points(&self, points: &[Point]) -> Result<()> {
        let payload = encode_point_log_file(points)?;
        let staging = self.staging_path();
        let written = match tokio::fs::write(&staging, payload).await {
            Ok(()) => tokio::fs::rename(&staging, &self.path).await,
            Err(error) => Err(error),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&staging).await;
        }
        Ok(written?)
    }
}

/// Startup restore. Anything unreadable leaves the board empty.
pub async fn restore_stroke_log(store: &dyn PointStore, limit: Option<usize>) -> StrokeLog {
    match store.load_points().await {
        Ok(Some(points)) => {
            info!("Restored {} points from point log", points.len());
            StrokeLog::restore(points, limit)
        }
        Ok(None) => StrokeLog::with_limit(limit),
        Err(error) => {
            warn!("Ignoring unreadable point log: {error}");
            StrokeLog::with_limit(limit)
        }
    }
}

/// The one path every point-log write takes. Writes run one at a time and
/// each snapshots the board only once it is its turn, so whatever lands on
/// disk last is also the newest state.
pub struct Persistence {
    board: Arc<RwLock<Board>>,
    store: Arc<dyn PointStore>,
    turn: Mutex<()>,
}

impl Persistence {
    pub fn new(board: Arc<RwLock<Board>>, store: Arc<dyn PointStore>) -> Self {
        Self {
            board,
            store,
            turn: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &dyn PointStore {
        self.store.as_ref()
    }

    /// Writes the log only if it changed since the last write.
    pub async fn save_if_dirty(&self) -> Result<bool> {
        self.write(false).await
    }

    /// Writes the log unconditionally, as on shutdown.
    pub async fn save(&self) -> Result<()> {
        self.write(true).await.map(|_| ())
    }

    async fn write(&self, force: bool) -> Result<bool> {
        let _turn = self.turn.lock().await;
        let points = {
            let mut board = self.board.write().await;
            match board.strokes.take_dirty() {
                Some(points) => points,
                None if force => board.strokes.points().to_vec(),
                None => return Ok(false),
            }
        };
        if let Err(error) = self.store.save_points(&points).await {
            self.board.write().await.strokes.mark_dirty();
            return Err(error);
        }
        Ok(true)
    }
}
