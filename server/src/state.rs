use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::clicks::ClickAudit;
use crate::palette::ColorCycle;
use crate::raster::Rasterizer;
use crate::registry::ConnectionRegistry;
use crate::storage::{Persistence, PointStore};
use crate::stroke_log::StrokeLog;

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<RwLock<Board>>,
    pub rasterizer: Arc<Rasterizer>,
    pub persistence: Arc<Persistence>,
    pub clicks: ClickAudit,
}

/// The single shared whiteboard. Everything that has to change together
/// lives behind one lock.
pub struct Board {
    pub strokes: StrokeLog,
    pub peers: ConnectionRegistry,
    pub palette: ColorCycle,
}

impl Board {
    pub fn new(strokes: StrokeLog) -> Self {
        Self {
            strokes,
            peers: ConnectionRegistry::default(),
            palette: ColorCycle::new(),
        }
    }
}

impl AppState {
    pub fn new(
        strokes: StrokeLog,
        image_dir: PathBuf,
        store: Arc<dyn PointStore>,
        clicks: ClickAudit,
    ) -> Self {
        let board = Arc::new(RwLock::new(Board::new(strokes)));
        let persistence = Arc::new(Persistence::new(board.clone(), store));
        Self {
            rasterizer: Arc::new(Rasterizer::new(image_dir, persistence.clone())),
            board,
            persistence,
            clicks,
        }
    }
}
