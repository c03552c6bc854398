use rainboard_shared::Point;

/// Ordered record of every point accepted since the last clear.
#[derive(Debug, Default)]
pub struct StrokeLog {
    points: Vec<Point>,
    limit: Option<usize>,
    dirty: bool,
}

impl StrokeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` keeps every point. With a limit, the oldest points are dropped
    /// once the log grows past it.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            points: Vec::new(),
            limit,
            dirty: false,
        }
    }

    pub fn restore(points: Vec<Point>, limit: Option<usize>) -> Self {
        let mut log = Self {
            points,
            limit,
            dirty: false,
        };
        log.enforce_limit();
        log
    }

    pub fn append(&mut self, point: Point) {
        self.points.push(point);
        self.enforce_limit();
        self.dirty = true;
    }

    pub fn snapshot_and_clear(&mut self) -> Vec<Point> {
        self.dirty = true;
        std::mem::take(&mut self.points)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy of the log if it changed since the last call.
    pub fn take_dirty(&mut self) -> Option<Vec<Point>> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.points.clone())
    }

    /// Undoes a `take_dirty` whose copy never made it to disk.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        let overflow = self.points.len().saturating_sub(limit);
        if overflow > 0 {
            self.points.drain(0..overflow);
        }
    }
}
