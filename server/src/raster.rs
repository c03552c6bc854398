use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, Rgba, RgbaImage};
use log::{error, info};
use rainboard_shared::Point;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::palette::{ColorCycle, Rgb};
use crate::storage::Persistence;
use crate::stroke_log::StrokeLog;

pub const IMAGE_EXTENSION: &str = "png";
pub const CIRCLE_RADIUS: f64 = 10.0;
/// Total padding added to each axis, split evenly between both sides.
pub const MARGIN: f64 = 20.0;
/// 32 Mi pixels, 128 MiB of RGBA. Larger drawings are skipped.
pub const MAX_SURFACE_PIXELS: u64 = 1 << 25;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// `None` for an empty point set.
    pub fn of(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for point in rest {
            bounds.min_x = bounds.min_x.min(point.x);
            bounds.min_y = bounds.min_y.min(point.y);
            bounds.max_x = bounds.max_x.max(point.x);
            bounds.max_y = bounds.max_y.max(point.y);
        }
        Some(bounds)
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (
            surface_extent(self.max_x - self.min_x),
            surface_extent(self.max_y - self.min_y),
        )
    }

    fn surface_position(&self, point: &Point) -> (f64, f64) {
        (
            point.x - self.min_x + MARGIN / 2.0,
            point.y - self.min_y + MARGIN / 2.0,
        )
    }
}

fn surface_extent(span: f64) -> u32 {
    (span + MARGIN).ceil().clamp(1.0, f64::from(u32::MAX)) as u32
}

pub fn image_file_name(captured_at: i64) -> String {
    format!("{captured_at}.{IMAGE_EXTENSION}")
}

/// Capture timestamp encoded in a saved image's name.
pub fn parse_image_file_name(name: &str) -> Option<i64> {
    let stem = name.strip_suffix(IMAGE_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Points drained from the log together with the colors they were assigned.
#[derive(Debug, Clone)]
pub struct Capture {
    pub captured_at: i64,
    pub points: Vec<Point>,
    pub colors: Vec<Rgb>,
}

impl Capture {
    /// Empties `log` and assigns one color per point. Must run under the same
    /// lock as appends so nothing slips between the snapshot and the reset.
    pub fn take(log: &mut StrokeLog, palette: &mut ColorCycle, captured_at: i64) -> Self {
        let points = log.snapshot_and_clear();
        let colors = palette.by_ref().take(points.len()).collect();
        Self {
            captured_at,
            points,
            colors,
        }
    }

    pub fn file_name(&self) -> String {
        image_file_name(self.captured_at)
    }

    /// Paints the capture onto a transparent surface, or `None` when there is
    /// nothing to paint. Fails without allocating when the surface would
    /// exceed [`MAX_SURFACE_PIXELS`].
    pub fn render(&self) -> Result<Option<RgbaImage>> {
        let Some(bounds) = Bounds::of(&self.points) else {
            return Ok(None);
        };
        let (width, height) = bounds.surface_size();
        if u64::from(width) * u64::from(height) > MAX_SURFACE_PIXELS {
            return Err(Error::SurfaceTooLarge { width, height });
        }
        let mut surface = RgbaImage::new(width, height);
        for (point, color) in self.points.iter().zip(&self.colors) {
            let (cx, cy) = bounds.surface_position(point);
            fill_circle(&mut surface, cx, cy, CIRCLE_RADIUS, *color);
        }
        Ok(Some(surface))
    }
}

fn fill_circle(surface: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgb) {
    let pixel = Rgba([color.r, color.g, color.b, 255]);
    let width = i64::from(surface.width());
    let height = i64::from(surface.height());
    let x0 = ((cx - radius).floor() as i64).max(0);
    let x1 = ((cx + radius).ceil() as i64).min(width - 1);
    let y0 = ((cy - radius).floor() as i64).max(0);
    let y1 = ((cy + radius).ceil() as i64).min(height - 1);
    let r2 = radius * radius;
    for py in y0..=y1 {
        let dy = py as f64 + 0.5 - cy;
        for px in x0..=x1 {
            let dx = px as f64 + 0.5 - cx;
            if dx * dx + dy * dy <= r2 {
                surface.put_pixel(px as u32, py as u32, pixel);
            }
        }
    }
}

/// Writes captures to the image directory and persists the emptied log.
pub struct Rasterizer {
    image_dir: PathBuf,
    persistence: Arc<Persistence>,
    in_flight: Mutex<JoinSet<Result<Option<PathBuf>>>>,
}

impl Rasterizer {
    pub fn new(image_dir: PathBuf, persistence: Arc<Persistence>) -> Self {
        Self {
            image_dir,
            persistence,
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Fire-and-forget: the outcome is logged by the task itself.
    pub async fn spawn(&self, capture: Capture) {
        let image_dir = self.image_dir.clone();
        let persistence = self.persistence.clone();
        let mut in_flight = self.in_flight.lock().await;
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move {
            let captured_at = capture.captured_at;
            let points = capture.points.len();
            let result = write_capture(capture, &image_dir, &persistence).await;
            match &result {
                Ok(Some(path)) => info!("Saved drawing {} ({points} points)", path.display()),
                Ok(None) => info!("Clear at {captured_at} had no points, no drawing saved"),
                Err(error) => error!("Failed to save drawing {captured_at}: {error}"),
            }
            result
        });
    }

    /// Waits for every capture still being written. Results of captures that
    /// finished before the last `spawn` are not included.
    pub async fn drain(&self) -> Vec<Result<Option<PathBuf>>> {
        let mut in_flight = std::mem::take(&mut *self.in_flight.lock().await);
        let mut results = Vec::new();
        while let Some(joined) = in_flight.join_next().await {
            results.push(joined.map_err(Error::from).and_then(|result| result));
        }
        results
    }
}

async fn write_capture(
    capture: Capture,
    image_dir: &Path,
    persistence: &Persistence,
) -> Result<Option<PathBuf>> {
    let saved = write_image(capture, image_dir).await;
    let persisted = persistence.save_if_dirty().await;
    persisted.and(saved)
}

async fn write_image(capture: Capture, image_dir: &Path) -> Result<Option<PathBuf>> {
    if capture.points.is_empty() {
        return Ok(None);
    }
    let path = image_dir.join(capture.file_name());
    tokio::task::spawn_blocking(move || -> Result<Option<PathBuf>> {
        let Some(surface) = capture.render()? else {
            return Ok(None);
        };
        surface.save_with_format(&path, ImageFormat::Png)?;
        Ok(Some(path))
    })
    .await?
}
