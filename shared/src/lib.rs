use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

mod point_log_format;

pub use point_log_format::{
    decode_point_log_file, encode_point_log_file, PointLogDecodeError, POINT_LOG_FILE_MAGIC,
    POINT_LOG_FILE_VERSION,
};

/// One pointer sample accepted by the server.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Milliseconds since the Unix epoch at which the server accepted the sample.
    pub timestamp: i64,
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn coordinates(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Inbound text frames. Anything that does not match a known kind is
/// `Unrecognized` and gets dropped by the server.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClientMessage {
    RecordClick,
    MousePosition { x: f64, y: f64 },
    ClearCanvas,
    GetRecordedCircles,
    Unrecognized,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Self {
        match text {
            "recordClick" => Self::RecordClick,
            "clearCanvas" => Self::ClearCanvas,
            "getRecordedCircles" => Self::GetRecordedCircles,
            _ => text
                .strip_prefix("mousePosition,")
                .and_then(parse_coordinates)
                .map(|(x, y)| Self::MousePosition { x, y })
                .unwrap_or(Self::Unrecognized),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    ClearCanvas,
    MousePosition { x: f64, y: f64 },
    /// Bulk dump sent to a late joiner right after `ClearCanvas`.
    Replay(Vec<(f64, f64)>),
    /// Answer to `getRecordedCircles`.
    RecordedCircles(Vec<(f64, f64)>),
}

impl ServerMessage {
    pub fn replay(points: &[Point]) -> Self {
        Self::Replay(points.iter().map(Point::coordinates).collect())
    }

    pub fn recorded_circles(points: &[Point]) -> Self {
        Self::RecordedCircles(points.iter().map(Point::coordinates).collect())
    }

    pub fn encode(&self) -> String {
        match self {
            Self::ClearCanvas => "clearCanvas".to_string(),
            Self::MousePosition { x, y } => format!("mousePosition,{x},{y}"),
            Self::Replay(points) => encode_point_list(points),
            Self::RecordedCircles(points) => {
                format!("recordedCircles|{}", encode_point_list(points))
            }
        }
    }
}

pub fn encode_point_list(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Decodes an `x,y;x,y` body. Malformed pairs are skipped.
pub fn parse_point_list(text: &str) -> Vec<(f64, f64)> {
    text.split(';')
        .filter(|pair| !pair.is_empty())
        .filter_map(parse_coordinates)
        .collect()
}

fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let (x, y) = text.split_once(',')?;
    let x = x.trim().parse::<f64>().ok()?;
    let y = y.trim().parse::<f64>().ok()?;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some((x, y))
}
