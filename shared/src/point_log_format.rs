use serde::Deserialize;
use thiserror::Error;

use crate::Point;

pub const POINT_LOG_FILE_MAGIC: [u8; 4] = *b"RBPL";
pub const POINT_LOG_FILE_VERSION: u32 = 1;
const POINT_LOG_HEADER_LEN: usize = POINT_LOG_FILE_MAGIC.len() + std::mem::size_of::<u32>();

#[derive(Debug, Error)]
pub enum PointLogDecodeError {
    #[error("unsupported point log version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid point log data")]
    InvalidData,
}

/// Older deployments wrote the log as a JSON array. Coordinates that failed
/// to parse on the client side were stored as `null`.
#[derive(Deserialize)]
struct LegacyPoint {
    timestamp: i64,
    x: Option<f64>,
    y: Option<f64>,
}

pub fn encode_point_log_file(points: &[Point]) -> Result<Vec<u8>, bincode::error::EncodeError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&POINT_LOG_FILE_MAGIC);
    payload.extend_from_slice(&POINT_LOG_FILE_VERSION.to_le_bytes());
    let body = bincode::encode_to_vec(points, bincode::config::standard())?;
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_point_log_file(payload: &[u8]) -> Result<Vec<Point>, PointLogDecodeError> {
    if !payload.starts_with(&POINT_LOG_FILE_MAGIC) {
        return decode_legacy_json(payload);
    }
    if payload.len() < POINT_LOG_HEADER_LEN {
        return Err(PointLogDecodeError::InvalidData);
    }
    let version = u32::from_le_bytes(
        payload[POINT_LOG_FILE_MAGIC.len()..POINT_LOG_HEADER_LEN]
            .try_into()
            .map_err(|_| PointLogDecodeError::InvalidData)?,
    );
    let body = &payload[POINT_LOG_HEADER_LEN..];
    match version {
        1 => bincode::decode_from_slice(body, bincode::config::standard())
            .map(|(points, _)| points)
            .map_err(|_| PointLogDecodeError::InvalidData),
        _ => Err(PointLogDecodeError::UnsupportedVersion(version)),
    }
}

fn decode_legacy_json(payload: &[u8]) -> Result<Vec<Point>, PointLogDecodeError> {
    let legacy = serde_json::from_slice::<Vec<LegacyPoint>>(payload)
        .map_err(|_| PointLogDecodeError::InvalidData)?;
    Ok(legacy
        .into_iter()
        .filter_map(|point| match (point.x, point.y) {
            (Some(x), Some(y)) => Some(Point {
                timestamp: point.timestamp,
                x,
                y,
            }),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Point> {
        vec![
            Point { timestamp: 1_700_000_000_000, x: 0.0, y: 0.0 },
            Point { timestamp: 1_700_000_000_016, x: 10.5, y: -5.25 },
            Point { timestamp: 1_700_000_000_016, x: -3.0, y: 8.0 },
        ]
    }

    #[test]
    fn restores_identical_sequence() {
        let payload = encode_point_log_file(&sample()).unwrap();
        assert!(payload.starts_with(&POINT_LOG_FILE_MAGIC));
        assert_eq!(decode_point_log_file(&payload).unwrap(), sample());
    }

    #[test]
    fn empty_log_is_valid() {
        let payload = encode_point_log_file(&[]).unwrap();
        assert!(decode_point_log_file(&payload).unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut payload = encode_point_log_file(&sample()).unwrap();
        payload[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            decode_point_log_file(&payload),
            Err(PointLogDecodeError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(
            decode_point_log_file(b"RBPL\x01"),
            Err(PointLogDecodeError::InvalidData)
        ));
        assert!(matches!(
            decode_point_log_file(b"garbage"),
            Err(PointLogDecodeError::InvalidData)
        ));
    }

    #[test]
    fn reads_legacy_json_and_drops_null_coordinates() {
        let json = br#"[
            {"timestamp":5,"x":1.5,"y":2},
            {"timestamp":6,"x":null,"y":3},
            {"timestamp":7,"x":4,"y":5}
        ]"#;
        assert_eq!(
            decode_point_log_file(json).unwrap(),
            vec![
                Point { timestamp: 5, x: 1.5, y: 2.0 },
                Point { timestamp: 7, x: 4.0, y: 5.0 },
            ]
        );
    }
}
