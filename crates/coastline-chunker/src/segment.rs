//! Line segment preparation and validation
//!
//! Ingestion hands over polylines (coastline rings as read from shapefiles);
//! the chunker works on individual straight segments.

use crate::codec::{ROOT_MAX_X, ROOT_MAX_Y, ROOT_MIN_X, ROOT_MIN_Y};
use crate::{ChunkError, Result};
use geo::{Coord, Line};
use std::collections::HashSet;

/// Why a segment was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryIssue {
    #[error("coordinate is not finite")]
    NonFinite,

    #[error("segment has zero length")]
    ZeroLength,

    #[error("segment lies outside the [-180, 180] x [-90, 90] range")]
    OutOfBounds,
}

/// Split a polyline into consecutive segments
///
/// Repeated vertices would produce zero-length segments and are skipped.
pub fn segments_from_polyline(points: &[Coord<f64>]) -> Vec<Line<f64>> {
    points
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .map(|pair| Line::new(pair[0], pair[1]))
        .collect()
}

/// Split many polylines into one flat segment list, preserving order
pub fn segments_from_polylines<I, P>(polylines: I) -> Vec<Line<f64>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[Coord<f64>]>,
{
    let mut segments = Vec::new();
    for polyline in polylines {
        segments.extend(segments_from_polyline(polyline.as_ref()));
    }
    segments
}

#[inline(always)]
fn in_root_range(point: Coord<f64>) -> bool {
    (ROOT_MIN_X..=ROOT_MAX_X).contains(&point.x) && (ROOT_MIN_Y..=ROOT_MAX_Y).contains(&point.y)
}

/// Check a single segment against the input requirements of the chunker
pub fn check_segment(segment: &Line<f64>) -> std::result::Result<(), GeometryIssue> {
    let finite = |c: Coord<f64>| c.x.is_finite() && c.y.is_finite();
    if !finite(segment.start) || !finite(segment.end) {
        return Err(GeometryIssue::NonFinite);
    }
    if segment.start == segment.end {
        return Err(GeometryIssue::ZeroLength);
    }
    if !in_root_range(segment.start) || !in_root_range(segment.end) {
        return Err(GeometryIssue::OutOfBounds);
    }
    Ok(())
}

/// Reject the first invalid segment, identifying it by index
pub fn validate_segments(segments: &[Line<f64>]) -> Result<()> {
    for (index, segment) in segments.iter().enumerate() {
        check_segment(segment).map_err(|issue| ChunkError::InvalidGeometry {
            index,
            segment: *segment,
            issue,
        })?;
    }
    Ok(())
}

/// Exact bit pattern of a segment, endpoint order included
#[inline(always)]
fn segment_key(segment: &Line<f64>) -> [u64; 4] {
    // -0.0 and 0.0 compare equal, so they must share a key
    #[inline]
    fn bits(value: f64) -> u64 {
        if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
    }
    [
        bits(segment.start.x),
        bits(segment.start.y),
        bits(segment.end.x),
        bits(segment.end.y),
    ]
}

/// Drop exact repeats, keeping the first occurrence of each segment
///
/// A segment and its reverse are different segments and both survive.
pub fn dedup_segments(segments: &[Line<f64>]) -> Vec<Line<f64>> {
    let mut seen = HashSet::with_capacity(segments.len());
    segments
        .iter()
        .filter(|segment| seen.insert(segment_key(segment)))
        .copied()
        .collect()
}
