//! Exact segment/box intersection
//!
//! These predicates run once per (segment, candidate quadrant) pair at every
//! level of the subdivision, so they take everything by value, never allocate
//! and return as early as possible.

use geo::{Coord, Line, Rect};

/// Check if a point lies inside the closed box
#[inline(always)]
pub fn contains_point(bounds: &Rect<f64>, point: Coord<f64>) -> bool {
    let min = bounds.min();
    let max = bounds.max();
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}

/// Check if both endpoints of a segment lie inside the closed box
#[inline(always)]
pub fn contains_segment(bounds: &Rect<f64>, segment: &Line<f64>) -> bool {
    contains_point(bounds, segment.start) && contains_point(bounds, segment.end)
}

/// Parametric intersection test between two segments
///
/// Solves `a.start + ua * (a.end - a.start) = b.start + ub * (b.end - b.start)`.
/// The segments intersect iff the system has a unique solution with both
/// parameters in `[0, 1]`. Parallel and collinear pairs (zero denominator)
/// report no intersection.
#[inline]
pub fn lines_intersect(a: &Line<f64>, b: &Line<f64>) -> bool {
    let (x1, y1) = (a.start.x, a.start.y);
    let (x2, y2) = (a.end.x, a.end.y);
    let (x3, y3) = (b.start.x, b.start.y);
    let (x4, y4) = (b.end.x, b.end.y);

    let denominator = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denominator == 0.0 {
        return false;
    }

    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denominator;
    if !(0.0..=1.0).contains(&ua) {
        return false;
    }
    let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denominator;
    (0.0..=1.0).contains(&ub)
}

/// Cohen-Sutherland style region code of a point relative to a box
#[inline(always)]
fn outcode(point: Coord<f64>, min: Coord<f64>, max: Coord<f64>) -> u8 {
    let mut code = 0u8;
    if point.x < min.x {
        code |= 1;
    } // left
    if point.x > max.x {
        code |= 2;
    } // right
    if point.y < min.y {
        code |= 4;
    } // top
    if point.y > max.y {
        code |= 8;
    } // bottom
    code
}

/// Check if a segment intersects a closed box
///
/// True when the segment lies entirely inside the box or crosses one of its
/// four edges. A segment running along an edge from the inside is caught by
/// the containment test, since the edge test treats collinear lines as
/// disjoint.
#[inline]
pub fn intersects(segment: &Line<f64>, bounds: &Rect<f64>) -> bool {
    let min = bounds.min();
    let max = bounds.max();

    let code_start = outcode(segment.start, min, max);
    let code_end = outcode(segment.end, min, max);

    // Both endpoints inside
    if code_start == 0 && code_end == 0 {
        return true;
    }

    // Both endpoints beyond the same edge: no edge can be reached
    if code_start & code_end != 0 {
        return false;
    }

    let edges = [
        Line::new(Coord { x: min.x, y: min.y }, Coord { x: max.x, y: min.y }), // top
        Line::new(Coord { x: max.x, y: min.y }, Coord { x: max.x, y: max.y }), // right
        Line::new(Coord { x: max.x, y: max.y }, Coord { x: min.x, y: max.y }), // bottom
        Line::new(Coord { x: min.x, y: max.y }, Coord { x: min.x, y: min.y }), // left
    ];

    edges.iter().any(|edge| lines_intersect(segment, edge))
}
