//! Quadrant addressing codec
//!
//! Pure functions shared by the chunker and by any consumer that needs to know
//! which chunk address covers a point without holding the partitioned data.
//! Boxes split at their midpoints; points exactly on a midline belong to the
//! right/bottom side, so every point has exactly one quadrant.

use crate::{Address, Quadrant};
use geo::{Coord, Rect};

/// Longitude range of the root box
pub const ROOT_MIN_X: f64 = -180.0;
pub const ROOT_MAX_X: f64 = 180.0;

/// Latitude range of the root box
pub const ROOT_MIN_Y: f64 = -90.0;
pub const ROOT_MAX_Y: f64 = 90.0;

/// Deepest subdivision that still halves an `f64` box (mantissa width)
pub const MAX_SUPPORTED_DEPTH: usize = 52;

/// The box covering the whole longitude/latitude plane
#[inline]
pub fn root_bounds() -> Rect<f64> {
    Rect::new(
        Coord {
            x: ROOT_MIN_X,
            y: ROOT_MIN_Y,
        },
        Coord {
            x: ROOT_MAX_X,
            y: ROOT_MAX_Y,
        },
    )
}

#[inline(always)]
fn midpoint(bounds: Rect<f64>) -> Coord<f64> {
    let min = bounds.min();
    let max = bounds.max();
    Coord {
        x: (min.x + max.x) / 2.0,
        y: (min.y + max.y) / 2.0,
    }
}

/// The quadrant of `bounds` containing `point`
#[inline]
pub fn quadrant_of(point: Coord<f64>, bounds: Rect<f64>) -> Quadrant {
    let mid = midpoint(bounds);
    match (point.x >= mid.x, point.y >= mid.y) {
        (false, false) => Quadrant::TopLeft,
        (true, false) => Quadrant::TopRight,
        (true, true) => Quadrant::BottomRight,
        (false, true) => Quadrant::BottomLeft,
    }
}

/// The quarter of `bounds` selected by `quadrant`
#[inline]
pub fn child_box(bounds: Rect<f64>, quadrant: Quadrant) -> Rect<f64> {
    let min = bounds.min();
    let max = bounds.max();
    let mid = midpoint(bounds);

    let (x0, x1) = if quadrant.is_right() {
        (mid.x, max.x)
    } else {
        (min.x, mid.x)
    };
    let (y0, y1) = if quadrant.is_bottom() {
        (mid.y, max.y)
    } else {
        (min.y, mid.y)
    };

    Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
}

/// The address of the depth-`depth` box containing `point`
///
/// The point must lie inside the root box; ingestion clamps coordinates before
/// they reach the codec. Depth 0 yields the root address.
pub fn address_of(point: Coord<f64>, depth: usize) -> Address {
    debug_assert!(
        (ROOT_MIN_X..=ROOT_MAX_X).contains(&point.x)
            && (ROOT_MIN_Y..=ROOT_MAX_Y).contains(&point.y),
        "point {point:?} lies outside the root box"
    );

    let mut address = Address::root();
    let mut bounds = root_bounds();
    for _ in 0..depth {
        let quadrant = quadrant_of(point, bounds);
        address.push(quadrant);
        bounds = child_box(bounds, quadrant);
    }
    address
}

/// Convenience for callers holding latitude/longitude pairs
#[inline]
pub fn address_of_lat_lon(lat: f64, lon: f64, depth: usize) -> Address {
    address_of(Coord { x: lon, y: lat }, depth)
}

/// The box addressed by `address`, walking `child_box` down from the root
pub fn bounds_of(address: &Address) -> Rect<f64> {
    address
        .digits()
        .iter()
        .fold(root_bounds(), |bounds, &quadrant| child_box(bounds, quadrant))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    fn contains(outer: Rect<f64>, inner: Rect<f64>) -> bool {
        outer.min().x <= inner.min().x
            && outer.min().y <= inner.min().y
            && outer.max().x >= inner.max().x
            && outer.max().y >= inner.max().y
    }

    #[test]
    fn test_quadrant_numbering() {
        let root = root_bounds();
        assert_eq!(quadrant_of(Coord { x: -90.0, y: -45.0 }, root), Quadrant::TopLeft);
        assert_eq!(quadrant_of(Coord { x: 90.0, y: -45.0 }, root), Quadrant::TopRight);
        assert_eq!(quadrant_of(Coord { x: 90.0, y: 45.0 }, root), Quadrant::BottomRight);
        assert_eq!(quadrant_of(Coord { x: -90.0, y: 45.0 }, root), Quadrant::BottomLeft);
    }

    #[test]
    fn test_midpoint_ties_go_greater_or_equal() {
        let root = root_bounds();
        assert_eq!(quadrant_of(Coord { x: 0.0, y: 0.0 }, root), Quadrant::BottomRight);
        assert_eq!(quadrant_of(Coord { x: 0.0, y: -1.0 }, root), Quadrant::TopRight);
        assert_eq!(quadrant_of(Coord { x: -1.0, y: 0.0 }, root), Quadrant::BottomLeft);
    }

    #[test]
    fn test_child_box_quarters() {
        let root = root_bounds();
        assert_eq!(child_box(root, Quadrant::TopLeft), rect(-180.0, -90.0, 0.0, 0.0));
        assert_eq!(child_box(root, Quadrant::TopRight), rect(0.0, -90.0, 180.0, 0.0));
        assert_eq!(child_box(root, Quadrant::BottomRight), rect(0.0, 0.0, 180.0, 90.0));
        assert_eq!(child_box(root, Quadrant::BottomLeft), rect(-180.0, 0.0, 0.0, 90.0));
    }

    #[test]
    fn test_child_box_agrees_with_quadrant_of() {
        let bounds = rect(-10.0, 20.0, 30.0, 60.0);
        for quadrant in Quadrant::ALL {
            let child = child_box(bounds, quadrant);
            let center = child.center();
            assert_eq!(quadrant_of(center, bounds), quadrant);
            // The child's min corner is always classified into the child
            assert_eq!(quadrant_of(child.min(), bounds), quadrant);
        }
    }

    #[test]
    fn test_address_of_depth_zero_is_root() {
        assert!(address_of(Coord { x: 12.0, y: 34.0 }, 0).is_root());
    }

    #[test]
    fn test_address_of_regression_anchors() {
        // (lat 90, lon 180): the bottom-right corner of the world
        assert_eq!(address_of_lat_lon(90.0, 180.0, 4).to_string(), "3333");
        assert_eq!(address_of(Coord { x: 180.0, y: 90.0 }, 4).to_string(), "3333");
        // (lat -30, lon 30)
        assert_eq!(address_of_lat_lon(-30.0, 30.0, 2).to_string(), "24");
        // Swapped axes land elsewhere
        assert_eq!(address_of(Coord { x: -30.0, y: 30.0 }, 2).to_string(), "42");
    }

    #[test]
    fn test_address_of_top_left_corner() {
        assert_eq!(address_of(Coord { x: -180.0, y: -90.0 }, 5).to_string(), "11111");
    }

    #[test]
    fn test_address_box_contains_point() {
        let points = [
            Coord { x: 2.35, y: 48.85 },
            Coord { x: -73.98, y: 40.75 },
            Coord { x: 151.2, y: -33.87 },
            Coord { x: 0.0, y: 0.0 },
            Coord { x: -180.0, y: 90.0 },
        ];
        for point in points {
            for depth in 0..20 {
                let address = address_of(point, depth);
                assert_eq!(address.len(), depth);
                let bounds = bounds_of(&address);
                assert!(
                    bounds.min().x <= point.x
                        && point.x <= bounds.max().x
                        && bounds.min().y <= point.y
                        && point.y <= bounds.max().y,
                    "{point:?} not inside {bounds:?} at depth {depth}"
                );
            }
        }
    }

    #[test]
    fn test_address_prefix_stability() {
        let point = Coord { x: 12.5, y: -7.25 };
        let deep = address_of(point, 16);
        for depth in 0..16 {
            assert_eq!(address_of(point, depth), deep.truncated(depth));
        }
    }

    #[test]
    fn test_bounds_nest_within_parent() {
        let address: Address = "31421324".parse().unwrap();
        let mut current = address.clone();
        while let Some(parent) = current.parent() {
            let child_bounds = bounds_of(&current);
            let parent_bounds = bounds_of(&parent);
            assert!(contains(parent_bounds, child_bounds));
            assert!((child_bounds.width() - parent_bounds.width() / 2.0).abs() < 1e-9);
            assert!((child_bounds.height() - parent_bounds.height() / 2.0).abs() < 1e-9);
            current = parent;
        }
        assert_eq!(bounds_of(&Address::root()), root_bounds());
    }
}
