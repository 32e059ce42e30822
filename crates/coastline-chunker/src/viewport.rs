//! Viewport coverage: which chunk addresses a renderer should request
//!
//! The view is padded so chunks just outside the screen are fetched ahead of
//! panning. Boxes mostly covered by the padded view are requested whole;
//! partially covered boxes are split further so the request stays tight.

use crate::codec::{self, MAX_SUPPORTED_DEPTH};
use crate::{Address, ChunkError, Quadrant, Result};
use geo::{Coord, Rect};

/// Longitude period used when comparing boxes across the date line
const WRAP_X: f64 = 360.0;
/// Latitude period used when comparing boxes across the poles
const WRAP_Y: f64 = 180.0;

/// Options for [`covering_addresses`]
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageOptions {
    /// Factor applied to the viewport size around its centre (default 1.4)
    pub padding: f64,
    /// A box is taken whole once this share of its area is in view (default 0.5)
    pub fill_ratio: f64,
    /// Overlap, relative to the smaller area, below which a box is ignored (default 0.01)
    pub min_overlap_ratio: f64,
    /// Deepest address returned (default 16)
    pub max_depth: usize,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self {
            padding: 1.4,
            fill_ratio: 0.5,
            min_overlap_ratio: 0.01,
            max_depth: 16,
        }
    }
}

impl CoverageOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.padding.is_finite() && self.padding > 0.0) {
            return Err(ChunkError::Configuration(format!(
                "padding must be a positive number, got {}",
                self.padding
            )));
        }
        if !(self.fill_ratio > 0.0 && self.fill_ratio <= 1.0) {
            return Err(ChunkError::Configuration(format!(
                "fill_ratio must be in (0, 1], got {}",
                self.fill_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.min_overlap_ratio) {
            return Err(ChunkError::Configuration(format!(
                "min_overlap_ratio must be in [0, 1], got {}",
                self.min_overlap_ratio
            )));
        }
        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ChunkError::Configuration(format!(
                "max_depth must be at most {MAX_SUPPORTED_DEPTH}, got {}",
                self.max_depth
            )));
        }
        Ok(())
    }
}

/// Scale a box about its centre
pub fn scale(rect: Rect<f64>, factor: f64) -> Rect<f64> {
    let center = rect.center();
    let half_width = rect.width() * factor / 2.0;
    let half_height = rect.height() * factor / 2.0;
    Rect::new(
        Coord {
            x: center.x - half_width,
            y: center.y - half_height,
        },
        Coord {
            x: center.x + half_width,
            y: center.y + half_height,
        },
    )
}

#[inline]
fn area(rect: &Rect<f64>) -> f64 {
    rect.width() * rect.height()
}

/// Area of the overlap of two boxes (zero if disjoint)
pub fn intersection_area(a: &Rect<f64>, b: &Rect<f64>) -> f64 {
    let x_overlap = (a.max().x.min(b.max().x) - a.min().x.max(b.min().x)).max(0.0);
    let y_overlap = (a.max().y.min(b.max().y) - a.min().y.max(b.min().y)).max(0.0);
    x_overlap * y_overlap
}

/// Largest overlap of `a` with `b` over whole-world shifts of `a`
///
/// A view straddling the date line extends past ±180°; shifting the box by
/// multiples of the world size finds the part of the world it actually shows.
pub fn wrapped_intersection_area(a: &Rect<f64>, b: &Rect<f64>) -> f64 {
    let mut best = 0.0f64;
    for i in -2..=2 {
        for j in -2..=2 {
            let offset = Coord {
                x: i as f64 * WRAP_X,
                y: j as f64 * WRAP_Y,
            };
            let shifted = Rect::new(a.min() + offset, a.max() + offset);
            best = best.max(intersection_area(&shifted, b));
        }
    }
    best
}

/// Check if two boxes overlap by more than `min_ratio` of the smaller one
///
/// Degenerate (zero-area) boxes never overlap significantly.
pub fn significant_overlap(a: &Rect<f64>, b: &Rect<f64>, min_ratio: f64) -> bool {
    let smaller = area(a).min(area(b));
    if smaller <= 0.0 {
        return false;
    }
    wrapped_intersection_area(a, b) / smaller > min_ratio
}

/// Addresses of the boxes a renderer should request to draw `viewport`
///
/// The result is in depth-first order (digits 1..4 at each level). Every
/// returned box overlaps the padded view; no returned address is an ancestor
/// of another.
pub fn covering_addresses(viewport: Rect<f64>, options: &CoverageOptions) -> Result<Vec<Address>> {
    options.validate()?;
    let target = scale(viewport, options.padding);

    let mut results = Vec::new();
    let mut stack = vec![Address::root()];

    while let Some(address) = stack.pop() {
        let bounds = codec::bounds_of(&address);
        if !significant_overlap(&bounds, &target, options.min_overlap_ratio) {
            continue;
        }

        let filled =
            wrapped_intersection_area(&bounds, &target) / area(&bounds) > options.fill_ratio;
        if filled || address.len() >= options.max_depth {
            results.push(address);
            continue;
        }

        // Reverse so quadrant 1 is visited first
        for quadrant in Quadrant::ALL.iter().rev() {
            stack.push(address.child(*quadrant));
        }
    }

    Ok(results)
}
