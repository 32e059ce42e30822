//! Coastline Chunker - Size-bounded Spatial Partitioning of Line Segments
//!
//! This library splits a large, unordered collection of coastline segments into
//! chunks a map renderer can load on demand. Chunks are the leaves of an
//! adaptive quadtree over longitude/latitude and are identified by quadrant
//! addresses, so a renderer can work out which chunk covers a point without
//! holding the partitioned data.
//!
//! # Architecture
//!
//! - **[`codec`]**: Point/box to address mapping shared by builder and consumers
//! - **[`Chunker`]**: Adaptive subdivision with exact segment/box intersection
//! - **[`ChunkMap`]**: The output, with prefix queries and storage records
//! - **[`viewport`]** / **[`ChunkCache`]**: Renderer-side coverage and loading
//!
//! # Addressing
//!
//! Boxes split at their midpoints into quadrants numbered clockwise from the
//! top-left (smallest x, smallest y): `1` top-left, `2` top-right,
//! `3` bottom-right, `4` bottom-left. Points on a midline belong to the
//! greater side.
//!
//! # Performance Characteristics
//!
//! - **Build Time**: O(A × D) intersection tests, A = assignments, D = depth
//! - **Addressing**: O(D) per point, no allocation below depth 24
//! - **Parallelism**: large nodes split their four children on the rayon pool

mod address;
pub mod cache;
mod chunk_map;
mod chunker;
pub mod codec;
pub mod geometry;
pub mod segment;
pub mod viewport;

// Public API exports
pub use address::{Address, Quadrant, next_key};
pub use cache::{ChunkCache, ChunkSource};
pub use chunk_map::{ChunkMap, ChunkStats, SegmentRecord};
pub use chunker::{
    Chunker, ChunkerConfig, DEFAULT_MAX_DEPTH, DEFAULT_PARALLEL_THRESHOLD, DepthLimitPolicy,
    DuplicatePolicy, build,
};
pub use codec::{address_of, bounds_of, child_box, quadrant_of, root_bounds};
pub use geometry::intersects;
pub use segment::GeometryIssue;
pub use viewport::{CoverageOptions, covering_addresses};

/// Error types for chunk building and loading
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error(
        "Degenerate input: {remaining} segments left at address \"{address}\" after reaching the depth bound of {max_depth}"
    )]
    DegenerateInput {
        address: Address,
        remaining: usize,
        max_depth: usize,
    },

    #[error("Invalid geometry at segment {index} ({segment:?}): {issue}")]
    InvalidGeometry {
        index: usize,
        segment: geo::Line<f64>,
        issue: GeometryIssue,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Chunk source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, ChunkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(ChunkerConfig) -> Result<Chunker> = Chunker::new;
        let _: fn() -> ChunkerConfig = ChunkerConfig::default;
        let _: fn(geo::Coord<f64>, usize) -> Address = address_of;
        let _: fn() -> CoverageOptions = CoverageOptions::default;
    }

    #[test]
    fn test_error_messages() {
        let err = ChunkError::DegenerateInput {
            address: "312".parse().unwrap(),
            remaining: 7,
            max_depth: 3,
        };
        assert_eq!(
            err.to_string(),
            "Degenerate input: 7 segments left at address \"312\" after reaching the depth bound of 3"
        );

        let err = ChunkError::InvalidGeometry {
            index: 4,
            segment: geo::Line::new(geo::Coord { x: 1.0, y: 1.0 }, geo::Coord { x: 1.0, y: 1.0 }),
            issue: GeometryIssue::ZeroLength,
        };
        assert!(err.to_string().starts_with("Invalid geometry at segment 4"));
        assert!(err.to_string().ends_with("segment has zero length"));
    }
}
