//! Adaptive quadtree chunker
//!
//! Splits a segment collection into address-keyed chunks of bounded size.
//! Each node keeps every segment that touches its box, so a segment crossing a
//! quadrant boundary is copied into every quadrant it touches and no tile
//! misses a line at its edge. Subdivision stops once a node holds at most
//! `max_chunk_size` segments, or at the depth bound.

use crate::segment::{dedup_segments, validate_segments};
use crate::{Address, ChunkError, ChunkMap, Quadrant, Result, codec, geometry};
use geo::{Line, Rect};
use rayon::prelude::*;

/// Default maximum address length
pub const DEFAULT_MAX_DEPTH: usize = 24;

/// Default number of segments above which a node splits its children in parallel
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// What to do when a node is still oversized at the depth bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthLimitPolicy {
    /// Abort the build with [`ChunkError::DegenerateInput`]
    #[default]
    Error,
    /// Keep the oversized node as a leaf and list it in [`ChunkMap::forced_leaves`]
    ForceLeaf,
}

/// How identical segments in the input are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Every input segment is assigned, repeats included
    #[default]
    Keep,
    /// Exact repeats (same endpoints, same order) are dropped before partitioning
    ///
    /// Identical segments always land in the same chunks, so this is the same
    /// as collapsing repeats inside each chunk.
    Collapse,
}

/// Configuration for the chunker
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkerConfig {
    /// Largest number of segments a chunk may hold
    pub max_chunk_size: usize,
    /// Longest address the chunker may produce (default 24)
    pub max_depth: usize,
    /// Shortest leaf address; nodes above this depth always split (default 0)
    pub min_depth: usize,
    pub depth_limit_policy: DepthLimitPolicy,
    pub duplicate_policy: DuplicatePolicy,
    /// Nodes holding more segments than this split their four children on the
    /// rayon pool; smaller nodes stay on the current thread
    pub parallel_threshold: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            max_depth: DEFAULT_MAX_DEPTH,
            min_depth: 0,
            depth_limit_policy: DepthLimitPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ChunkerConfig {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(ChunkError::Configuration(
                "max_chunk_size must be positive".to_string(),
            ));
        }
        if self.max_depth == 0 || self.max_depth > codec::MAX_SUPPORTED_DEPTH {
            return Err(ChunkError::Configuration(format!(
                "max_depth must be in 1..={}, got {}",
                codec::MAX_SUPPORTED_DEPTH,
                self.max_depth
            )));
        }
        if self.min_depth > self.max_depth {
            return Err(ChunkError::Configuration(format!(
                "min_depth ({}) exceeds max_depth ({})",
                self.min_depth, self.max_depth
            )));
        }
        Ok(())
    }
}

/// Partitions segments into a [`ChunkMap`]
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Partition `segments` starting from the root box
    ///
    /// Every segment is validated first; the first invalid one aborts the
    /// build. Segments keep their input order inside each chunk.
    pub fn build(&self, segments: &[Line<f64>]) -> Result<ChunkMap> {
        #[cfg(feature = "profiling")]
        profiling::scope!("chunker::build");

        validate_segments(segments)?;

        let input = match self.config.duplicate_policy {
            DuplicatePolicy::Keep => segments.to_vec(),
            DuplicatePolicy::Collapse => {
                let deduped = dedup_segments(segments);
                if deduped.len() < segments.len() {
                    tracing::debug!(
                        dropped = segments.len() - deduped.len(),
                        "Collapsed duplicate segments"
                    );
                }
                deduped
            }
        };
        let input_len = input.len();

        let chunks = self.partition(input, codec::root_bounds(), Address::root())?;

        let forced = chunks.forced_leaves().count();
        tracing::debug!(
            segments = input_len,
            chunks = chunks.len(),
            assignments = chunks.total_assignments(),
            forced,
            max_chunk_size = self.config.max_chunk_size,
            "Partitioned segments into chunks"
        );

        Ok(chunks)
    }

    /// Recursive step over `(segments, bounds, address)`
    fn partition(
        &self,
        segments: Vec<Line<f64>>,
        bounds: Rect<f64>,
        address: Address,
    ) -> Result<ChunkMap> {
        if segments.is_empty() {
            return Ok(ChunkMap::new());
        }

        let fits = segments.len() <= self.config.max_chunk_size;
        if fits && address.len() >= self.config.min_depth {
            return Ok(ChunkMap::leaf(address, segments));
        }

        if address.len() >= self.config.max_depth {
            return match self.config.depth_limit_policy {
                DepthLimitPolicy::Error => Err(ChunkError::DegenerateInput {
                    remaining: segments.len(),
                    address,
                    max_depth: self.config.max_depth,
                }),
                DepthLimitPolicy::ForceLeaf => {
                    tracing::warn!(
                        address = %address,
                        remaining = segments.len(),
                        max_chunk_size = self.config.max_chunk_size,
                        "Depth bound reached, keeping oversized chunk"
                    );
                    Ok(ChunkMap::forced_leaf(address, segments))
                }
            };
        }

        let split = |quadrant: Quadrant| -> Result<ChunkMap> {
            let child_bounds = codec::child_box(bounds, quadrant);
            let subset: Vec<Line<f64>> = segments
                .iter()
                .filter(|segment| geometry::intersects(segment, &child_bounds))
                .copied()
                .collect();
            self.partition(subset, child_bounds, address.child(quadrant))
        };

        let parts: Vec<ChunkMap> = if segments.len() > self.config.parallel_threshold {
            Quadrant::ALL
                .into_par_iter()
                .map(split)
                .collect::<Result<_>>()?
        } else {
            Quadrant::ALL
                .into_iter()
                .map(split)
                .collect::<Result<_>>()?
        };

        let mut merged = ChunkMap::new();
        for part in parts {
            merged.merge(part);
        }
        Ok(merged)
    }
}

/// Partition `segments` into chunks of at most `max_chunk_size` with default settings
pub fn build(segments: &[Line<f64>], max_chunk_size: usize) -> Result<ChunkMap> {
    Chunker::new(ChunkerConfig::new(max_chunk_size))?.build(segments)
}
