//! ChunkMap - the partitioned output, keyed by quadrant address
//!
//! Only leaves holding at least one segment are stored. Keys are kept in
//! address order so every subtree is a contiguous range, which is what makes
//! prefix queries cheap both here and in ordered remote key-value stores.

use crate::{Address, Result, cache::ChunkSource};
use geo::{Coord, Line};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A segment as a pair of `[x, y]` endpoints, the storage representation
pub type SegmentRecord = [[f64; 2]; 2];

#[inline]
fn to_record(segment: &Line<f64>) -> SegmentRecord {
    [
        [segment.start.x, segment.start.y],
        [segment.end.x, segment.end.y],
    ]
}

#[inline]
fn from_record(record: &SegmentRecord) -> Line<f64> {
    Line::new(
        Coord {
            x: record[0][0],
            y: record[0][1],
        },
        Coord {
            x: record[1][0],
            y: record[1][1],
        },
    )
}

/// Mapping from leaf address to the segments assigned to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMap {
    chunks: BTreeMap<Address, Vec<Line<f64>>>,
    /// Leaves that exceeded the size limit because the depth bound was reached
    forced: BTreeSet<Address>,
}

/// Summary of a chunk map's size distribution
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChunkStats {
    /// Number of stored chunks
    pub chunk_count: usize,
    /// Sum of chunk lengths (segments crossing boundaries count once per chunk)
    pub total_assignments: usize,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub mean_chunk_size: f64,
    /// Length of the longest address
    pub max_depth: usize,
    /// Chunks kept oversized by the depth bound
    pub forced_count: usize,
    /// Number of chunks per address length
    pub chunks_per_depth: BTreeMap<usize, usize>,
    /// Number of chunks per chunk size
    pub size_histogram: BTreeMap<usize, usize>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding a single leaf (or nothing, if `segments` is empty)
    pub(crate) fn leaf(address: Address, segments: Vec<Line<f64>>) -> Self {
        let mut map = Self::default();
        map.insert(address, segments);
        map
    }

    /// A map holding a single leaf that was cut off by the depth bound
    pub(crate) fn forced_leaf(address: Address, segments: Vec<Line<f64>>) -> Self {
        let mut map = Self::leaf(address.clone(), segments);
        map.forced.insert(address);
        map
    }

    /// Store a chunk, replacing any previous one at the same address
    ///
    /// Empty chunks are not stored.
    pub fn insert(&mut self, address: Address, segments: Vec<Line<f64>>) {
        if segments.is_empty() {
            self.chunks.remove(&address);
        } else {
            self.chunks.insert(address, segments);
        }
    }

    /// Absorb the chunks of a disjoint subtree
    pub fn merge(&mut self, other: ChunkMap) {
        self.chunks.extend(other.chunks);
        self.forced.extend(other.forced);
    }

    #[inline]
    pub fn get(&self, address: &Address) -> Option<&[Line<f64>]> {
        self.chunks.get(address).map(Vec::as_slice)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate chunks in address order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &[Line<f64>])> {
        self.chunks.iter().map(|(a, s)| (a, s.as_slice()))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.chunks.keys()
    }

    /// Total number of (address, segment) assignments
    pub fn total_assignments(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    /// Check if any chunk holds this exact segment
    pub fn contains_segment(&self, segment: &Line<f64>) -> bool {
        self.chunks.values().any(|s| s.contains(segment))
    }

    /// Addresses of every chunk holding this exact segment
    pub fn addresses_of_segment(&self, segment: &Line<f64>) -> Vec<&Address> {
        self.chunks
            .iter()
            .filter(|(_, s)| s.contains(segment))
            .map(|(a, _)| a)
            .collect()
    }

    /// Leaves that were cut off by the depth bound while still oversized
    pub fn forced_leaves(&self) -> impl Iterator<Item = &Address> {
        self.forced.iter()
    }

    #[inline]
    pub fn is_forced(&self, address: &Address) -> bool {
        self.forced.contains(address)
    }

    /// All chunks at `prefix` or below it, in address order
    pub fn chunks_under<'a>(
        &'a self,
        prefix: &'a Address,
    ) -> impl Iterator<Item = (&'a Address, &'a [Line<f64>])> + 'a {
        self.chunks
            .range(prefix.clone()..)
            .take_while(move |(address, _)| prefix.is_prefix_of(address))
            .map(|(a, s)| (a, s.as_slice()))
    }

    /// The chunk covering `address`: stored at it or at its nearest ancestor
    pub fn resolve(&self, address: &Address) -> Option<(Address, &[Line<f64>])> {
        if let Some(segments) = self.get(address) {
            return Some((address.clone(), segments));
        }
        address
            .ancestors()
            .find_map(|ancestor| self.get(&ancestor).map(|s| (ancestor, s)))
    }

    /// Compute size statistics
    pub fn stats(&self) -> ChunkStats {
        let mut stats = ChunkStats {
            chunk_count: self.chunks.len(),
            forced_count: self.forced.len(),
            min_chunk_size: usize::MAX,
            ..Default::default()
        };

        for (address, segments) in &self.chunks {
            let size = segments.len();
            stats.total_assignments += size;
            stats.min_chunk_size = stats.min_chunk_size.min(size);
            stats.max_chunk_size = stats.max_chunk_size.max(size);
            stats.max_depth = stats.max_depth.max(address.len());
            *stats.chunks_per_depth.entry(address.len()).or_default() += 1;
            *stats.size_histogram.entry(size).or_default() += 1;
        }

        if stats.chunk_count == 0 {
            stats.min_chunk_size = 0;
        } else {
            stats.mean_chunk_size = stats.total_assignments as f64 / stats.chunk_count as f64;
        }

        stats
    }

    /// Storage representation: `layer` + address string to endpoint pairs
    ///
    /// The layer prefix tags a resolution (e.g. `"c"` for crude, `"l"` for
    /// low) so several chunk maps can share one key space; see
    /// [`Address::key_range`] for querying it by prefix.
    pub fn to_records(&self, layer: &str) -> BTreeMap<String, Vec<SegmentRecord>> {
        self.chunks
            .iter()
            .map(|(address, segments)| {
                (
                    format!("{layer}{address}"),
                    segments.iter().map(to_record).collect(),
                )
            })
            .collect()
    }

    /// Rebuild a chunk map from its storage representation
    ///
    /// Keys not starting with `layer` belong to other layers and are skipped.
    pub fn from_records<'a, I>(layer: &str, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<SegmentRecord>)>,
    {
        let mut map = Self::default();
        for (key, segments) in records {
            let Some(address) = key.strip_prefix(layer) else {
                continue;
            };
            let address: Address = address.parse()?;
            map.insert(address, segments.iter().map(from_record).collect());
        }
        Ok(map)
    }
}

impl ChunkSource for ChunkMap {
    fn fetch_prefix(&self, prefix: &Address) -> Result<Vec<(Address, Vec<Line<f64>>)>> {
        Ok(self
            .chunks_under(prefix)
            .map(|(address, segments)| (address.clone(), segments.to_vec()))
            .collect())
    }
}

#[cfg(feature = "serde")]
impl Serialize for ChunkMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.chunks
                .iter()
                .map(|(address, segments)| {
                    (
                        address.to_string(),
                        segments.iter().map(to_record).collect::<Vec<_>>(),
                    )
                }),
        )
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ChunkMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let records = BTreeMap::<String, Vec<SegmentRecord>>::deserialize(deserializer)?;
        ChunkMap::from_records("", &records).map_err(serde::de::Error::custom)
    }
}
