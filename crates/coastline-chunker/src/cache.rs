//! Renderer-side chunk cache
//!
//! A renderer does not know where the adaptive tree stopped subdividing. It
//! asks for the address covering its view; the store answers with every chunk
//! under that prefix, and if there is none, the chunk must be stored at an
//! ancestor, so the request moves one level up.

use crate::viewport::{CoverageOptions, covering_addresses};
use crate::{Address, ChunkError, Result};
use geo::{Line, Rect};
use lru::LruCache;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of cached chunk entries
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// A prefix-queryable chunk store
///
/// Implementations return every stored chunk whose address starts with
/// `prefix`, including a chunk stored at `prefix` itself. An empty result
/// means nothing is stored at or below `prefix`.
pub trait ChunkSource {
    fn fetch_prefix(&self, prefix: &Address) -> Result<Vec<(Address, Vec<Line<f64>>)>>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for &S {
    fn fetch_prefix(&self, prefix: &Address) -> Result<Vec<(Address, Vec<Line<f64>>)>> {
        (**self).fetch_prefix(prefix)
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for Arc<S> {
    fn fetch_prefix(&self, prefix: &Address) -> Result<Vec<(Address, Vec<Line<f64>>)>> {
        (**self).fetch_prefix(prefix)
    }
}

/// LRU cache of chunks fetched from a [`ChunkSource`]
///
/// Entries with an empty segment list record that a prefix was fetched and
/// found to hold nothing of its own. Such a marker stands in for chunks
/// cached next to it, so evicting a chunk also drops every marker that
/// vouched for it: a marker at an ancestor (the requested prefix) and
/// markers below it (left while walking up to it).
pub struct ChunkCache<S> {
    source: S,
    entries: LruCache<Address, Arc<Vec<Line<f64>>>>,
    fetches: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<S: ChunkSource> ChunkCache<S> {
    pub fn new(source: S, capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            ChunkError::Configuration("chunk cache capacity must be positive".to_string())
        })?;
        Ok(Self {
            source,
            entries: LruCache::new(capacity),
            fetches: 0,
        })
    }

    pub fn with_default_capacity(source: S) -> Result<Self> {
        Self::new(source, DEFAULT_CACHE_CAPACITY)
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of fetches issued against the source so far
    #[inline]
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the address or one of its ancestors is cached
    pub fn is_loaded(&self, address: &Address) -> bool {
        self.entries.contains(address) || address.ancestors().any(|a| self.entries.contains(&a))
    }

    /// Make sure the chunk covering `address` is cached
    ///
    /// Walks up towards the root while the source has nothing at or below the
    /// requested prefix, caching each miss as an empty entry.
    pub fn load(&mut self, address: &Address) -> Result<()> {
        let mut current = address.clone();
        loop {
            if self.is_loaded(&current) {
                return Ok(());
            }

            tracing::trace!(address = %current, "Fetching chunk prefix");
            self.fetches += 1;
            let fetched = self.source.fetch_prefix(&current)?;

            if fetched.is_empty() {
                self.insert(current.clone(), Vec::new());
                match current.parent() {
                    Some(parent) => current = parent,
                    None => return Ok(()),
                }
                continue;
            }

            // The marker goes in first so evicting any of the chunks below
            // it also drops the marker
            if !fetched.iter().any(|(chunk_address, _)| *chunk_address == current) {
                self.insert(current, Vec::new());
            }
            for (chunk_address, segments) in fetched {
                self.insert(chunk_address, segments);
            }
            return Ok(());
        }
    }

    fn insert(&mut self, address: Address, segments: Vec<Line<f64>>) {
        let Some((evicted, old)) = self.entries.push(address.clone(), Arc::new(segments)) else {
            return;
        };
        if evicted != address && !old.is_empty() {
            self.forget_markers_of(&evicted);
        }
    }

    /// Drop the empty markers that made `evicted` count as loaded
    fn forget_markers_of(&mut self, evicted: &Address) {
        let stale: Vec<Address> = self
            .entries
            .iter()
            .filter(|(cached, segments)| {
                segments.is_empty()
                    && (cached.is_ancestor_of(evicted) || evicted.is_ancestor_of(cached))
            })
            .map(|(cached, _)| cached.clone())
            .collect();
        for marker in &stale {
            self.entries.pop(marker);
        }
        if !stale.is_empty() {
            tracing::trace!(
                address = %evicted,
                markers = stale.len(),
                "Evicted chunk, dropped its markers"
            );
        }
    }

    /// Load every chunk needed to draw `viewport`, returning the covering addresses
    pub fn load_viewport(
        &mut self,
        viewport: Rect<f64>,
        options: &CoverageOptions,
    ) -> Result<Vec<Address>> {
        #[cfg(feature = "profiling")]
        profiling::scope!("cache::load_viewport");

        let addresses = covering_addresses(viewport, options)?;
        for address in &addresses {
            self.load(address)?;
        }
        Ok(addresses)
    }

    /// Cached segments stored exactly at `address`
    pub fn get(&mut self, address: &Address) -> Option<Arc<Vec<Line<f64>>>> {
        self.entries.get(address).cloned()
    }

    /// Segments of every cached chunk relevant to the given addresses
    ///
    /// For each address this takes the nearest cached chunk at or above it and
    /// every cached chunk below it. Each chunk contributes once even when
    /// several addresses share it; segments shared by neighbouring chunks may
    /// still appear more than once.
    pub fn segments_for(&self, addresses: &[Address]) -> Vec<Line<f64>> {
        let mut selected: BTreeSet<&Address> = BTreeSet::new();

        for address in addresses {
            let covering = std::iter::once(address.clone())
                .chain(address.ancestors())
                .find(|a| self.entries.peek(a).is_some_and(|s| !s.is_empty()));
            for (cached, segments) in self.entries.iter() {
                if segments.is_empty() {
                    continue;
                }
                let relevant = address.is_prefix_of(cached)
                    || covering.as_ref().is_some_and(|c| c == cached);
                if relevant {
                    selected.insert(cached);
                }
            }
        }

        selected
            .into_iter()
            .filter_map(|a| self.entries.peek(a))
            .flat_map(|segments| segments.iter().copied())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
