//! Pending set of chunks awaiting a geometry rebuild.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::LinearChunk;
use super::coord::ChunkCoord;

/// A chunk waiting for a rebuild.
#[derive(Clone, Debug)]
pub struct PendingEntry {
    /// Insertion sequence; ties in candidate ranking resolve by this.
    pub seq: u64,
    /// Block data as of the latest mark.
    pub chunk: Arc<LinearChunk>,
}

/// Tracks which chunks need geometry rebuilds.
///
/// Keyed by chunk so repeated marks deduplicate: a chunk is pending at most
/// once, and keeps the sequence number of its first mark until it is removed.
#[derive(Clone, Debug, Default)]
pub struct PendingMeshSet {
    entries: HashMap<ChunkCoord, PendingEntry>,
    next_seq: u64,
}

impl PendingMeshSet {
    /// Create a new empty pending set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a chunk as pending.
    ///
    /// Returns true if the chunk was not already pending. An already pending
    /// chunk keeps its place in line but picks up the newer data reference.
    pub fn insert(&mut self, coord: ChunkCoord, chunk: Arc<LinearChunk>) -> bool {
        if let Some(entry) = self.entries.get_mut(&coord) {
            entry.chunk = chunk;
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(coord, PendingEntry { seq, chunk });
        true
    }

    /// Remove a chunk from the pending set.
    ///
    /// Called when a chunk is processed or unloaded.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<PendingEntry> {
        self.entries.remove(&coord)
    }

    /// Check if a specific chunk is pending.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.entries.contains_key(&coord)
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&PendingEntry> {
        self.entries.get(&coord)
    }

    /// Number of pending chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all pending markers.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over pending chunks (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &PendingEntry)> {
        self.entries.iter()
    }

    /// Pending coordinates in insertion order.
    pub fn coords_in_order(&self) -> Vec<ChunkCoord> {
        let mut entries: Vec<_> = self.entries.iter().map(|(&c, e)| (e.seq, c)).collect();
        entries.sort_unstable_by_key(|&(seq, _)| seq);
        entries.into_iter().map(|(_, c)| c).collect()
    }
}
