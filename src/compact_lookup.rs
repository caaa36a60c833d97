//! Sparse lookup keyed by voxel index triples.
//!
//! Voxels are grouped into 8x8x8 chunks, each chunk is reference counted.
//! Cloning the lookup only clones chunk handles, and inserting copies at
//! most the one chunk being written, so "validate on a copy, then swap it in"
//! stays cheap while a map is built one model at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

const CHUNK_SHIFT: u32 = 3;
const CHUNK_SIDE: i64 = 1 << CHUNK_SHIFT;
const CHUNK_LEN: usize = (CHUNK_SIDE * CHUNK_SIDE * CHUNK_SIDE) as usize;

type Chunk<T> = Arc<Vec<Option<T>>>;

/// Sparse map from `[i, j, k]` to values of type `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactLookup<T> {
    chunks: BTreeMap<[i64; 3], Chunk<T>>,
    len: usize,
}

impl<T> Default for CompactLookup<T> {
    fn default() -> Self {
        CompactLookup {
            chunks: BTreeMap::new(),
            len: 0,
        }
    }
}

fn split(ijk: [i64; 3]) -> ([i64; 3], usize) {
    let chunk = [
        ijk[0].div_euclid(CHUNK_SIDE),
        ijk[1].div_euclid(CHUNK_SIDE),
        ijk[2].div_euclid(CHUNK_SIDE),
    ];
    let i = ijk[0].rem_euclid(CHUNK_SIDE);
    let j = ijk[1].rem_euclid(CHUNK_SIDE);
    let k = ijk[2].rem_euclid(CHUNK_SIDE);
    (chunk, (i + CHUNK_SIDE * (j + CHUNK_SIDE * k)) as usize)
}

impl<T: Clone> CompactLookup<T> {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored at the given voxel, if any.
    pub fn get(&self, ijk: [i64; 3]) -> Option<&T> {
        let (chunk, offset) = split(ijk);
        self.chunks.get(&chunk).and_then(|c| c[offset].as_ref())
    }

    /// Whether a value is stored at the given voxel.
    pub fn contains(&self, ijk: [i64; 3]) -> bool {
        self.get(ijk).is_some()
    }

    /// Store a value, returning the previous one.
    pub fn insert(&mut self, ijk: [i64; 3], value: T) -> Option<T> {
        let (chunk, offset) = split(ijk);
        let entry = self
            .chunks
            .entry(chunk)
            .or_insert_with(|| Arc::new(vec![None; CHUNK_LEN]));
        let old = Arc::make_mut(entry)[offset].replace(value);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Number of voxels with a value.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no voxel has a value.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every value.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    /// Iterate over all stored voxels and their values, chunk by chunk.
    pub fn iter(&self) -> impl Iterator<Item = ([i64; 3], &T)> + '_ {
        self.chunks.iter().flat_map(|(chunk, values)| {
            let chunk = *chunk;
            values.iter().enumerate().filter_map(move |(offset, v)| {
                let offset = offset as i64;
                v.as_ref().map(|v| {
                    (
                        [
                            chunk[0] * CHUNK_SIDE + offset % CHUNK_SIDE,
                            chunk[1] * CHUNK_SIDE + (offset / CHUNK_SIDE) % CHUNK_SIDE,
                            chunk[2] * CHUNK_SIDE + offset / (CHUNK_SIDE * CHUNK_SIDE),
                        ],
                        v,
                    )
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::CompactLookup;

    #[test]
    fn insert_get() {
        let mut lookup = CompactLookup::new();
        assert!(lookup.is_empty());
        assert_eq!(lookup.insert([1, 2, 3], 10), None);
        assert_eq!(lookup.insert([100, 0, 9], 20), None);
        assert_eq!(lookup.insert([1, 2, 3], 11), Some(10));
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get([1, 2, 3]), Some(&11));
        assert_eq!(lookup.get([100, 0, 9]), Some(&20));
        assert_eq!(lookup.get([1, 2, 4]), None);
        assert_eq!(lookup.get([-1, 0, 0]), None);
        assert!(lookup.contains([100, 0, 9]));
        let mut all: Vec<_> = lookup.iter().map(|(ijk, v)| (ijk, *v)).collect();
        all.sort();
        assert_eq!(all, vec![([1, 2, 3], 11), ([100, 0, 9], 20)]);
        lookup.clear();
        assert!(lookup.is_empty());
        assert_eq!(lookup.get([1, 2, 3]), None);
    }

    #[test]
    fn clones_are_independent() {
        let mut original = CompactLookup::new();
        for i in 0..20 {
            let _ = original.insert([i, i, i], i);
        }
        let mut copy = original.clone();
        let _ = copy.insert([0, 0, 1], 99);
        let _ = copy.insert([0, 0, 0], -1);
        assert_eq!(original.get([0, 0, 1]), None);
        assert_eq!(original.get([0, 0, 0]), Some(&0));
        assert_eq!(copy.get([0, 0, 0]), Some(&-1));
        assert_eq!(copy.get([19, 19, 19]), Some(&19));
        assert_eq!(original.len(), 20);
        assert_eq!(copy.len(), 21);
        assert!(original != copy);
    }
}
