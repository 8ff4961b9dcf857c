// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bucketed hash table backing map values.
//!
//! Each bucket holds [`BUCKET_SLOTS`] entries and a top-hash byte per slot:
//! [`EMPTY_REST`] marks the empty tail of a chain, [`EMPTY_ONE`] a deleted
//! slot, anything from [`MIN_TOP_HASH`] up a live entry. A full bucket links
//! to an overflow bucket held in a separate arena. Iteration walks primary
//! buckets in order, detours through each overflow chain and stops once it
//! has emitted `len()` entries.

use crate::config::{EMPTY_ONE, EMPTY_REST, LOAD_FACTOR_DEN, LOAD_FACTOR_NUM, MIN_TOP_HASH};
use crate::types::BUCKET_SLOTS;
use std::collections::hash_map::{DefaultHasher, RandomState};
use std::hash::{BuildHasher, Hash};
use std::sync::OnceLock;

static HASH_STATE: OnceLock<RandomState> = OnceLock::new();

/// Process-wide hash seed shared by every map value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedState;

impl BuildHasher for SharedState {
    type Hasher = DefaultHasher;

    fn build_hasher(&self) -> DefaultHasher {
        HASH_STATE.get_or_init(RandomState::new).build_hasher()
    }
}

fn top_hash(hash: u64) -> u8 {
    let top = (hash >> 56) as u8;
    if top < MIN_TOP_HASH {
        top + MIN_TOP_HASH
    } else {
        top
    }
}

/// Where a bucket lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketRef {
    Primary(usize),
    Overflow(usize),
}

#[derive(Debug, Clone)]
struct Bucket<K, V> {
    tophash: [u8; BUCKET_SLOTS],
    keys: [Option<K>; BUCKET_SLOTS],
    values: [Option<V>; BUCKET_SLOTS],
    overflow: Option<usize>,
}

impl<K, V> Bucket<K, V> {
    fn new() -> Self {
        Self {
            tophash: [EMPTY_REST; BUCKET_SLOTS],
            keys: std::array::from_fn(|_| None),
            values: std::array::from_fn(|_| None),
            overflow: None,
        }
    }
}

/// Hash table with observable bucket structure.
#[derive(Debug, Clone)]
pub struct BucketMap<K, V, S = SharedState> {
    count: usize,
    buckets: Vec<Bucket<K, V>>,
    overflow: Vec<Bucket<K, V>>,
    hasher: S,
}

impl<K: Hash + Eq, V> Default for BucketMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> BucketMap<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Table sized so that `hint` entries fit without growing.
    pub fn with_capacity(hint: usize) -> Self {
        Self::with_capacity_and_hasher(hint, SharedState)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> BucketMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(hint: usize, hasher: S) -> Self {
        let mut n = 1usize;
        while over_load(hint, n) {
            n *= 2;
        }
        Self {
            count: 0,
            buckets: (0..n).map(|_| Bucket::new()).collect(),
            overflow: Vec::new(),
            hasher,
        }
    }

    fn hash_of(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of primary buckets (a power of two).
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of overflow buckets allocated since the last growth.
    pub fn overflow_count(&self) -> usize {
        self.overflow.len()
    }

    fn bucket(&self, at: BucketRef) -> &Bucket<K, V> {
        match at {
            BucketRef::Primary(i) => &self.buckets[i],
            BucketRef::Overflow(i) => &self.overflow[i],
        }
    }

    fn bucket_mut(&mut self, at: BucketRef) -> &mut Bucket<K, V> {
        match at {
            BucketRef::Primary(i) => &mut self.buckets[i],
            BucketRef::Overflow(i) => &mut self.overflow[i],
        }
    }

    fn home(&self, hash: u64) -> BucketRef {
        BucketRef::Primary((hash as usize) & (self.buckets.len() - 1))
    }

    fn find(&self, key: &K) -> Option<(BucketRef, usize)> {
        let hash = self.hash_of(key);
        let top = top_hash(hash);
        let mut at = self.home(hash);
        loop {
            let b = self.bucket(at);
            for slot in 0..BUCKET_SLOTS {
                match b.tophash[slot] {
                    EMPTY_REST => return None,
                    t if t == top && b.keys[slot].as_ref() == Some(key) => {
                        return Some((at, slot));
                    }
                    _ => {}
                }
            }
            at = BucketRef::Overflow(b.overflow?);
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let (at, slot) = self.find(key)?;
        self.bucket(at).values[slot].as_ref()
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (at, slot) = self.find(key)?;
        self.bucket_mut(at).values[slot].as_mut()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Insert or replace; returns the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(existing) = self.get_mut(&key) {
            return Some(std::mem::replace(existing, value));
        }
        if over_load(self.count + 1, self.buckets.len()) {
            self.grow();
        }
        let hash = self.hash_of(&key);
        let home = self.home(hash);
        self.place(top_hash(hash), home, key, value);
        self.count += 1;
        None
    }

    /// Store a key known to be absent in the first free slot of its chain.
    fn place(&mut self, top: u8, home: BucketRef, key: K, value: V) {
        let mut at = home;
        loop {
            let b = self.bucket_mut(at);
            if let Some(slot) = b.tophash.iter().position(|&t| t < MIN_TOP_HASH) {
                b.tophash[slot] = top;
                b.keys[slot] = Some(key);
                b.values[slot] = Some(value);
                return;
            }
            let link = b.overflow;
            match link {
                Some(next) => at = BucketRef::Overflow(next),
                None => {
                    let next = self.overflow.len();
                    self.overflow.push(Bucket::new());
                    self.bucket_mut(at).overflow = Some(next);
                    at = BucketRef::Overflow(next);
                }
            }
        }
    }

    /// Remove `key`, leaving a tombstone.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (at, slot) = self.find(key)?;
        let b = self.bucket_mut(at);
        b.keys[slot] = None;
        let value = b.values[slot].take();
        b.tophash[slot] = EMPTY_ONE;

        // A chain's last bucket can shrink its empty tail.
        if b.overflow.is_none() && b.tophash[slot + 1..].iter().all(|&t| t == EMPTY_REST) {
            let mut i = slot;
            loop {
                b.tophash[i] = EMPTY_REST;
                if i == 0 || b.tophash[i - 1] != EMPTY_ONE {
                    break;
                }
                i -= 1;
            }
        }
        self.count -= 1;
        value
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.buckets = vec![Bucket::new()];
        self.overflow.clear();
    }

    fn grow(&mut self) {
        let n = self.buckets.len() * 2;
        let old_primary = std::mem::replace(
            &mut self.buckets,
            (0..n).map(|_| Bucket::new()).collect(),
        );
        let old_overflow = std::mem::take(&mut self.overflow);
        log::trace!("map grow to {} buckets ({} entries)", n, self.count);

        for mut b in old_primary.into_iter().chain(old_overflow) {
            for slot in 0..BUCKET_SLOTS {
                if let (Some(k), Some(v)) = (b.keys[slot].take(), b.values[slot].take()) {
                    let hash = self.hash_of(&k);
                    let home = self.home(hash);
                    self.place(top_hash(hash), home, k, v);
                }
            }
        }
    }

    /// Bucket-walk iterator.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter {
            map: self,
            state: WalkState::Primary { bucket: 0, slot: 0 },
            emitted: 0,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

fn over_load(count: usize, buckets: usize) -> bool {
    count > BUCKET_SLOTS && count * LOAD_FACTOR_DEN > LOAD_FACTOR_NUM * buckets
}

/// Iterator position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    /// Scanning a primary bucket.
    Primary { bucket: usize, slot: usize },
    /// Scanning an overflow bucket; resume at primary `return_to` afterwards.
    Overflow {
        bucket: usize,
        slot: usize,
        return_to: usize,
    },
    Done,
}

/// Bucket-walk iterator over a [`BucketMap`].
#[derive(Debug)]
pub struct Iter<'a, K, V, S = SharedState> {
    map: &'a BucketMap<K, V, S>,
    state: WalkState,
    emitted: usize,
}

impl<K, V, S> Iter<'_, K, V, S> {
    pub fn state(&self) -> WalkState {
        self.state
    }
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let map = self.map;
        loop {
            if self.emitted == map.count {
                self.state = WalkState::Done;
            }
            let (bucket, slot, return_to) = match self.state {
                WalkState::Done => return None,
                WalkState::Primary { bucket, .. } if bucket >= map.buckets.len() => {
                    self.state = WalkState::Done;
                    return None;
                }
                WalkState::Primary { bucket, slot } => {
                    (&map.buckets[bucket], slot, bucket + 1)
                }
                WalkState::Overflow {
                    bucket,
                    slot,
                    return_to,
                } => (&map.overflow[bucket], slot, return_to),
            };

            // End of bucket, or the empty tail: follow the chain or move on.
            if slot >= BUCKET_SLOTS || bucket.tophash[slot] == EMPTY_REST {
                self.state = match bucket.overflow {
                    Some(next) => WalkState::Overflow {
                        bucket: next,
                        slot: 0,
                        return_to,
                    },
                    None => WalkState::Primary {
                        bucket: return_to,
                        slot: 0,
                    },
                };
                continue;
            }

            self.state = match self.state {
                WalkState::Primary { bucket, slot } => WalkState::Primary {
                    bucket,
                    slot: slot + 1,
                },
                WalkState::Overflow {
                    bucket,
                    slot,
                    return_to,
                } => WalkState::Overflow {
                    bucket,
                    slot: slot + 1,
                    return_to,
                },
                WalkState::Done => WalkState::Done,
            };

            if bucket.tophash[slot] == EMPTY_ONE {
                continue;
            }
            if let (Some(k), Some(v)) = (&bucket.keys[slot], &bucket.values[slot]) {
                self.emitted += 1;
                return Some((k, v));
            }
        }
    }
}

impl<'a, K: Hash + Eq, V, S: BuildHasher> IntoIterator for &'a BucketMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
