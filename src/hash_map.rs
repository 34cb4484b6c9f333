//! A swiss-table hash map.
//!
//! ## Design
//!
//! The table is a power-of-two-sized array of groups. Each group bundles
//! eight key-value slots with a packed 64-bit control word whose lanes
//! record, per slot: empty, tombstoned, or occupied together with a
//! 7-bit fingerprint of the occupying key's hash. Locating a key inside
//! a group is a single word-sized comparison against a broadcast of its
//! fingerprint followed by a key check on the (usually zero or one)
//! flagged lanes, which is the central win of the swiss layout: eight
//! slots are ruled in or out with a handful of integer ops and one cache
//! line.
//!
//! A 64-bit hash is split once: the low seven bits become the
//! fingerprint stored in the control lane, the remaining bits select the
//! home group by masking. Taking the fingerprint from bits that do not
//! feed the group index keeps fingerprints uncorrelated with placement,
//! so two keys in the same group rarely share a fingerprint.
//!
//! Collisions walk a triangular probe sequence (`home, home + 1,
//! home + 3, home + 6, ...`), which visits every group exactly once per
//! cycle over a power-of-two group count. The first hops stay close to
//! home for locality while later hops spread secondary clusters apart,
//! where plain linear probing would pile them up.
//!
//! Lookups stop at the first group containing an empty lane: an entry is
//! only ever placed along its probe path before the first empty lane, so
//! reaching one proves absence. This is also why removal cannot always
//! revert a lane to empty. If the group has no empty lane, other keys'
//! probe chains may be passing through it, and the lane becomes a
//! tombstone instead: free for reuse by inserts, but not a terminator
//! for lookups. A removal from a group that still has an empty lane can
//! safely revert to empty, which keeps tombstones from accumulating in
//! well-conditioned workloads.
//!
//! Groups count seven of their eight slots against capacity. The
//! headroom lane keeps empty lanes common enough that probe chains stay
//! short. When the populated count reaches capacity the table doubles:
//! a fresh all-empty group array is allocated and every live pair is
//! moved and re-placed under the same seed. Tombstones die in the move.
//!
//! ## Safety invariants
//!
//! All `unsafe` in this module rests on three facts:
//!
//! 1. A control lane with its sign bit clear (`FULL`) refers to an
//!    initialized slot; `EMPTY` and `DELETED` lanes never do. Every
//!    `assume_init_*` sits behind a mask derived from a control word,
//!    and `match_tag` can only flag `FULL` lanes (its false positives
//!    are confined to fingerprint bytes, which always have the sign bit
//!    clear).
//! 2. Probe indices are masked with `groups.len() - 1` and the group
//!    count is never zero, so group indexing is in bounds; lane indices
//!    come from bitmasks and are below eight.
//! 3. Moves out of slots (removal, draining, growth) clear or replace
//!    the corresponding control lane in the same operation, so no pair
//!    is ever read or dropped twice.

use alloc::boxed::Box;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::mem;

use crate::control::ControlWord;
use crate::control::DELETED;
use crate::control::EMPTY;
use crate::group::groups_for;
use crate::group::Group;
use crate::group::ProbeSeq;
use crate::group::GROUP_LOAD;
use crate::hash::RandomState;

/// Splits a hash into the probe-start half and the stored fingerprint.
///
/// The fingerprint keeps only the low seven bits so its sign bit is
/// clear, which is what distinguishes occupied control lanes from empty
/// and tombstoned ones.
#[inline(always)]
fn split_hash(hash: u64) -> (u64, u8) {
    (hash >> 7, (hash & 0x7f) as u8)
}

fn fresh_groups<K, V>(ngroups: usize) -> Box<[Group<K, V>]> {
    (0..ngroups).map(|_| Group::empty()).collect()
}

/// Where a probe for a key ended up.
enum RawEntry {
    /// The key is present at this (group, lane).
    Occupied(usize, usize),
    /// The key is absent; this (group, lane) is the earliest free lane
    /// on its probe path.
    Vacant(usize, usize),
}

/// A hash map backed by groups of eight slots with packed control
/// metadata, probed a whole group at a time.
///
/// Keys must implement `Hash + Eq`; the hasher builder `S` defaults to
/// [`RandomState`], which seeds each map from OS randomness.
///
/// # Examples
///
/// ```rust
/// use swiss_hash::HashMap;
///
/// let mut map = HashMap::new();
/// map.insert("answer", 42);
/// assert_eq!(map.get(&"answer"), Some(&42));
/// ```
pub struct HashMap<K, V, S = RandomState> {
    groups: Box<[Group<K, V>]>,
    populated: usize,
    state: S,
}

impl<K, V> HashMap<K, V, RandomState>
where
    K: Hash + Eq,
{
    /// Creates an empty map with the smallest capacity (one group, seven
    /// entries) and a freshly seeded [`RandomState`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let map: HashMap<u32, &str> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Creates an empty map able to hold at least `capacity` entries
    /// before growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let map: HashMap<u32, &str> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty map using the given hasher builder.
    pub fn with_hasher(state: S) -> Self {
        Self::with_capacity_and_hasher(0, state)
    }

    /// Creates an empty map able to hold at least `capacity` entries
    /// before growing, using the given hasher builder.
    ///
    /// The group organization rounds the backing storage up, so the
    /// resulting [`capacity`](Self::capacity) may exceed the request.
    pub fn with_capacity_and_hasher(capacity: usize, state: S) -> Self {
        HashMap {
            groups: fresh_groups(groups_for(capacity)),
            populated: 0,
            state,
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of entries the map can hold before its next
    /// growth: seven per group.
    pub fn capacity(&self) -> usize {
        self.groups.len() * GROUP_LOAD
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.groups.len() - 1
    }

    /// Removes all entries, keeping the allocated capacity.
    ///
    /// Every control word is reset to all-empty (tombstones included)
    /// and every live pair is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "one");
    /// let cap = map.capacity();
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), cap);
    /// ```
    pub fn clear(&mut self) {
        for group in self.groups.iter_mut() {
            if mem::needs_drop::<(K, V)>() {
                // SAFETY: control words track slot initialization
                // exactly (invariant 1), and the word is reset right
                // after so nothing is dropped twice.
                unsafe { group.drop_full_slots() };
            }
            group.ctrl = ControlWord::EMPTY_GROUP;
        }
        self.populated = 0;
    }

    /// Ensures the map can hold at least `additional` more entries
    /// without growing. Does nothing if the capacity already suffices.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map: HashMap<u32, u32> = HashMap::new();
    /// map.reserve(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let required = self.populated.saturating_add(additional);
        let ngroups = groups_for(required);
        if ngroups > self.groups.len() {
            self.resize_to(ngroups);
        }
    }

    /// Inserts a key-value pair, returning the previous value if the key
    /// was already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(7, "a"), None);
    /// assert_eq!(map.insert(7, "b"), Some("a"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.populated >= self.capacity() {
            self.grow();
        }
        let hash = self.state.hash_one(&key);
        match self.probe_entry(hash, &key) {
            RawEntry::Occupied(gi, lane) => {
                // SAFETY: occupied probe results are FULL lanes in
                // bounds (invariants 1 and 2).
                let slot = unsafe {
                    self.groups
                        .get_unchecked_mut(gi)
                        .slots
                        .get_unchecked_mut(lane)
                        .assume_init_mut()
                };
                Some(mem::replace(&mut slot.1, value))
            }
            RawEntry::Vacant(gi, lane) => {
                let (_, tag) = split_hash(hash);
                // SAFETY: vacant probe results are EMPTY or DELETED
                // lanes in bounds, free for claiming.
                unsafe { self.fill_slot(gi, lane, tag, key, value) };
                None
            }
        }
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "one");
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        if self.populated == 0 {
            return None;
        }
        let hash = self.state.hash_one(key);
        let (gi, lane) = self.probe_find(hash, key)?;
        // SAFETY: probe_find only reports FULL lanes in bounds.
        unsafe {
            Some(
                &self
                    .groups
                    .get_unchecked(gi)
                    .slots
                    .get_unchecked(lane)
                    .assume_init_ref()
                    .1,
            )
        }
    }

    /// Returns a mutable reference to the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, 10);
    /// if let Some(v) = map.get_mut(&1) {
    ///     *v += 1;
    /// }
    /// assert_eq!(map.get(&1), Some(&11));
    /// ```
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if self.populated == 0 {
            return None;
        }
        let hash = self.state.hash_one(key);
        let (gi, lane) = self.probe_find(hash, key)?;
        // SAFETY: probe_find only reports FULL lanes in bounds.
        unsafe {
            Some(
                &mut self
                    .groups
                    .get_unchecked_mut(gi)
                    .slots
                    .get_unchecked_mut(lane)
                    .assume_init_mut()
                    .1,
            )
        }
    }

    /// Returns the stored key and the value for `key`.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        if self.populated == 0 {
            return None;
        }
        let hash = self.state.hash_one(key);
        let (gi, lane) = self.probe_find(hash, key)?;
        // SAFETY: probe_find only reports FULL lanes in bounds.
        let pair = unsafe {
            self.groups
                .get_unchecked(gi)
                .slots
                .get_unchecked(lane)
                .assume_init_ref()
        };
        Some((&pair.0, &pair.1))
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key` from the map, returning its value if it was
    /// present. Removing an absent key is a no-op.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "one");
    /// assert_eq!(map.remove(&1), Some("one"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` from the map, returning the stored key and value if
    /// it was present.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        if self.populated == 0 {
            return None;
        }
        let hash = self.state.hash_one(key);
        let (gi, lane) = self.probe_find(hash, key)?;
        // SAFETY: probe_find only reports FULL lanes in bounds.
        Some(unsafe { self.remove_at(gi, lane) })
    }

    /// Returns the entry for `key`, ready for in-place inspection,
    /// insertion, or removal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// *map.entry("hits").or_insert(0) += 1;
    /// *map.entry("hits").or_insert(0) += 1;
    /// assert_eq!(map.get(&"hits"), Some(&2));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        if self.populated >= self.capacity() {
            self.grow();
        }
        let hash = self.state.hash_one(&key);
        let (_, tag) = split_hash(hash);
        match self.probe_entry(hash, &key) {
            RawEntry::Occupied(group, lane) => Entry::Occupied(OccupiedEntry {
                map: self,
                group,
                lane,
            }),
            RawEntry::Vacant(group, lane) => Entry::Vacant(VacantEntry {
                map: self,
                key,
                tag,
                group,
                lane,
            }),
        }
    }

    /// Returns an iterator over `(&K, &V)` pairs.
    ///
    /// The order is group-major and lane-ascending: unspecified but
    /// stable for a table that is not mutated in between.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, 2);
    /// map.insert(3, 4);
    /// assert_eq!(map.iter().count(), 2);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            groups: self.groups.iter(),
            front: None,
            remaining: self.populated,
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Removes and yields every pair, leaving the map empty with its
    /// capacity intact.
    ///
    /// Dropping the iterator drops the pairs it has not yielded.
    /// Leaking it (`mem::forget`) leaks them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "one");
    /// let pairs: Vec<_> = map.drain().collect();
    /// assert_eq!(pairs, [(1, "one")]);
    /// assert!(map.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<K, V> {
        let ngroups = self.groups.len();
        let old = mem::replace(&mut self.groups, fresh_groups(ngroups));
        let remaining = self.populated;
        self.populated = 0;
        Drain {
            groups: old.into_vec().into_iter(),
            front: None,
            remaining,
        }
    }

    /// Walks the probe sequence for a present key. Returns the (group,
    /// lane) of the match, or `None` once a group with an empty lane
    /// proves absence.
    ///
    /// The walk is additionally capped at one visit per group: a table
    /// whose free lanes are all tombstones has no empty lane to stop at,
    /// and the cap turns that pathology into a full scan instead of a
    /// cycle.
    #[inline]
    fn probe_find(&self, hash: u64, key: &K) -> Option<(usize, usize)> {
        let (h1, tag) = split_hash(hash);
        let mut probe = ProbeSeq::new(h1 as usize, self.mask());
        for _ in 0..self.groups.len() {
            // SAFETY: the probe index is masked to the group count
            // (invariant 2).
            let group = unsafe { self.groups.get_unchecked(probe.index) };
            for lane in group.ctrl.match_tag(tag) {
                // SAFETY: flagged lanes always have a clear sign bit,
                // i.e. are FULL, so the slot is initialized
                // (invariant 1).
                let slot = unsafe { group.slots.get_unchecked(lane).assume_init_ref() };
                if slot.0 == *key {
                    return Some((probe.index, lane));
                }
            }
            if group.ctrl.mask_empty().any() {
                return None;
            }
            probe.advance();
        }
        None
    }

    /// Walks the probe sequence for an insert: either the key's current
    /// lane, or the earliest free (empty or tombstoned) lane on its
    /// path. Callers must have made room first, so a free lane always
    /// exists.
    #[inline]
    fn probe_entry(&self, hash: u64, key: &K) -> RawEntry {
        debug_assert!(self.populated < self.capacity());
        let (h1, tag) = split_hash(hash);
        let mut probe = ProbeSeq::new(h1 as usize, self.mask());
        let mut free = None;
        for _ in 0..self.groups.len() {
            // SAFETY: the probe index is masked to the group count
            // (invariant 2).
            let group = unsafe { self.groups.get_unchecked(probe.index) };
            for lane in group.ctrl.match_tag(tag) {
                // SAFETY: flagged lanes are FULL, so the slot is
                // initialized (invariant 1).
                let slot = unsafe { group.slots.get_unchecked(lane).assume_init_ref() };
                if slot.0 == *key {
                    return RawEntry::Occupied(probe.index, lane);
                }
            }
            if free.is_none() {
                let lanes = group.ctrl.mask_empty_or_deleted();
                if lanes.any() {
                    free = Some((probe.index, lanes.first()));
                }
            }
            let empties = group.ctrl.mask_empty();
            if empties.any() {
                // The key cannot live past a group with an empty lane;
                // claim the earliest free lane seen on the way here.
                let (gi, lane) = free.unwrap_or((probe.index, empties.first()));
                return RawEntry::Vacant(gi, lane);
            }
            probe.advance();
        }
        // Every group was visited without meeting an empty lane, so
        // every free lane in the table is a tombstone; the walk recorded
        // the first one. `free` can only be `None` on a table with no
        // free lane at all, which the capacity check before any insert
        // rules out.
        match free {
            Some((gi, lane)) => RawEntry::Vacant(gi, lane),
            None => unreachable!("probing a table with no free lane"),
        }
    }

    /// Writes a pair into a free lane and marks it occupied.
    ///
    /// # Safety
    ///
    /// `(gi, lane)` must be in bounds and its control byte must be
    /// `EMPTY` or `DELETED`.
    #[inline]
    unsafe fn fill_slot(&mut self, gi: usize, lane: usize, tag: u8, key: K, value: V) {
        // SAFETY: per the contract, the lane is free: writing does not
        // overwrite a live pair, and marking it FULL upholds
        // invariant 1.
        unsafe {
            let group = self.groups.get_unchecked_mut(gi);
            group.slots.get_unchecked_mut(lane).write((key, value));
            group.ctrl.set(lane, tag);
        }
        self.populated += 1;
    }

    /// Moves the pair out of an occupied lane and frees it, choosing
    /// between a true empty and a tombstone.
    ///
    /// # Safety
    ///
    /// `(gi, lane)` must be in bounds and its control byte must be
    /// `FULL`.
    #[inline]
    unsafe fn remove_at(&mut self, gi: usize, lane: usize) -> (K, V) {
        // SAFETY: per the contract the lane is FULL, so the slot holds
        // an initialized pair; the control byte is rewritten in the same
        // operation so the pair cannot be read again (invariant 3).
        unsafe {
            let group = self.groups.get_unchecked_mut(gi);
            let pair = group.slots.get_unchecked(lane).assume_init_read();
            // With an empty lane still present, no probe chain depends
            // on this group being scanned past; without one, the lane
            // must keep chains alive as a tombstone.
            let byte = if group.ctrl.mask_empty().any() {
                EMPTY
            } else {
                DELETED
            };
            group.ctrl.set(lane, byte);
            self.populated -= 1;
            pair
        }
    }

    #[cold]
    fn grow(&mut self) {
        self.resize_to(self.groups.len() * 2);
    }

    /// Replaces the group array with a fresh one of `ngroups` groups and
    /// re-places every live pair under the unchanged seed. Tombstones
    /// are not carried over.
    fn resize_to(&mut self, ngroups: usize) {
        debug_assert!(ngroups.is_power_of_two());
        debug_assert!(ngroups * GROUP_LOAD >= self.populated);
        let old = mem::replace(&mut self.groups, fresh_groups(ngroups));
        // Ownership: each pair is moved out of the old array exactly
        // once (one read per FULL lane) and written into the new array
        // exactly once. The old groups are then dropped as plain
        // storage; slots are MaybeUninit, so the moved-out pairs are not
        // dropped with them.
        for group in old.into_vec() {
            for lane in group.ctrl.mask_full() {
                // SAFETY: FULL lanes of the old array hold initialized
                // pairs (invariant 1), and each is read once.
                let (key, value) = unsafe { group.slots.get_unchecked(lane).assume_init_read() };
                let hash = self.state.hash_one(&key);
                let (_, tag) = split_hash(hash);
                let (gi, free_lane) = self.find_free_slot(hash);
                // SAFETY: find_free_slot returns a free lane in bounds.
                unsafe {
                    let target = self.groups.get_unchecked_mut(gi);
                    target
                        .slots
                        .get_unchecked_mut(free_lane)
                        .write((key, value));
                    target.ctrl.set(free_lane, tag);
                }
            }
        }
    }

    /// Finds the first free lane along a hash's probe path. Only called
    /// while re-placing entries into an array with spare capacity, so
    /// the walk always terminates.
    #[inline]
    fn find_free_slot(&self, hash: u64) -> (usize, usize) {
        let (h1, _) = split_hash(hash);
        let mut probe = ProbeSeq::new(h1 as usize, self.mask());
        loop {
            // SAFETY: the probe index is masked to the group count
            // (invariant 2).
            let group = unsafe { self.groups.get_unchecked(probe.index) };
            let lanes = group.ctrl.mask_empty_or_deleted();
            if lanes.any() {
                return (probe.index, lanes.first());
            }
            probe.advance();
        }
    }
}

#[cfg(test)]
impl<K, V, S> HashMap<K, V, S> {
    /// Raw control words, group-major. Test-only.
    pub(crate) fn raw_control_words(&self) -> alloc::vec::Vec<u64> {
        self.groups.iter().map(|group| group.ctrl.bits()).collect()
    }

    pub(crate) fn ngroups(&self) -> usize {
        self.groups.len()
    }
}

impl<K, V, S> Drop for HashMap<K, V, S> {
    fn drop(&mut self) {
        if mem::needs_drop::<(K, V)>() && self.populated > 0 {
            for group in self.groups.iter_mut() {
                // SAFETY: control words track slot initialization
                // exactly (invariant 1); the map is not used again.
                unsafe { group.drop_full_slots() };
            }
        }
    }
}

impl<K, V, S> Clone for HashMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        HashMap {
            groups: self.groups.clone(),
            populated: self.populated,
            state: self.state.clone(),
        }
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug + Hash + Eq,
    V: Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

/// A view into a single map entry, occupied or vacant.
///
/// Constructed by [`HashMap::entry`].
pub enum Entry<'a, K, V, S = RandomState> {
    /// The key is absent.
    Vacant(VacantEntry<'a, K, V, S>),
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, S>),
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts `default` if vacant; returns a mutable reference to the
    /// value either way.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the closure's result if vacant; returns a mutable
    /// reference to the value either way.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to the value if occupied, then returns the entry.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to the entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
    V: Default,
{
    /// Inserts `V::default()` if vacant; returns a mutable reference to
    /// the value either way.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant map entry.
///
/// Holds the key and the free (group, lane) the probe settled on; the
/// exclusive borrow of the map keeps both valid until consumed.
pub struct VacantEntry<'a, K, V, S = RandomState> {
    map: &'a mut HashMap<K, V, S>,
    key: K,
    tag: u8,
    group: usize,
    lane: usize,
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S> {
    /// Returns a reference to the key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes the key back out of the entry.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let map = self.map;
        map.populated += 1;
        // SAFETY: the probe located this free lane in bounds, and the
        // exclusive borrow means the map has not changed since.
        unsafe {
            let group = map.groups.get_unchecked_mut(self.group);
            group
                .slots
                .get_unchecked_mut(self.lane)
                .write((self.key, value));
            group.ctrl.set(self.lane, self.tag);
            &mut group
                .slots
                .get_unchecked_mut(self.lane)
                .assume_init_mut()
                .1
        }
    }
}

// Safety invariant for OccupiedEntry: it is only constructed from a
// probe that found a FULL lane, and it holds the map exclusively, so
// (group, lane) stays a valid initialized slot for its whole lifetime.
/// A view into an occupied map entry.
pub struct OccupiedEntry<'a, K, V, S = RandomState> {
    map: &'a mut HashMap<K, V, S>,
    group: usize,
    lane: usize,
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline(always)]
    fn pair(&self) -> &(K, V) {
        // SAFETY: see the invariant note above.
        unsafe {
            self.map
                .groups
                .get_unchecked(self.group)
                .slots
                .get_unchecked(self.lane)
                .assume_init_ref()
        }
    }

    /// Returns a reference to the entry's key.
    pub fn key(&self) -> &K {
        &self.pair().0
    }

    /// Returns a reference to the value.
    pub fn get(&self) -> &V {
        &self.pair().1
    }

    /// Returns a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: see the invariant note above.
        unsafe {
            &mut self
                .map
                .groups
                .get_unchecked_mut(self.group)
                .slots
                .get_unchecked_mut(self.lane)
                .assume_init_mut()
                .1
        }
    }

    /// Converts the entry into a mutable reference tied to the map.
    pub fn into_mut(self) -> &'a mut V {
        let map = self.map;
        // SAFETY: see the invariant note above.
        unsafe {
            &mut map
                .groups
                .get_unchecked_mut(self.group)
                .slots
                .get_unchecked_mut(self.lane)
                .assume_init_mut()
                .1
        }
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, returning its value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry, returning the key and value.
    pub fn remove_entry(self) -> (K, V) {
        // SAFETY: see the invariant note above.
        unsafe { self.map.remove_at(self.group, self.lane) }
    }
}

/// A borrowing iterator over a map's pairs, group-major.
///
/// Constructed by [`HashMap::iter`].
pub struct Iter<'a, K, V> {
    groups: core::slice::Iter<'a, Group<K, V>>,
    front: Option<(&'a Group<K, V>, crate::control::BitMask)>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((group, lanes)) = &mut self.front {
                let group: &'a Group<K, V> = *group;
                if let Some(lane) = lanes.next() {
                    self.remaining -= 1;
                    // SAFETY: the lane came from the group's FULL mask,
                    // taken while the map was already borrowed shared,
                    // so the slot is initialized and stays so.
                    let pair = unsafe { group.slots.get_unchecked(lane).assume_init_ref() };
                    return Some((&pair.0, &pair.1));
                }
            }
            let group = self.groups.next()?;
            self.front = Some((group, group.ctrl.mask_full()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// An iterator over a map's keys.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over a map's values.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A draining iterator over a map's pairs.
///
/// Constructed by [`HashMap::drain`]; owns the drained storage, so it
/// carries no borrow of the map.
pub struct Drain<K, V> {
    groups: alloc::vec::IntoIter<Group<K, V>>,
    front: Option<Group<K, V>>,
    remaining: usize,
}

impl<K, V> Iterator for Drain<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(group) = &mut self.front {
                let lanes = group.ctrl.mask_full();
                if lanes.any() {
                    let lane = lanes.first();
                    // The lane is cleared before the pair moves out, so
                    // a later drop of this group cannot touch it again.
                    group.ctrl.set(lane, EMPTY);
                    self.remaining -= 1;
                    // SAFETY: the lane was FULL in storage taken intact
                    // out of a map, so the slot is initialized; it is
                    // read exactly once (the control byte was just
                    // cleared).
                    let pair = unsafe { group.slots.get_unchecked(lane).assume_init_read() };
                    return Some(pair);
                }
            }
            self.front = Some(self.groups.next()?);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> Drop for Drain<K, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}
