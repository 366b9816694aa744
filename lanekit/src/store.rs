use rustc_hash::FxHashMap;

/// Key requirements for the measurement and lane-assignment caches.
pub trait Key: core::hash::Hash + Eq + Clone {}
impl<K: core::hash::Hash + Eq + Clone> Key for K {}

/// Per-key caches of observed item sizes and committed lane assignments,
/// plus the earliest index invalidated since the last geometry rebuild.
///
/// Sizes enter the store only through real measurement, never estimation, and
/// a cached size always takes precedence over the estimator for that key.
/// Entries survive until an explicit reset.
#[derive(Clone, Debug)]
pub(crate) struct MeasurementStore<K> {
    sizes: FxHashMap<K, u32>,
    lanes: FxHashMap<K, usize>,
    dirty_from: Option<usize>,
}

impl<K: Key> MeasurementStore<K> {
    pub(crate) fn new() -> Self {
        Self {
            sizes: FxHashMap::default(),
            lanes: FxHashMap::default(),
            dirty_from: Some(0),
        }
    }

    pub(crate) fn size_for(&self, key: &K) -> Option<u32> {
        self.sizes.get(key).copied()
    }

    pub(crate) fn is_measured(&self, key: &K) -> bool {
        self.sizes.contains_key(key)
    }

    /// Records a measured size. Returns `true` when the cached value changed.
    pub(crate) fn record_size(&mut self, key: K, size: u32) -> bool {
        self.sizes.insert(key, size) != Some(size)
    }

    pub(crate) fn size_cache_len(&self) -> usize {
        self.sizes.len()
    }

    pub(crate) fn for_each_size(&self, mut f: impl FnMut(&K, u32)) {
        for (k, v) in self.sizes.iter() {
            f(k, *v);
        }
    }

    pub(crate) fn lane_for(&self, key: &K) -> Option<usize> {
        self.lanes.get(key).copied()
    }

    pub(crate) fn assign_lane(&mut self, key: K, lane: usize) {
        self.lanes.insert(key, lane);
    }

    pub(crate) fn discard_lane(&mut self, key: &K) {
        self.lanes.remove(key);
    }

    pub(crate) fn lane_cache_len(&self) -> usize {
        self.lanes.len()
    }

    /// Discards every committed lane assignment. Required whenever the lane
    /// count changes: an assignment made under `k` lanes is not valid under
    /// `k'` lanes and must be recomputed, not clamped.
    pub(crate) fn clear_lanes(&mut self) {
        self.lanes.clear();
    }

    /// Forgets all measured sizes and lane assignments, forcing a full
    /// remeasurement pass.
    pub(crate) fn reset(&mut self) {
        self.sizes.clear();
        self.lanes.clear();
        self.mark_dirty_from(0);
    }

    /// Replaces the size cache wholesale (cache import).
    pub(crate) fn replace_sizes(&mut self, entries: impl IntoIterator<Item = (K, u32)>) -> usize {
        self.sizes.clear();
        let mut n = 0usize;
        for (k, v) in entries {
            self.sizes.insert(k, v);
            n += 1;
        }
        self.mark_dirty_from(0);
        n
    }

    /// Widens the invalidated suffix to include `index`.
    pub(crate) fn mark_dirty_from(&mut self, index: usize) {
        self.dirty_from = Some(match self.dirty_from {
            Some(cur) => cur.min(index),
            None => index,
        });
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty_from.is_some()
    }

    /// Takes the earliest invalidated index, leaving the store clean.
    pub(crate) fn take_dirty(&mut self) -> Option<usize> {
        self.dirty_from.take()
    }
}
