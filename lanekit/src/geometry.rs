use smallvec::{SmallVec, smallvec};

use crate::store::{Key, MeasurementStore};
use crate::{EngineOptions, VirtualItem, VirtualRange};

/// The ordered measurement list for all items, in list space: starts include
/// `padding_start` but not `scroll_margin` (the engine shifts by the margin
/// at its query boundary).
///
/// Rebuilds are incremental: entries before the earliest invalidated index
/// are reused as-is and only the suffix is recomputed, so the cost of a
/// measurement near the viewport is proportional to the items after it, not
/// to the total count.
#[derive(Clone, Debug)]
pub(crate) struct Geometry<K> {
    items: Vec<VirtualItem<K>>,
    content_end: u64,
}

impl<K: Key> Geometry<K> {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            content_end: 0,
        }
    }

    pub(crate) fn items(&self) -> &[VirtualItem<K>] {
        &self.items
    }

    /// End offset of the furthest lane (list space), `padding_start` when
    /// there are no items.
    pub(crate) fn content_end(&self) -> u64 {
        self.content_end
    }

    pub(crate) fn rebuild(
        &mut self,
        opts: &EngineOptions<K>,
        store: &mut MeasurementStore<K>,
        from: usize,
    ) {
        let count = opts.count;
        let lanes = opts.lanes.max(1);
        let padding_start = opts.padding_start as u64;
        let gap = opts.gap as u64;

        let keep = from.min(self.items.len()).min(count);
        self.items.truncate(keep);

        // Recover each lane's running end from the surviving prefix.
        let mut lane_ends: SmallVec<[Option<u64>; 8]> = smallvec![None; lanes];
        let mut seen = 0usize;
        for it in self.items.iter().rev() {
            if let Some(slot) = lane_ends.get_mut(it.lane) {
                if slot.is_none() {
                    *slot = Some(it.end());
                    seen += 1;
                    if seen == lanes {
                        break;
                    }
                }
            }
        }

        self.items.reserve(count.saturating_sub(self.items.len()));
        for i in keep..count {
            let key = (opts.get_item_key)(i);
            let size = store
                .size_for(&key)
                .unwrap_or_else(|| (opts.estimate_size)(i));
            let lane = if lanes == 1 {
                0
            } else {
                match store.lane_for(&key) {
                    Some(l) if l < lanes => l,
                    cached => {
                        // A cached lane from an older lane count is discarded
                        // and recomputed, never clamped.
                        if cached.is_some() {
                            store.discard_lane(&key);
                        }
                        if opts.defer_lane_assignment && store.is_measured(&key) {
                            let l = shortest_lane(&lane_ends);
                            store.assign_lane(key.clone(), l);
                            l
                        } else {
                            i % lanes
                        }
                    }
                }
            };
            let start = match lane_ends[lane] {
                Some(end) => end.saturating_add(gap),
                None => padding_start,
            };
            let item = VirtualItem {
                index: i,
                key,
                lane,
                start,
                size,
            };
            lane_ends[lane] = Some(item.end());
            self.items.push(item);
        }

        self.content_end = lane_ends
            .iter()
            .flatten()
            .copied()
            .max()
            .unwrap_or(padding_start);
    }

    /// Rightmost item whose start does not exceed `offset` (list space).
    ///
    /// Offsets inside a gap map to the item before the gap. With multiple
    /// lanes several items can overlap one offset; this returns the
    /// highest-indexed candidate.
    pub(crate) fn index_at(&self, offset: u64) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        let idx = self.items.partition_point(|it| it.start <= offset);
        Some(idx.saturating_sub(1).min(self.items.len() - 1))
    }

    /// Minimal contiguous index interval covering every item that intersects
    /// `[offset, view_end)`, in list space.
    ///
    /// Finding the anchor is a binary search over item starts; the scan to
    /// the interval's edges is bounded by the number of visible items (plus
    /// one boundary item per lane), not by the total count.
    pub(crate) fn visible_range(&self, offset: u64, view_end: u64, lanes: usize) -> VirtualRange {
        let len = self.items.len();
        if len == 0 || view_end <= offset {
            return VirtualRange {
                start_index: 0,
                end_index: 0,
            };
        }

        let anchor = self
            .items
            .partition_point(|it| it.start <= offset)
            .saturating_sub(1)
            .min(len - 1);

        let mut start = anchor;
        let mut end = anchor + 1;

        if lanes > 1 {
            // Starts are only monotonic within a lane, so widen in both
            // directions until every lane has crossed the viewport boundary.
            let mut lane_starts: SmallVec<[u64; 8]> = smallvec![u64::MAX; lanes];
            let mut i = anchor;
            loop {
                let it = &self.items[i];
                if let Some(s) = lane_starts.get_mut(it.lane) {
                    *s = it.start;
                }
                start = i;
                if i == 0 || lane_starts.iter().all(|&s| s <= offset) {
                    break;
                }
                i -= 1;
            }

            let mut lane_ends: SmallVec<[u64; 8]> = smallvec![0u64; lanes];
            while end < len && lane_ends.iter().any(|&e| e < view_end) {
                let it = &self.items[end];
                if let Some(e) = lane_ends.get_mut(it.lane) {
                    *e = it.end();
                }
                end += 1;
            }
        } else {
            while end < len && self.items[end].start < view_end {
                end += 1;
            }
        }

        // Shrink to the minimal interval whose edge items are visible.
        while start < end && !self.is_visible(start, offset, view_end) {
            start += 1;
        }
        while end > start && !self.is_visible(end - 1, offset, view_end) {
            end -= 1;
        }

        VirtualRange {
            start_index: start,
            end_index: end,
        }
    }

    fn is_visible(&self, i: usize, offset: u64, view_end: u64) -> bool {
        let it = &self.items[i];
        it.start < view_end && it.end() > offset
    }
}

fn shortest_lane(lane_ends: &[Option<u64>]) -> usize {
    let mut best = 0usize;
    let mut best_end = u64::MAX;
    for (lane, end) in lane_ends.iter().enumerate() {
        let end = end.unwrap_or(0);
        if end < best_end {
            best = lane;
            best_end = end;
        }
    }
    best
}
