use std::cell::Cell;
use std::cmp;
use std::sync::Arc;

use crate::geometry::Geometry;
use crate::store::{Key, MeasurementStore};
use crate::{
    Align, ConfigError, EngineOptions, IndexEmitter, ItemKey, Range, Rect, ScrollBehavior,
    ScrollDirection, VirtualItem, VirtualRange,
};

/// A `scroll_to_index` request whose target size was still an estimate.
///
/// Re-issued exactly once, the first time the target's key shows up in the
/// size cache; replaced (not stacked) by later requests.
#[derive(Clone, Copy, Debug)]
struct PendingScroll {
    index: usize,
    align: Align,
    behavior: ScrollBehavior,
}

/// A resolved programmatic scroll for an adapter to carry out on its host.
///
/// Only the most recent request is kept; an adapter drains it with
/// [`Virtualizer::take_scroll_request`] after driving the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollRequest {
    pub offset: u64,
    pub behavior: ScrollBehavior,
}

/// A headless virtualization engine for lists, grids and masonry layouts.
///
/// The engine owns all state exclusively: the measurement store, the lane
/// assignments, the derived geometry and the scroll state. It holds no UI
/// objects; an adapter drives it with viewport rects, scroll offsets and
/// element measurements, and reads back which items to materialize.
///
/// Derived state is recomputed lazily from the earliest invalidated index and
/// is always consistent by the time `on_change` fires or a query returns:
/// consumers never observe a geometry and a range computed from different
/// size-cache snapshots.
#[derive(Clone, Debug)]
pub struct Virtualizer<K = ItemKey> {
    options: EngineOptions<K>,
    store: MeasurementStore<K>,
    geometry: Geometry<K>,

    scroll_rect: Rect,
    viewport_size: u32,
    scroll_offset: u64,
    is_scrolling: bool,
    scroll_direction: Option<ScrollDirection>,
    last_scroll_event_ms: Option<u64>,

    /// Compensation applied to the scroll position while a scroll is in
    /// flight, so repeated corrections compose instead of overwriting each
    /// other. Reset when scrolling stops.
    scroll_adjustments: i64,
    pending_scroll: Option<PendingScroll>,
    scroll_request: Option<ScrollRequest>,

    notify_depth: Cell<usize>,
    notify_pending: Cell<bool>,
}

impl<K: Key> Virtualizer<K> {
    /// Creates a new engine from validated options.
    ///
    /// `options.initial_rect` and `options.initial_offset` are applied
    /// immediately.
    pub fn new(options: EngineOptions<K>) -> Result<Self, ConfigError> {
        options.validate()?;
        let scroll_rect = options.initial_rect.unwrap_or_default();
        let scroll_offset = options.initial_offset.resolve();
        ldebug!(
            count = options.count,
            lanes = options.lanes,
            overscan = options.overscan,
            "Virtualizer::new"
        );
        let mut v = Self {
            viewport_size: scroll_rect.main(options.horizontal),
            scroll_rect,
            scroll_offset,
            is_scrolling: false,
            scroll_direction: None,
            last_scroll_event_ms: None,
            scroll_adjustments: 0,
            pending_scroll: None,
            scroll_request: None,
            store: MeasurementStore::new(),
            geometry: Geometry::new(),
            options,
            notify_depth: Cell::new(0),
            notify_pending: Cell::new(false),
        };
        v.flush();
        Ok(v)
    }

    pub fn options(&self) -> &EngineOptions<K> {
        &self.options
    }

    pub fn count(&self) -> usize {
        self.options.count
    }

    pub fn lanes(&self) -> usize {
        self.options.lanes
    }

    pub fn enabled(&self) -> bool {
        self.options.enabled
    }

    pub fn key_for(&self, index: usize) -> K {
        (self.options.get_item_key)(index)
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    /// Replaces the configuration, invalidating only what actually changed:
    /// a count change keeps the unaffected measurement prefix, a lane-count
    /// or packing-policy change discards all lane assignments.
    pub fn set_options(&mut self, options: EngineOptions<K>) -> Result<(), ConfigError> {
        options.validate()?;

        let prev = &self.options;
        let count_changed = options.count != prev.count;
        let dirty_from_count = cmp::min(options.count, prev.count);
        let lanes_changed =
            options.lanes != prev.lanes || options.defer_lane_assignment != prev.defer_lane_assignment;
        let closures_changed = !Arc::ptr_eq(&options.estimate_size, &prev.estimate_size)
            || !Arc::ptr_eq(&options.get_item_key, &prev.get_item_key);
        let layout_changed = options.gap != prev.gap || options.padding_start != prev.padding_start;
        let was_enabled = prev.enabled;

        self.options = options;
        ltrace!(
            count = self.options.count,
            lanes = self.options.lanes,
            enabled = self.options.enabled,
            "Virtualizer::set_options"
        );

        if lanes_changed {
            self.store.clear_lanes();
        }
        if lanes_changed || closures_changed || layout_changed {
            self.store.mark_dirty_from(0);
        } else if count_changed {
            self.store.mark_dirty_from(dirty_from_count);
        }

        self.viewport_size = self.scroll_rect.main(self.options.horizontal);

        if !self.options.enabled {
            self.reset_scroll_state();
        } else if !was_enabled {
            self.reset_to_initial();
        }

        self.notify();
        Ok(())
    }

    /// Clones the current options, applies `f`, then delegates to
    /// `set_options`.
    pub fn update_options(
        &mut self,
        f: impl FnOnce(&mut EngineOptions<K>),
    ) -> Result<(), ConfigError> {
        let mut next = self.options.clone();
        f(&mut next);
        self.set_options(next)
    }

    pub fn set_count(&mut self, count: usize) {
        if self.options.count == count {
            return;
        }
        let dirty_from = cmp::min(self.options.count, count);
        self.options.count = count;
        self.store.mark_dirty_from(dirty_from);
        self.notify();
    }

    /// Changes the lane count, discarding every cached lane assignment so no
    /// stale lane index can leak into the new layout.
    pub fn set_lanes(&mut self, lanes: usize) -> Result<(), ConfigError> {
        if lanes == 0 {
            return Err(ConfigError::ZeroLanes);
        }
        if self.options.lanes == lanes {
            return Ok(());
        }
        self.options.lanes = lanes;
        self.store.clear_lanes();
        self.store.mark_dirty_from(0);
        self.notify();
        Ok(())
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.options.overscan = overscan;
        self.notify();
    }

    pub fn set_padding(&mut self, padding_start: u32, padding_end: u32) {
        if self.options.padding_start != padding_start {
            self.store.mark_dirty_from(0);
        }
        self.options.padding_start = padding_start;
        self.options.padding_end = padding_end;
        self.notify();
    }

    pub fn set_scroll_padding(&mut self, start: u32, end: u32) {
        self.options.scroll_padding_start = start;
        self.options.scroll_padding_end = end;
        self.notify();
    }

    pub fn set_scroll_margin(&mut self, scroll_margin: u32) {
        self.options.scroll_margin = scroll_margin;
        self.notify();
    }

    pub fn set_gap(&mut self, gap: u32) {
        if self.options.gap == gap {
            return;
        }
        self.options.gap = gap;
        self.store.mark_dirty_from(0);
        self.notify();
    }

    pub fn set_estimate_size(&mut self, f: impl Fn(usize) -> u32 + Send + Sync + 'static) {
        self.options.estimate_size = Arc::new(f);
        self.store.mark_dirty_from(0);
        self.notify();
    }

    pub fn set_get_item_key(&mut self, f: impl Fn(usize) -> K + Send + Sync + 'static) {
        self.options.get_item_key = Arc::new(f);
        self.store.mark_dirty_from(0);
        self.notify();
    }

    /// Re-reads every item's key from the current mapping. Call this after
    /// the dataset is reordered in place while the `get_item_key` closure
    /// itself stays the same; cached measurements follow their keys.
    pub fn sync_item_keys(&mut self) {
        self.store.mark_dirty_from(0);
        self.notify();
    }

    pub fn set_range_extractor(
        &mut self,
        f: Option<impl Fn(Range, &mut dyn FnMut(usize)) + Send + Sync + 'static>,
    ) {
        self.options.range_extractor = f.map(|f| Arc::new(f) as _);
        self.notify();
    }

    pub fn set_on_change(
        &mut self,
        on_change: Option<impl Fn(&Virtualizer<K>, bool) + Send + Sync + 'static>,
    ) {
        self.options.on_change = on_change.map(|f| Arc::new(f) as _);
        self.notify();
    }

    pub fn set_perform_scroll(
        &mut self,
        perform_scroll: Option<impl Fn(u64, ScrollBehavior) + Send + Sync + 'static>,
    ) {
        self.options.perform_scroll = perform_scroll.map(|f| Arc::new(f) as _);
        self.notify();
    }

    pub fn set_scrolling_reset_delay_ms(&mut self, delay_ms: u64) {
        self.options.scrolling_reset_delay_ms = delay_ms;
        self.notify();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.options.enabled == enabled {
            return;
        }
        self.options.enabled = enabled;
        if enabled {
            self.reset_to_initial();
        } else {
            self.reset_scroll_state();
        }
        self.notify();
    }

    fn reset_to_initial(&mut self) {
        self.scroll_offset = self.options.initial_offset.resolve();
        self.scroll_rect = self.options.initial_rect.unwrap_or_default();
        self.viewport_size = self.scroll_rect.main(self.options.horizontal);
        self.is_scrolling = false;
        self.scroll_direction = None;
        self.last_scroll_event_ms = None;
        self.scroll_adjustments = 0;
    }

    fn reset_scroll_state(&mut self) {
        self.viewport_size = 0;
        self.scroll_rect = Rect::default();
        self.scroll_offset = self.options.initial_offset.resolve();
        self.is_scrolling = false;
        self.scroll_direction = None;
        self.last_scroll_event_ms = None;
        self.scroll_adjustments = 0;
        self.pending_scroll = None;
    }

    // ------------------------------------------------------------------
    // Notification
    // ------------------------------------------------------------------

    fn notify_now(&self) {
        if let Some(cb) = &self.options.on_change {
            cb(self, self.is_scrolling);
        }
    }

    fn notify(&mut self) {
        // Derived state is brought up to date strictly before anyone can
        // observe it, even when the notification itself is coalesced.
        self.flush();
        if self.notify_depth.get() > 0 {
            self.notify_pending.set(true);
            return;
        }
        self.notify_now();
    }

    /// Batches multiple updates into a single `on_change` notification.
    ///
    /// Recommended for adapters: a typical frame updates the rect, the
    /// offset and the scrolling flag together, and the callback may drive
    /// rendering.
    pub fn batch_update(&mut self, f: impl FnOnce(&mut Self)) {
        let depth = self.notify_depth.get();
        self.notify_depth.set(depth.saturating_add(1));

        f(self);

        let depth = self.notify_depth.get();
        debug_assert!(depth > 0, "notify_depth underflow");
        let next = depth.saturating_sub(1);
        self.notify_depth.set(next);

        if next == 0 && self.notify_pending.replace(false) {
            self.flush();
            self.notify_now();
        }
    }

    fn flush(&mut self) {
        let stale = self.geometry.items().len() != self.options.count;
        if self.store.is_dirty() || stale {
            let from = self.store.take_dirty().unwrap_or(0);
            Geometry::rebuild(&mut self.geometry, &self.options, &mut self.store, from);
        }
    }

    fn geometry(&self) -> &Geometry<K> {
        debug_assert!(
            !self.store.is_dirty() && self.geometry.items().len() == self.options.count,
            "geometry queried while stale"
        );
        &self.geometry
    }

    // ------------------------------------------------------------------
    // Viewport & scroll state
    // ------------------------------------------------------------------

    pub fn viewport_size(&self) -> u32 {
        self.viewport_size
    }

    pub fn scroll_rect(&self) -> Rect {
        self.scroll_rect
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling
    }

    pub fn scroll_direction(&self) -> Option<ScrollDirection> {
        self.scroll_direction
    }

    /// Net scroll compensation applied by `resize_item` since the current
    /// scroll started. Resets to 0 when scrolling stops, so hosts can
    /// subtract it when reconciling their own offset.
    pub fn pending_adjustment(&self) -> i64 {
        self.scroll_adjustments
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    /// Current offset relative to the list origin (net of `scroll_margin`).
    pub fn scroll_offset_in_list(&self) -> u64 {
        self.scroll_offset
            .saturating_sub(self.options.scroll_margin as u64)
    }

    pub fn set_scroll_rect(&mut self, rect: Rect) {
        if self.scroll_rect == rect {
            return;
        }
        self.scroll_rect = rect;
        self.viewport_size = rect.main(self.options.horizontal);
        self.notify();
    }

    /// Sets the main-axis viewport dimension, leaving the cross axis as-is.
    pub fn set_viewport_size(&mut self, size: u32) {
        let mut rect = self.scroll_rect;
        if self.options.horizontal {
            rect.width = size;
        } else {
            rect.height = size;
        }
        self.set_scroll_rect(rect);
    }

    pub fn set_scroll_offset(&mut self, offset: u64) {
        if self.apply_offset(offset) {
            self.notify();
        }
    }

    pub fn set_scroll_offset_clamped(&mut self, offset: u64) {
        let clamped = self.clamp_scroll_offset(offset);
        self.set_scroll_offset(clamped);
    }

    fn apply_offset(&mut self, offset: u64) -> bool {
        if self.scroll_offset == offset {
            return false;
        }
        let prev = self.scroll_offset;
        self.scroll_offset = offset;
        self.scroll_direction = match offset.cmp(&prev) {
            cmp::Ordering::Greater => Some(ScrollDirection::Forward),
            cmp::Ordering::Less => Some(ScrollDirection::Backward),
            cmp::Ordering::Equal => self.scroll_direction,
        };
        true
    }

    pub fn set_is_scrolling(&mut self, is_scrolling: bool) {
        if self.is_scrolling == is_scrolling {
            return;
        }
        self.is_scrolling = is_scrolling;
        if !is_scrolling {
            self.scroll_direction = None;
            self.last_scroll_event_ms = None;
            self.scroll_adjustments = 0;
        }
        self.notify();
    }

    /// Marks the engine as scrolling and records the event time for the
    /// `is_scrolling` debounce.
    pub fn notify_scroll_event(&mut self, now_ms: u64) {
        if !self.options.enabled {
            return;
        }
        self.last_scroll_event_ms = Some(now_ms);
        self.set_is_scrolling(true);
    }

    /// Resets `is_scrolling` once `scrolling_reset_delay_ms` has elapsed
    /// since the last scroll event. Adapters call this from their tick.
    pub fn update_scrolling(&mut self, now_ms: u64) {
        if !self.options.enabled || !self.is_scrolling {
            return;
        }
        let Some(last) = self.last_scroll_event_ms else {
            return;
        };
        if now_ms.saturating_sub(last) >= self.options.scrolling_reset_delay_ms {
            self.set_is_scrolling(false);
        }
    }

    /// Applies a scroll offset reported by the host (wheel/drag) and marks
    /// the engine as scrolling, in one coalesced update.
    pub fn apply_scroll_offset_event(&mut self, offset: u64, now_ms: u64) {
        ltrace!(offset, now_ms, "apply_scroll_offset_event");
        self.batch_update(|v| {
            v.set_scroll_offset(offset);
            v.notify_scroll_event(now_ms);
        });
    }

    /// Same as `apply_scroll_offset_event`, but clamps the offset.
    pub fn apply_scroll_offset_event_clamped(&mut self, offset: u64, now_ms: u64) {
        self.batch_update(|v| {
            v.set_scroll_offset_clamped(offset);
            v.notify_scroll_event(now_ms);
        });
    }

    /// Applies a viewport rect reported by the host.
    pub fn apply_rect_event(&mut self, rect: Rect) {
        self.batch_update(|v| {
            v.set_scroll_rect(rect);
        });
    }

    /// Applies both a rect and a scroll offset in a single coalesced update.
    /// Recommended entry point for hosts that report them together.
    pub fn apply_scroll_frame(&mut self, rect: Rect, scroll_offset: u64, now_ms: u64) {
        ltrace!(
            width = rect.width,
            height = rect.height,
            scroll_offset,
            now_ms,
            "apply_scroll_frame"
        );
        self.batch_update(|v| {
            v.set_scroll_rect(rect);
            v.set_scroll_offset(scroll_offset);
            v.notify_scroll_event(now_ms);
        });
    }

    /// Same as `apply_scroll_frame`, but clamps the offset.
    pub fn apply_scroll_frame_clamped(&mut self, rect: Rect, scroll_offset: u64, now_ms: u64) {
        self.batch_update(|v| {
            v.set_scroll_rect(rect);
            v.set_scroll_offset_clamped(scroll_offset);
            v.notify_scroll_event(now_ms);
        });
    }

    pub fn set_viewport_and_scroll(&mut self, viewport_size: u32, scroll_offset: u64) {
        self.batch_update(|v| {
            v.set_viewport_size(viewport_size);
            v.set_scroll_offset(scroll_offset);
        });
    }

    pub fn set_viewport_and_scroll_clamped(&mut self, viewport_size: u32, scroll_offset: u64) {
        self.batch_update(|v| {
            v.set_viewport_size(viewport_size);
            v.set_scroll_offset_clamped(scroll_offset);
        });
    }

    // ------------------------------------------------------------------
    // Measurement (Resize Feedback Loop)
    // ------------------------------------------------------------------

    /// Records a measured size without scroll compensation.
    pub fn measure(&mut self, index: usize, size: u32) {
        if index >= self.options.count {
            return;
        }
        let key = self.key_for(index);
        self.measure_keyed(index, key, size);
    }

    pub fn measure_keyed(&mut self, index: usize, key: K, size: u32) {
        if index >= self.options.count {
            return;
        }
        ltrace!(index, size, "measure_keyed");
        if self.store.record_size(key, size) {
            self.store.mark_dirty_from(index);
        }
        self.service_pending_scroll();
        self.notify();
    }

    /// Records several measurements as one geometry rebuild and one
    /// notification (first-mount batches).
    pub fn measure_many(&mut self, measurements: impl IntoIterator<Item = (usize, u32)>) {
        for (index, size) in measurements {
            if index >= self.options.count {
                continue;
            }
            let key = self.key_for(index);
            if self.store.record_size(key, size) {
                self.store.mark_dirty_from(index);
            }
        }
        self.service_pending_scroll();
        self.notify();
    }

    /// Records a measured size and compensates the scroll position when the
    /// resized item sits before the current offset while a scroll is in
    /// flight, so content above the viewport cannot push it around.
    ///
    /// Returns the scroll delta that was applied (0 when no compensation was
    /// needed).
    pub fn resize_item(&mut self, index: usize, size: u32) -> i64 {
        if index >= self.options.count {
            return 0;
        }
        self.flush();
        let Some(item) = self.virtual_item(index) else {
            return 0;
        };

        let prev = self.store.size_for(&item.key).unwrap_or(item.size);
        let delta = size as i64 - prev as i64;

        // The hook queries the engine, so consult it before dirtying state.
        let should_adjust = delta != 0
            && match &self.options.should_adjust_scroll_position_on_item_size_change {
                Some(f) => f(self, &item, delta),
                None => self.is_scrolling && item.start < self.scroll_offset,
            };

        if self.store.record_size(item.key.clone(), size) {
            self.store.mark_dirty_from(index);
        }

        let mut applied = 0i64;
        if should_adjust {
            self.scroll_adjustments += delta;
            let target = add_signed(self.scroll_offset, delta);
            ltrace!(index, delta, target, "resize compensation");
            if let Some(cb) = &self.options.perform_scroll {
                cb(target, ScrollBehavior::Jump);
            }
            // Keeps the reported scroll direction untouched; this is a
            // correction, not a user scroll.
            self.scroll_offset = target;
            applied = delta;
        }

        self.service_pending_scroll();
        self.notify();
        applied
    }

    pub fn resize_item_many(
        &mut self,
        measurements: impl IntoIterator<Item = (usize, u32)>,
    ) -> i64 {
        let mut applied = 0i64;
        self.batch_update(|v| {
            for (index, size) in measurements {
                applied += v.resize_item(index, size);
            }
        });
        applied
    }

    /// Forgets all measured sizes and lane assignments, forcing a full
    /// remeasurement. Idempotent.
    pub fn reset_measurements(&mut self) {
        ldebug!(
            sizes = self.store.size_cache_len(),
            lanes = self.store.lane_cache_len(),
            "reset_measurements"
        );
        self.store.reset();
        self.notify();
    }

    pub fn is_measured(&self, index: usize) -> bool {
        index < self.options.count && self.store.is_measured(&self.key_for(index))
    }

    pub fn measurement_cache_len(&self) -> usize {
        self.store.size_cache_len()
    }

    /// Number of committed (deferred) lane assignments.
    pub fn lane_assignment_cache_len(&self) -> usize {
        self.store.lane_cache_len()
    }

    /// Iterates over the cached measured sizes without allocating.
    pub fn for_each_cached_size(&self, f: impl FnMut(&K, u32)) {
        self.store.for_each_size(f);
    }

    /// Exports the cached measured sizes (useful for persistence across
    /// dataset reloads; keys keep measurements attached to items).
    pub fn export_measurement_cache(&self) -> Vec<(K, u32)> {
        let mut out = Vec::with_capacity(self.store.size_cache_len());
        self.for_each_cached_size(|k, v| out.push((k.clone(), v)));
        out
    }

    /// Replaces the size cache from an iterator, rebuilding geometry under
    /// the current key mapping.
    pub fn import_measurement_cache(&mut self, entries: impl IntoIterator<Item = (K, u32)>) {
        let n = self.store.replace_sizes(entries);
        ldebug!(entries = n, "import_measurement_cache");
        self.notify();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Total scrollable extent: furthest lane end plus `padding_end`
    /// (`padding_start + padding_end` when there are no items).
    pub fn total_size(&self) -> u64 {
        if !self.options.enabled {
            return 0;
        }
        self.geometry()
            .content_end()
            .saturating_add(self.options.padding_end as u64)
    }

    /// Geometry for one item, with `scroll_margin` applied.
    pub fn virtual_item(&self, index: usize) -> Option<VirtualItem<K>> {
        if !self.options.enabled {
            return None;
        }
        let margin = self.options.scroll_margin as u64;
        self.geometry().items().get(index).map(|it| {
            let mut it = it.clone();
            it.start = it.start.saturating_add(margin);
            it
        })
    }

    pub fn item_start(&self, index: usize) -> Option<u64> {
        self.virtual_item(index).map(|it| it.start)
    }

    pub fn item_size(&self, index: usize) -> Option<u32> {
        if !self.options.enabled {
            return None;
        }
        self.geometry().items().get(index).map(|it| it.size)
    }

    pub fn item_end(&self, index: usize) -> Option<u64> {
        self.virtual_item(index).map(|it| it.end())
    }

    pub fn item_lane(&self, index: usize) -> Option<usize> {
        if !self.options.enabled {
            return None;
        }
        self.geometry().items().get(index).map(|it| it.lane)
    }

    /// Maps a scroll-axis offset to the item occupying it (offsets inside a
    /// gap map to the previous item in that lane).
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        if !self.options.enabled || self.options.count == 0 {
            return None;
        }
        let margin = self.options.scroll_margin as u64;
        if offset < margin {
            return Some(0);
        }
        self.geometry()
            .index_at(offset - margin)
            .map(|i| i.min(self.options.count - 1))
    }

    pub fn virtual_item_for_offset(&self, offset: u64) -> Option<VirtualItem<K>> {
        let index = self.index_at_offset(offset)?;
        self.virtual_item(index)
    }

    pub fn max_scroll_offset(&self) -> u64 {
        if !self.options.enabled {
            return self.options.initial_offset.resolve();
        }
        let margin = self.options.scroll_margin as u64;
        let total = self.total_size();
        let view = self.viewport_size as u64;
        margin.saturating_add(total.saturating_sub(view))
    }

    pub fn clamp_scroll_offset(&self, offset: u64) -> u64 {
        offset.min(self.max_scroll_offset())
    }

    /// The exact visible range (no overscan), end-exclusive.
    pub fn visible_range(&self) -> VirtualRange {
        self.visible_range_for(self.scroll_offset, self.viewport_size)
    }

    pub fn visible_range_for(&self, scroll_offset: u64, viewport_size: u32) -> VirtualRange {
        if !self.options.enabled {
            return EMPTY_RANGE;
        }
        self.compute_visible_range(scroll_offset, viewport_size)
    }

    /// The visible range expanded by the overscan margin, end-exclusive.
    pub fn virtual_range(&self) -> VirtualRange {
        self.virtual_range_for(self.scroll_offset, self.viewport_size)
    }

    pub fn virtual_range_for(&self, scroll_offset: u64, viewport_size: u32) -> VirtualRange {
        let mut range = self.visible_range_for(scroll_offset, viewport_size);
        if range.is_empty() {
            return range;
        }
        range.start_index = range.start_index.saturating_sub(self.options.overscan);
        range.end_index = cmp::min(
            self.options.count,
            range.end_index.saturating_add(self.options.overscan),
        );
        range
    }

    fn compute_visible_range(&self, scroll_offset: u64, viewport_size: u32) -> VirtualRange {
        let count = self.options.count;
        if count == 0 || viewport_size == 0 {
            return EMPTY_RANGE;
        }

        let margin = self.options.scroll_margin as u64;
        let view = viewport_size as u64;
        let max_scroll = margin.saturating_add(self.total_size().saturating_sub(view));
        let scroll_offset = scroll_offset.min(max_scroll);
        let scroll_end = scroll_offset.saturating_add(view);
        if scroll_end <= margin {
            return EMPTY_RANGE;
        }

        let offset = scroll_offset.saturating_sub(margin);
        let view_end = scroll_end - margin;
        self.geometry()
            .visible_range(offset, view_end, self.options.lanes)
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Calls `f` for every index to materialize: the overscanned visible
    /// range, or whatever the configured range extractor emits.
    pub fn for_each_virtual_index(&self, f: impl FnMut(usize)) {
        self.for_each_virtual_index_for(self.scroll_offset, self.viewport_size, f);
    }

    pub fn for_each_virtual_index_for(
        &self,
        scroll_offset: u64,
        viewport_size: u32,
        mut f: impl FnMut(usize),
    ) {
        if !self.options.enabled {
            return;
        }
        let visible = self.visible_range_for(scroll_offset, viewport_size);
        if visible.is_empty() {
            return;
        }

        let count = self.options.count;
        let range = Range {
            start_index: visible.start_index,
            end_index: visible.end_index,
            overscan: self.options.overscan,
            count,
        };

        if let Some(extract) = &self.options.range_extractor {
            // The emitter re-enforces the sorted/deduped/in-bounds contract,
            // so a misbehaving extractor cannot corrupt downstream math.
            let mut guard = IndexEmitter::new(range, &mut f);
            extract(range, &mut |i| guard.emit(i));
            return;
        }

        let start = visible.start_index.saturating_sub(self.options.overscan);
        let end = cmp::min(count, visible.end_index.saturating_add(self.options.overscan));
        for i in start..end {
            f(i);
        }
    }

    /// Calls `f` with the full geometry of every item to materialize.
    pub fn for_each_virtual_item(&self, f: impl FnMut(VirtualItem<K>)) {
        self.for_each_virtual_item_for(self.scroll_offset, self.viewport_size, f);
    }

    pub fn for_each_virtual_item_for(
        &self,
        scroll_offset: u64,
        viewport_size: u32,
        mut f: impl FnMut(VirtualItem<K>),
    ) {
        self.for_each_virtual_index_for(scroll_offset, viewport_size, |i| {
            if let Some(item) = self.virtual_item(i) {
                f(item);
            }
        });
    }

    /// Collects the indexes to materialize into `out` (cleared first).
    pub fn collect_virtual_indexes(&self, out: &mut Vec<usize>) {
        out.clear();
        self.for_each_virtual_index(|i| out.push(i));
    }

    /// Collects the items to materialize into `out` (cleared first).
    pub fn collect_virtual_items(&self, out: &mut Vec<VirtualItem<K>>) {
        out.clear();
        self.for_each_virtual_item(|it| out.push(it));
    }

    /// Allocating convenience for [`Self::collect_virtual_items`].
    pub fn virtual_items(&self) -> Vec<VirtualItem<K>> {
        let mut out = Vec::new();
        self.collect_virtual_items(&mut out);
        out
    }

    // ------------------------------------------------------------------
    // Scroll Controller
    // ------------------------------------------------------------------

    /// Scrolls to an absolute offset with an alignment policy.
    ///
    /// Returns the applied (clamped) target. With [`ScrollBehavior::Jump`]
    /// the engine's offset is updated immediately; with
    /// [`ScrollBehavior::Smooth`] the target is only queued as a
    /// [`ScrollRequest`] for the adapter to animate.
    pub fn scroll_to_offset(&mut self, offset: u64, align: Align, behavior: ScrollBehavior) -> u64 {
        if !self.options.enabled {
            return self.scroll_offset;
        }
        self.pending_scroll = None;
        let target = self.clamp_scroll_offset(self.offset_for_alignment(offset, align));
        self.request_scroll(target, behavior);
        self.notify();
        target
    }

    /// Scrolls so the item at `index` satisfies the alignment policy.
    ///
    /// If the item's size is still an estimate, the request is re-issued
    /// exactly once after the item is first measured, so the final position
    /// converges on the real layout. A newer call replaces any pending
    /// retry.
    pub fn scroll_to_index(&mut self, index: usize, align: Align, behavior: ScrollBehavior) -> u64 {
        if !self.options.enabled {
            return self.scroll_offset;
        }
        self.flush();
        if self.options.count == 0 {
            self.pending_scroll = None;
            return self.scroll_offset;
        }
        let index = index.min(self.options.count - 1);
        let target = self.clamp_scroll_offset(self.scroll_to_index_offset(index, align));

        let measured = self.is_measured(index);
        self.pending_scroll = (!measured).then_some(PendingScroll {
            index,
            align,
            behavior,
        });
        if !measured {
            ldebug!(index, "scroll target size is an estimate; will re-issue once measured");
        }

        self.request_scroll(target, behavior);
        self.notify();
        target
    }

    /// Computes the offset `scroll_to_index` would target, without scrolling.
    pub fn scroll_to_index_offset(&self, index: usize, align: Align) -> u64 {
        if !self.options.enabled {
            return self.options.initial_offset.resolve();
        }
        if self.options.count == 0 {
            return 0;
        }
        let index = index.min(self.options.count - 1);
        let Some(item) = self.virtual_item(index) else {
            return self.scroll_offset;
        };

        let sp_start = self.options.scroll_padding_start as u64;
        let sp_end = self.options.scroll_padding_end as u64;
        let view = self.viewport_size as u64;

        let target = match align {
            Align::Start => item.start.saturating_sub(sp_start),
            Align::End => item.end().saturating_add(sp_end).saturating_sub(view),
            Align::Center => {
                let center = item.start.saturating_add(item.size as u64 / 2);
                center.saturating_sub(view / 2)
            }
            Align::Auto => {
                let cur = self.scroll_offset;
                let low = cur.saturating_add(sp_start);
                let high = cur.saturating_add(view).saturating_sub(sp_end);
                if item.start >= low && item.end() <= high {
                    cur
                } else if item.start < low {
                    item.start.saturating_sub(sp_start)
                } else {
                    item.end().saturating_add(sp_end).saturating_sub(view)
                }
            }
        };

        self.clamp_scroll_offset(target)
    }

    fn offset_for_alignment(&self, to: u64, align: Align) -> u64 {
        let view = self.viewport_size as u64;
        match align {
            Align::Start => to,
            Align::End => to.saturating_sub(view),
            Align::Center => to.saturating_sub(view / 2),
            Align::Auto => {
                let cur = self.scroll_offset;
                if to >= cur && to <= cur.saturating_add(view) {
                    cur
                } else if to < cur {
                    to
                } else {
                    to.saturating_sub(view)
                }
            }
        }
    }

    fn request_scroll(&mut self, offset: u64, behavior: ScrollBehavior) {
        self.scroll_request = Some(ScrollRequest { offset, behavior });
        if let Some(cb) = &self.options.perform_scroll {
            cb(offset, behavior);
        }
        if behavior == ScrollBehavior::Jump {
            self.apply_offset(offset);
        }
    }

    /// Drains the most recent programmatic scroll, if any. Adapters call
    /// this after driving the engine and carry the request out on the host.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.scroll_request.take()
    }

    /// Whether a scroll-to-index request is still waiting for its target to
    /// be measured.
    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll.is_some()
    }

    fn service_pending_scroll(&mut self) {
        let Some(p) = self.pending_scroll else {
            return;
        };
        if p.index >= self.options.count {
            self.pending_scroll = None;
            return;
        }
        let key = self.key_for(p.index);
        if self.store.is_measured(&key) {
            // One-shot: the re-issued request sees a measured target and
            // does not re-arm, which bounds the convergence loop.
            self.pending_scroll = None;
            ldebug!(index = p.index, "scroll target measured; re-issuing scroll");
            self.scroll_to_index(p.index, p.align, p.behavior);
        }
    }
}

const EMPTY_RANGE: VirtualRange = VirtualRange {
    start_index: 0,
    end_index: 0,
};

fn add_signed(base: u64, delta: i64) -> u64 {
    if delta >= 0 {
        base.saturating_add(delta as u64)
    } else {
        base.saturating_sub(delta.unsigned_abs())
    }
}
