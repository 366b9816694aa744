use std::sync::Arc;

use crate::virtualizer::Virtualizer;
use crate::{ConfigError, ItemKey, Range, Rect, ScrollBehavior, VirtualItem};

/// A callback fired once per consistent recomputation of the engine state.
///
/// The second argument is `is_scrolling`. Framework adapters translate this
/// single notification into their own reactivity primitive.
pub type OnChangeCallback<K> = Arc<dyn Fn(&Virtualizer<K>, bool) + Send + Sync>;

/// A strategy that imperatively scrolls the host to an offset.
///
/// When set, the engine invokes it for every programmatic scroll it resolves
/// (including convergence retries and resize compensation), so a host element
/// can be kept in sync without polling.
pub type PerformScrollCallback = Arc<dyn Fn(u64, ScrollBehavior) + Send + Sync>;

/// A hook that overrides the default resize-compensation policy.
///
/// The default shifts the scroll position by the size delta when the resized
/// item starts before the current scroll offset while a scroll is in
/// progress, so content already scrolled past does not push the viewport
/// around.
pub type ShouldAdjustScrollCallback<K> =
    Arc<dyn Fn(&Virtualizer<K>, &VirtualItem<K>, i64) -> bool + Send + Sync>;

/// A callback that emits the final set of item indexes for a visible range.
///
/// Contract: `emit(i)` must be called with `i < range.count`, in ascending
/// order; duplicates are allowed but ignored. Out-of-range values are dropped
/// at the materialization boundary, never fed into index math. Use
/// [`crate::IndexEmitter`] to uphold the contract without allocations.
pub type RangeExtractor = Arc<dyn Fn(Range, &mut dyn FnMut(usize)) + Send + Sync>;

/// Initial scroll offset configuration.
#[derive(Clone)]
pub enum InitialOffset {
    Value(u64),
    /// Lazily evaluated by `Virtualizer::new` (e.g. restored from app state).
    Provider(Arc<dyn Fn() -> u64 + Send + Sync>),
}

impl InitialOffset {
    pub(crate) fn resolve(&self) -> u64 {
        match self {
            Self::Value(v) => *v,
            Self::Provider(f) => f(),
        }
    }
}

impl Default for InitialOffset {
    fn default() -> Self {
        Self::Value(0)
    }
}

impl core::fmt::Debug for InitialOffset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

/// Configuration for [`crate::Virtualizer`].
///
/// Cheap to clone: closures are stored behind `Arc`s, so adapters can tweak a
/// few fields and call `Virtualizer::set_options` without reallocating.
/// Validated at construction and on every `set_options`.
pub struct EngineOptions<K = ItemKey> {
    /// Item count, `>= 0`.
    pub count: usize,
    /// Estimated size of the item at an index, used until the item is
    /// measured. Must be deterministic for a given index.
    pub estimate_size: Arc<dyn Fn(usize) -> u32 + Send + Sync>,
    /// Stable identity for the item at an index. Measured sizes and lane
    /// assignments are cached per key, so they follow items across
    /// reordering. Defaults to the index itself.
    pub get_item_key: Arc<dyn Fn(usize) -> K + Send + Sync>,

    /// Extra items materialized beyond the exact visible range.
    pub overscan: usize,
    /// Virtualize the horizontal axis instead of the vertical one.
    pub horizontal: bool,
    /// Number of parallel lanes (1 = plain list, >1 = grid/masonry columns).
    pub lanes: usize,
    /// Defer lane assignment until an item has a measured size, then commit
    /// it to the currently-shortest lane (masonry packing). Unmeasured items
    /// fall back to `index % lanes` so a definite position is still reported.
    pub defer_lane_assignment: bool,

    /// Padding before the first item.
    pub padding_start: u32,
    /// Padding after the last item.
    pub padding_end: u32,
    /// Additional padding applied when computing scroll-to offsets.
    pub scroll_padding_start: u32,
    /// Additional padding applied when computing scroll-to offsets.
    pub scroll_padding_end: u32,
    /// Offset between the scroll host's origin and the list's logical origin
    /// (e.g. window scrolling where the list begins after a header).
    pub scroll_margin: u32,
    /// Space between consecutive items in the same lane.
    pub gap: u32,

    /// Enables/disables the engine. When disabled, queries return empty
    /// results and zero extents.
    pub enabled: bool,
    /// Initial viewport rect, applied by `Virtualizer::new`.
    pub initial_rect: Option<Rect>,
    /// Initial scroll offset, applied by `Virtualizer::new`.
    pub initial_offset: InitialOffset,
    /// Debounce window after the last scroll event before `is_scrolling`
    /// resets, driven by adapter-supplied timestamps.
    pub scrolling_reset_delay_ms: u64,

    /// Optional index selection hook for pinned/sticky rows and headers.
    pub range_extractor: Option<RangeExtractor>,
    /// Fired once per consistent recomputation.
    pub on_change: Option<OnChangeCallback<K>>,
    /// Imperative scroll strategy, invoked for resolved programmatic scrolls.
    pub perform_scroll: Option<PerformScrollCallback>,
    /// Overrides the default resize-compensation policy.
    pub should_adjust_scroll_position_on_item_size_change:
        Option<ShouldAdjustScrollCallback<K>>,
}

impl<K> Clone for EngineOptions<K> {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            estimate_size: Arc::clone(&self.estimate_size),
            get_item_key: Arc::clone(&self.get_item_key),
            overscan: self.overscan,
            horizontal: self.horizontal,
            lanes: self.lanes,
            defer_lane_assignment: self.defer_lane_assignment,
            padding_start: self.padding_start,
            padding_end: self.padding_end,
            scroll_padding_start: self.scroll_padding_start,
            scroll_padding_end: self.scroll_padding_end,
            scroll_margin: self.scroll_margin,
            gap: self.gap,
            enabled: self.enabled,
            initial_rect: self.initial_rect,
            initial_offset: self.initial_offset.clone(),
            scrolling_reset_delay_ms: self.scrolling_reset_delay_ms,
            range_extractor: self.range_extractor.clone(),
            on_change: self.on_change.clone(),
            perform_scroll: self.perform_scroll.clone(),
            should_adjust_scroll_position_on_item_size_change: self
                .should_adjust_scroll_position_on_item_size_change
                .clone(),
        }
    }
}

impl EngineOptions<ItemKey> {
    /// Creates options for a list keyed by index (`ItemKey = u64`).
    pub fn new(count: usize, estimate_size: impl Fn(usize) -> u32 + Send + Sync + 'static) -> Self {
        Self::new_with_key(count, estimate_size, |i| i as u64)
    }
}

impl<K> EngineOptions<K> {
    /// Creates options with a custom key mapping.
    ///
    /// Use this when measurements should follow items across reordering:
    /// `get_item_key(i)` must return a stable identity for the item at `i`.
    pub fn new_with_key(
        count: usize,
        estimate_size: impl Fn(usize) -> u32 + Send + Sync + 'static,
        get_item_key: impl Fn(usize) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            count,
            estimate_size: Arc::new(estimate_size),
            get_item_key: Arc::new(get_item_key),
            overscan: 1,
            horizontal: false,
            lanes: 1,
            defer_lane_assignment: false,
            padding_start: 0,
            padding_end: 0,
            scroll_padding_start: 0,
            scroll_padding_end: 0,
            scroll_margin: 0,
            gap: 0,
            enabled: true,
            initial_rect: None,
            initial_offset: InitialOffset::default(),
            scrolling_reset_delay_ms: 150,
            range_extractor: None,
            on_change: None,
            perform_scroll: None,
            should_adjust_scroll_position_on_item_size_change: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes == 0 {
            return Err(ConfigError::ZeroLanes);
        }
        Ok(())
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_horizontal(mut self, horizontal: bool) -> Self {
        self.horizontal = horizontal;
        self
    }

    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes;
        self
    }

    pub fn with_defer_lane_assignment(mut self, defer: bool) -> Self {
        self.defer_lane_assignment = defer;
        self
    }

    pub fn with_padding(mut self, padding_start: u32, padding_end: u32) -> Self {
        self.padding_start = padding_start;
        self.padding_end = padding_end;
        self
    }

    pub fn with_scroll_padding(mut self, start: u32, end: u32) -> Self {
        self.scroll_padding_start = start;
        self.scroll_padding_end = end;
        self
    }

    pub fn with_scroll_margin(mut self, scroll_margin: u32) -> Self {
        self.scroll_margin = scroll_margin;
        self
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_initial_rect(mut self, initial_rect: Option<Rect>) -> Self {
        self.initial_rect = initial_rect;
        self
    }

    pub fn with_initial_offset(mut self, initial_offset: InitialOffset) -> Self {
        self.initial_offset = initial_offset;
        self
    }

    pub fn with_initial_offset_value(mut self, initial_offset: u64) -> Self {
        self.initial_offset = InitialOffset::Value(initial_offset);
        self
    }

    pub fn with_initial_offset_provider(
        mut self,
        provider: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Self {
        self.initial_offset = InitialOffset::Provider(Arc::new(provider));
        self
    }

    pub fn with_scrolling_reset_delay_ms(mut self, delay_ms: u64) -> Self {
        self.scrolling_reset_delay_ms = delay_ms;
        self
    }

    pub fn with_range_extractor(
        mut self,
        range_extractor: Option<impl Fn(Range, &mut dyn FnMut(usize)) + Send + Sync + 'static>,
    ) -> Self {
        self.range_extractor = range_extractor.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: Option<impl Fn(&Virtualizer<K>, bool) + Send + Sync + 'static>,
    ) -> Self {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_perform_scroll(
        mut self,
        perform_scroll: Option<impl Fn(u64, ScrollBehavior) + Send + Sync + 'static>,
    ) -> Self {
        self.perform_scroll = perform_scroll.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_should_adjust_scroll_position_on_item_size_change(
        mut self,
        f: Option<impl Fn(&Virtualizer<K>, &VirtualItem<K>, i64) -> bool + Send + Sync + 'static>,
    ) -> Self {
        self.should_adjust_scroll_position_on_item_size_change = f.map(|f| Arc::new(f) as _);
        self
    }
}

impl<K> core::fmt::Debug for EngineOptions<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("count", &self.count)
            .field("overscan", &self.overscan)
            .field("horizontal", &self.horizontal)
            .field("lanes", &self.lanes)
            .field("defer_lane_assignment", &self.defer_lane_assignment)
            .field("padding_start", &self.padding_start)
            .field("padding_end", &self.padding_end)
            .field("scroll_padding_start", &self.scroll_padding_start)
            .field("scroll_padding_end", &self.scroll_padding_end)
            .field("scroll_margin", &self.scroll_margin)
            .field("gap", &self.gap)
            .field("enabled", &self.enabled)
            .field("initial_rect", &self.initial_rect)
            .field("initial_offset", &self.initial_offset)
            .field("scrolling_reset_delay_ms", &self.scrolling_reset_delay_ms)
            .finish_non_exhaustive()
    }
}
