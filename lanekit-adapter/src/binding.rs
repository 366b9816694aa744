use lanekit::{Align, ConfigError, EngineOptions, Key, ScrollBehavior, Virtualizer};

use crate::{
    Easing, HostEvent, ItemNode, ScrollAnchor, ScrollHost, Teardown, Tween, apply_anchor,
    capture_first_visible_anchor,
};

const DEFAULT_SMOOTH_DURATION_MS: u64 = 200;

/// Binds a [`Virtualizer`] to a [`ScrollHost`], owning both ends of the
/// observation loop.
///
/// Each frame the adapter calls [`HostBinding::pump`] to feed host events
/// into the engine, [`HostBinding::measure_nodes`] after layout, and
/// [`HostBinding::tick`] to advance smooth scrolling and the `is_scrolling`
/// debounce. Programmatic scrolls queued by the engine are carried out on
/// the host automatically.
///
/// Teardown is ownership-based: attaching registers the host's rect and
/// scroll observers and holds their [`Teardown`] guards, and every exit path
/// (explicit [`HostBinding::detach`], rebinding to another host, dropping
/// the binding) drops the guards exactly once.
#[derive(Debug)]
pub struct HostBinding<H, K = lanekit::ItemKey> {
    engine: Virtualizer<K>,
    host: Option<H>,
    observers: Option<[Teardown; 2]>,
    tween: Option<Tween>,
    smooth_duration_ms: u64,
    easing: Easing,
}

impl<H: ScrollHost, K: Key> HostBinding<H, K> {
    pub fn new(options: EngineOptions<K>) -> Result<Self, ConfigError> {
        Ok(Self::from_virtualizer(Virtualizer::new(options)?))
    }

    pub fn from_virtualizer(engine: Virtualizer<K>) -> Self {
        Self {
            engine,
            host: None,
            observers: None,
            tween: None,
            smooth_duration_ms: DEFAULT_SMOOTH_DURATION_MS,
            easing: Easing::default(),
        }
    }

    pub fn engine(&self) -> &Virtualizer<K> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Virtualizer<K> {
        &mut self.engine
    }

    pub fn into_engine(self) -> Virtualizer<K> {
        self.engine
    }

    pub fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    pub fn set_smooth_scroll(&mut self, duration_ms: u64, easing: Easing) {
        self.smooth_duration_ms = duration_ms.max(1);
        self.easing = easing;
    }

    /// Attaches a host: registers its observers and seeds the engine with
    /// its current rect and offset.
    ///
    /// Returns the previously attached host, if any, after tearing its
    /// observers down.
    pub fn attach(&mut self, mut host: H) -> Option<H> {
        let rect = host.viewport_rect();
        let offset = host.scroll_offset();
        atrace!(
            width = rect.width,
            height = rect.height,
            offset,
            "attaching scroll host"
        );
        self.observers = Some([host.observe_rect(), host.observe_scroll()]);
        self.engine.batch_update(|v| {
            v.set_scroll_rect(rect);
            v.set_scroll_offset_clamped(offset);
        });
        self.host.replace(host)
    }

    /// Tears the observers down and returns the host. Subsequent pumps and
    /// ticks are no-ops against the host; the engine keeps its last state.
    pub fn detach(&mut self) -> Option<H> {
        let host = self.host.take()?;
        self.observers = None;
        self.tween = None;
        self.engine.set_is_scrolling(false);
        Some(host)
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn cancel_animation(&mut self) {
        self.tween = None;
    }

    /// Feeds the host's pending events into the engine and carries out any
    /// programmatic scroll the engine queued in response.
    ///
    /// A user scroll event cancels an in-flight smooth scroll; the user
    /// wins.
    pub fn pump(&mut self, now_ms: u64) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        let engine = &mut self.engine;
        let tween = &mut self.tween;
        host.poll_events(&mut |ev| match ev {
            HostEvent::Rect(rect) => engine.apply_rect_event(rect),
            HostEvent::Scroll { offset, now_ms } => {
                *tween = None;
                engine.apply_scroll_offset_event_clamped(offset, now_ms);
            }
        });
        self.drain_scroll_requests(now_ms);
        self.engine.update_scrolling(now_ms);
    }

    /// Advances smooth scrolling and the `is_scrolling` debounce.
    ///
    /// Returns the offset applied this tick when a tween is active.
    pub fn tick(&mut self, now_ms: u64) -> Option<u64> {
        self.drain_scroll_requests(now_ms);

        let Some(tween) = self.tween else {
            self.engine.update_scrolling(now_ms);
            return None;
        };

        let off = tween.sample(now_ms);
        self.engine.apply_scroll_offset_event_clamped(off, now_ms);
        let applied = self.engine.scroll_offset();
        if let Some(host) = self.host.as_mut() {
            host.scroll_to(applied, ScrollBehavior::Jump);
        }

        if tween.is_done(now_ms) {
            self.tween = None;
            self.engine.set_is_scrolling(false);
        }
        Some(applied)
    }

    /// Records post-layout measurements, skipping nodes that cannot be
    /// resolved to an item or a size.
    ///
    /// Goes through the engine's resize path, so scroll compensation applies
    /// and the host is re-synced when the offset was corrected. Returns the
    /// net scroll delta that was applied.
    pub fn measure_nodes<'a, N>(
        &mut self,
        nodes: impl IntoIterator<Item = &'a N>,
        now_ms: u64,
    ) -> i64
    where
        N: ItemNode + 'a,
    {
        let horizontal = self.engine.options().horizontal;
        let mut applied = 0i64;
        self.engine.batch_update(|v| {
            for node in nodes {
                let Some(index) = node.item_index() else {
                    awarn!("skipping measurement of unbound item node");
                    continue;
                };
                let Some(size) = node.measured_size(horizontal) else {
                    awarn!(index, "skipping measurement: node has no size");
                    continue;
                };
                applied += v.resize_item(index, size);
            }
        });

        if applied != 0 {
            let offset = self.engine.scroll_offset();
            if let Some(host) = self.host.as_mut() {
                host.scroll_to(offset, ScrollBehavior::Jump);
            }
        }
        self.drain_scroll_requests(now_ms);
        applied
    }

    /// Scrolls so the item at `index` satisfies the alignment, driving the
    /// host immediately (`Jump`) or over the following ticks (`Smooth`).
    pub fn scroll_to_index(
        &mut self,
        index: usize,
        align: Align,
        behavior: ScrollBehavior,
        now_ms: u64,
    ) -> u64 {
        let applied = self.engine.scroll_to_index(index, align, behavior);
        self.drain_scroll_requests(now_ms);
        applied
    }

    pub fn scroll_to_offset(
        &mut self,
        offset: u64,
        align: Align,
        behavior: ScrollBehavior,
        now_ms: u64,
    ) -> u64 {
        let applied = self.engine.scroll_to_offset(offset, align, behavior);
        self.drain_scroll_requests(now_ms);
        applied
    }

    fn drain_scroll_requests(&mut self, now_ms: u64) {
        // Depth-1 queue: only the most recent request survives coalescing.
        if let Some(req) = self.engine.take_scroll_request() {
            match req.behavior {
                ScrollBehavior::Jump => {
                    // The engine already applied the offset; sync the host.
                    self.tween = None;
                    if let Some(host) = self.host.as_mut() {
                        host.scroll_to(req.offset, ScrollBehavior::Jump);
                    }
                }
                ScrollBehavior::Smooth => match &mut self.tween {
                    Some(t) => t.retarget(now_ms, req.offset, self.smooth_duration_ms),
                    None => {
                        self.tween = Some(Tween::new(
                            self.engine.scroll_offset(),
                            req.offset,
                            now_ms,
                            self.smooth_duration_ms,
                            self.easing,
                        ));
                    }
                },
            }
        }
    }

    pub fn capture_first_visible_anchor(&self) -> Option<ScrollAnchor<K>> {
        capture_first_visible_anchor(&self.engine)
    }

    /// Captures an anchor on the item under `offset_in_viewport` (0 anchors
    /// the item at the top edge).
    pub fn capture_anchor_at(&self, offset_in_viewport: u64) -> Option<ScrollAnchor<K>> {
        let abs = self.engine.scroll_offset().saturating_add(offset_in_viewport);
        let item = self.engine.virtual_item_for_offset(abs)?;
        Some(ScrollAnchor {
            offset_into_item: self.engine.scroll_offset().saturating_sub(item.start),
            key: item.key,
        })
    }

    /// Re-applies an anchor after a data change, cancelling any animation
    /// and syncing the host to the corrected offset.
    pub fn apply_anchor(
        &mut self,
        anchor: &ScrollAnchor<K>,
        key_to_index: impl FnMut(&K) -> Option<usize>,
    ) -> bool {
        self.cancel_animation();
        if !apply_anchor(&mut self.engine, anchor, key_to_index) {
            return false;
        }
        let offset = self.engine.scroll_offset();
        if let Some(host) = self.host.as_mut() {
            host.scroll_to(offset, ScrollBehavior::Jump);
        }
        true
    }
}
