use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lanekit::{Rect, ScrollBehavior};

/// An RAII guard for an observer registration on a host.
///
/// Dropping the guard runs the host's teardown exactly once, on every exit
/// path: explicit detach, rebinding to another host, or dropping the
/// binding. A host without real observers returns [`Teardown::noop`].
pub struct Teardown(Option<Box<dyn FnOnce() + Send>>);

impl Teardown {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn noop() -> Self {
        Self(None)
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl core::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Teardown")
            .field(&self.0.as_ref().map(|_| "..."))
            .finish()
    }
}

/// An event observed on a scroll host since the last poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// The viewport was resized.
    Rect(Rect),
    /// The user (or the platform) scrolled to `offset` at `now_ms`.
    Scroll { offset: u64, now_ms: u64 },
}

/// The surface a [`crate::HostBinding`] needs from a scrollable container.
///
/// Implementations wrap whatever the platform offers: a DOM element, a
/// terminal pane, a game-UI scroll region. The binding registers its
/// observers on attach and drains their output through [`poll_events`],
/// so hosts without native observers can implement the `observe_*` pair as
/// [`Teardown::noop`] and diff their state between frames.
///
/// [`poll_events`]: ScrollHost::poll_events
pub trait ScrollHost {
    /// Current viewport rect.
    fn viewport_rect(&self) -> Rect;

    /// Current scroll offset on the virtualized axis.
    fn scroll_offset(&self) -> u64;

    /// Imperatively scrolls the host. With [`ScrollBehavior::Smooth`] the
    /// host may animate natively; the binding only issues `Jump`s it has
    /// already applied to the engine.
    fn scroll_to(&mut self, offset: u64, behavior: ScrollBehavior);

    /// Starts observing viewport resizes. The binding holds the returned
    /// guard for as long as the host stays attached.
    fn observe_rect(&mut self) -> Teardown {
        Teardown::noop()
    }

    /// Starts observing scroll position changes. Same lifetime as
    /// [`ScrollHost::observe_rect`].
    fn observe_scroll(&mut self) -> Teardown {
        Teardown::noop()
    }

    /// Drains the events observed since the last call, oldest first.
    fn poll_events(&mut self, sink: &mut dyn FnMut(HostEvent));
}

/// A rendered element a binding can measure after layout.
///
/// `item_index` returns `None` when the element is no longer bound to an
/// item (recycled, unmounted mid-frame); `measured_size` returns `None` when
/// the platform could not produce a size. Both cases are skipped with a
/// warning, never treated as size zero.
pub trait ItemNode {
    fn item_index(&self) -> Option<usize>;
    fn measured_size(&self, horizontal: bool) -> Option<u32>;
}

/// An in-memory [`ScrollHost`] for tests, examples and headless rendering.
///
/// Events are queued with [`MockHost::push_rect`] / [`MockHost::push_scroll`]
/// and handed out on the next poll. Programmatic scrolls are recorded in
/// [`MockHost::scroll_calls`] and applied to the stored offset immediately.
#[derive(Clone, Debug, Default)]
pub struct MockHost {
    rect: Rect,
    offset: u64,
    queue: Vec<HostEvent>,
    /// Every `scroll_to` the binding issued, in order.
    pub scroll_calls: Vec<(u64, ScrollBehavior)>,
    observers: Arc<AtomicUsize>,
}

impl MockHost {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            ..Self::default()
        }
    }

    /// Queues a viewport resize for the next poll.
    pub fn push_rect(&mut self, rect: Rect) {
        self.rect = rect;
        self.queue.push(HostEvent::Rect(rect));
    }

    /// Queues a user scroll for the next poll.
    pub fn push_scroll(&mut self, offset: u64, now_ms: u64) {
        self.offset = offset;
        self.queue.push(HostEvent::Scroll { offset, now_ms });
    }

    /// Observer registrations whose teardown has not run yet. Clones share
    /// the counter, so a clone taken before `attach` can watch teardown.
    pub fn active_observers(&self) -> usize {
        self.observers.load(Ordering::SeqCst)
    }

    fn register(&self) -> Teardown {
        let observers = Arc::clone(&self.observers);
        observers.fetch_add(1, Ordering::SeqCst);
        Teardown::new(move || {
            observers.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

impl ScrollHost for MockHost {
    fn viewport_rect(&self) -> Rect {
        self.rect
    }

    fn scroll_offset(&self) -> u64 {
        self.offset
    }

    fn scroll_to(&mut self, offset: u64, behavior: ScrollBehavior) {
        self.offset = offset;
        self.scroll_calls.push((offset, behavior));
    }

    fn observe_rect(&mut self) -> Teardown {
        self.register()
    }

    fn observe_scroll(&mut self) -> Teardown {
        self.register()
    }

    fn poll_events(&mut self, sink: &mut dyn FnMut(HostEvent)) {
        for ev in self.queue.drain(..) {
            sink(ev);
        }
    }
}

/// A plain `(index, size)` measurement, usable wherever an [`ItemNode`] is
/// expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeasuredNode {
    pub index: usize,
    pub size: u32,
}

impl ItemNode for MeasuredNode {
    fn item_index(&self) -> Option<usize> {
        Some(self.index)
    }

    fn measured_size(&self, _horizontal: bool) -> Option<u32> {
        Some(self.size)
    }
}
