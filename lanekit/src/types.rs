/// Alignment policy for programmatic scrolling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    /// No-op when the target is already fully visible, otherwise scroll to the
    /// nearest edge (`Start` when the target precedes the viewport, `End` when
    /// it follows).
    Auto,
}

/// How a programmatic scroll should be performed by the host.
///
/// The engine itself is instantaneous: with [`ScrollBehavior::Jump`] it applies
/// the target offset immediately. [`ScrollBehavior::Smooth`] defers the offset
/// change to an adapter (see the scroll-request queue on the engine), which is
/// expected to animate toward the target and feed offsets back as scroll
/// events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollBehavior {
    Jump,
    Smooth,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// Viewport geometry of the scroll host, in pixels.
///
/// The virtualized axis is selected by `EngineOptions::horizontal`: `height`
/// for vertical lists, `width` for horizontal ones. The cross axis only
/// matters to multi-lane layouts (lane width is `cross / lanes`, which the
/// engine leaves to the rendering layer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn main(&self, horizontal: bool) -> u32 {
        if horizontal { self.width } else { self.height }
    }

    pub fn cross(&self, horizontal: bool) -> u32 {
        if horizontal { self.height } else { self.width }
    }
}

/// Default item key type: the item index widened to `u64`.
pub type ItemKey = u64;

/// Computed geometry for one materializable item.
///
/// `start` is an offset in the scroll axis and includes `scroll_margin` and
/// `padding_start`. Within a lane, `start` equals the previous item's `end`
/// plus `gap` (or `padding_start` for the lane's first item). Across lanes,
/// starts differ to allow masonry packing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualItem<K = ItemKey> {
    pub index: usize,
    pub key: K,
    /// Lane (parallel track) this item occupies, always `< lanes`.
    pub lane: usize,
    pub start: u64,
    pub size: u32,
}

impl<K> VirtualItem<K> {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size as u64)
    }
}

/// A contiguous index interval, end-exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualRange {
    pub start_index: usize,
    pub end_index: usize, // exclusive
}

impl VirtualRange {
    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }
}

/// The visible range handed to a range extractor, together with the context
/// needed to expand it (overscan margin and total item count).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub start_index: usize,
    pub end_index: usize, // exclusive, visible range (no overscan)
    pub overscan: usize,
    pub count: usize,
}
