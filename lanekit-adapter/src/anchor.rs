use core::fmt;

use lanekit::{Key, Virtualizer};

/// A captured viewport position, expressed relative to an item identity.
///
/// Anchors survive data changes that move items around: capture one before a
/// prepend/reorder, apply it after, and the viewport stays visually pinned to
/// the same item (chat and timeline "load older" without jumps).
#[derive(Clone, PartialEq, Eq)]
pub struct ScrollAnchor<K> {
    pub key: K,
    /// Distance from the anchor item's start to the scroll offset.
    pub offset_into_item: u64,
}

impl<K: fmt::Debug> fmt::Debug for ScrollAnchor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollAnchor")
            .field("key", &self.key)
            .field("offset_into_item", &self.offset_into_item)
            .finish()
    }
}

/// Captures an anchor on the first visible item.
///
/// Returns `None` when the engine is disabled or nothing is visible.
pub fn capture_first_visible_anchor<K: Key>(v: &Virtualizer<K>) -> Option<ScrollAnchor<K>> {
    let visible = v.visible_range();
    if visible.is_empty() {
        return None;
    }
    let index = visible.start_index;
    let start = v.item_start(index)?;
    Some(ScrollAnchor {
        key: v.key_for(index),
        offset_into_item: v.scroll_offset().saturating_sub(start),
    })
}

/// Re-applies a captured anchor against the current dataset.
///
/// The caller supplies `key_to_index` for the post-change dataset. Returns
/// `true` when the anchor's item was found and the offset was adjusted.
pub fn apply_anchor<K: Key>(
    v: &mut Virtualizer<K>,
    anchor: &ScrollAnchor<K>,
    mut key_to_index: impl FnMut(&K) -> Option<usize>,
) -> bool {
    let Some(index) = key_to_index(&anchor.key) else {
        return false;
    };
    let Some(start) = v.item_start(index) else {
        return false;
    };
    v.set_scroll_offset_clamped(start.saturating_add(anchor.offset_into_item));
    true
}
