use crate::Range;

/// Helper for writing `range_extractor` implementations without allocations.
///
/// It enforces the extractor contract at the emission boundary: indexes that
/// are out of bounds, out of ascending order, or duplicates are dropped, not
/// propagated. A misbehaving extractor degrades to missing items, it never
/// takes the engine down.
pub struct IndexEmitter<'a> {
    range: Range,
    last: Option<usize>,
    emit: &'a mut dyn FnMut(usize),
}

impl<'a> IndexEmitter<'a> {
    pub fn new(range: Range, emit: &'a mut dyn FnMut(usize)) -> Self {
        Self {
            range,
            last: None,
            emit,
        }
    }

    pub fn range(&self) -> Range {
        self.range
    }

    /// Emits one index. Pinned indexes outside the natural window (sticky
    /// headers, drag sources) go through here too, before the window.
    pub fn emit(&mut self, index: usize) {
        if index >= self.range.count {
            lwarn!(
                index,
                count = self.range.count,
                "IndexEmitter: dropping out-of-bounds index"
            );
            return;
        }
        match self.last {
            Some(prev) if index == prev => {}
            Some(prev) if index < prev => {
                lwarn!(
                    prev,
                    next = index,
                    "IndexEmitter: dropping out-of-order index"
                );
            }
            _ => {
                self.last = Some(index);
                (self.emit)(index);
            }
        }
    }

    pub fn emit_range(&mut self, start_index: usize, end_index: usize) {
        let end = end_index.min(self.range.count);
        for i in start_index..end {
            self.emit(i);
        }
    }

    /// Emits the exact visible range, no overscan.
    pub fn emit_visible(&mut self) {
        self.emit_range(self.range.start_index, self.range.end_index);
    }

    /// Emits the visible range expanded by the overscan margin, which is what
    /// the default extractor produces.
    pub fn emit_overscanned(&mut self) {
        let start = self.range.start_index.saturating_sub(self.range.overscan);
        let end = self
            .range
            .end_index
            .saturating_add(self.range.overscan)
            .min(self.range.count);
        self.emit_range(start, end);
    }
}
