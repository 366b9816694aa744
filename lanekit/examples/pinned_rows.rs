// Example: keep a header row materialized regardless of scroll position.
use std::sync::Arc;

use lanekit::{EngineOptions, IndexEmitter, Range, Virtualizer};

fn main() {
    let mut opts = EngineOptions::new(500, |_| 24);
    opts.range_extractor = Some(Arc::new(|r: Range, emit: &mut dyn FnMut(usize)| {
        let mut e = IndexEmitter::new(r, emit);
        e.emit(0); // sticky header
        e.emit_overscanned();
    }));
    let mut v = Virtualizer::new(opts).expect("valid options");
    v.set_viewport_and_scroll(240, 6_000);

    let mut indexes = Vec::new();
    v.collect_virtual_indexes(&mut indexes);
    println!("materialized={indexes:?}");
    assert_eq!(indexes.first(), Some(&0));
}
