// Example: minimal usage and programmatic scrolling.
use lanekit::{Align, EngineOptions, ScrollBehavior, Virtualizer};

fn main() {
    let mut v = Virtualizer::new(EngineOptions::new(1_000_000, |_| 40).with_overscan(3))
        .expect("valid options");
    v.set_viewport_and_scroll(600, 123_456);

    let mut items = Vec::new();
    v.for_each_virtual_item(|it| items.push(it));
    println!("total_size={}", v.total_size());
    println!("virtual_range={:?}", v.virtual_range());
    println!("first_materialized={:?}", items.first());

    let applied = v.scroll_to_index(999_999, Align::End, ScrollBehavior::Jump);
    println!("after scroll_to_index: offset={applied}");
    println!("last_visible_range={:?}", v.visible_range());
}
