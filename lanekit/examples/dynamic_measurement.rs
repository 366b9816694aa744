// Example: estimates refined by real measurements, with scroll compensation
// while the user is mid-scroll.
use lanekit::{EngineOptions, Virtualizer};

fn main() {
    let mut v = Virtualizer::new(EngineOptions::new(10_000, |_| 50)).expect("valid options");
    v.set_viewport_and_scroll(400, 2_000);

    println!("estimated total={}", v.total_size());

    // The user is scrolling; items above the viewport settle on their real
    // sizes. The engine shifts the offset so nothing moves on screen.
    v.apply_scroll_offset_event(2_000, 0);
    for i in 0..40 {
        let delta = v.resize_item(i, 50 + (i as u32 % 7) * 4);
        if delta != 0 {
            println!("item {i}: compensated by {delta}, offset now {}", v.scroll_offset());
        }
    }

    v.update_scrolling(1_000); // debounce elapsed, scrolling stops
    println!("measured total={}", v.total_size());
    println!("is_scrolling={}", v.is_scrolling());
}
