// Example: keep the viewport pinned across a chat-style "load older" prepend.
use lanekit::{EngineOptions, Rect};
use lanekit_adapter::{HostBinding, MockHost};

fn main() {
    // Messages are keyed by id, not index, so measurements follow them.
    let mut b: HostBinding<MockHost, u64> = HostBinding::new(EngineOptions::new_with_key(
        100,
        |_| 30,
        |i| 1_000 + i as u64,
    ))
    .expect("valid options");
    b.attach(MockHost::new(Rect {
        width: 320,
        height: 240,
    }));
    b.engine_mut().set_scroll_offset(900);

    let anchor = b.capture_first_visible_anchor().expect("something visible");
    println!("anchor={anchor:?} offset={}", b.engine().scroll_offset());

    // Prepend 25 older messages (ids 975..1000); everything shifts by 25.
    b.engine_mut().batch_update(|v| {
        v.set_count(125);
        v.set_get_item_key(|i| 975 + i as u64);
    });

    let ok = b.apply_anchor(&anchor, |k| {
        (*k >= 975).then(|| (k - 975) as usize)
    });
    println!(
        "after prepend: ok={ok} offset={} first_key={}",
        b.engine().scroll_offset(),
        b.engine().key_for(b.engine().visible_range().start_index)
    );
}
