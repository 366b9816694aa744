// Example: the full observation loop against an in-memory host.
use lanekit::{Align, EngineOptions, Rect, ScrollBehavior};
use lanekit_adapter::{Easing, HostBinding, MeasuredNode, MockHost, ScrollHost};

fn main() {
    let mut b = HostBinding::new(EngineOptions::new(5_000, |_| 32).with_overscan(2))
        .expect("valid options");
    b.attach(MockHost::new(Rect {
        width: 320,
        height: 480,
    }));
    b.set_smooth_scroll(240, Easing::SmoothStep);

    // Frame 1: the user scrolls.
    b.host_mut().unwrap().push_scroll(10_000, 16);
    b.pump(16);
    println!("after user scroll: range={:?}", b.engine().virtual_range());

    // Layout reports real sizes for the mounted rows.
    let nodes: Vec<MeasuredNode> = b
        .engine()
        .virtual_items()
        .iter()
        .map(|it| MeasuredNode {
            index: it.index,
            size: 28 + (it.index as u32 % 9),
        })
        .collect();
    let delta = b.measure_nodes(nodes.iter(), 16);
    println!("measured {} rows, scroll delta {delta}", nodes.len());

    // Smooth scroll to the end over the next few frames.
    b.scroll_to_index(4_999, Align::End, ScrollBehavior::Smooth, 32);
    let mut now = 32;
    while b.is_animating() {
        now += 16;
        b.tick(now);
    }
    println!(
        "settled at offset={} host_calls={}",
        b.engine().scroll_offset(),
        b.host().unwrap().scroll_calls.len()
    );

    // Ownership-based teardown: the host moves back out exactly once.
    let host = b.detach().expect("still attached");
    println!("detached host at offset={}", host.scroll_offset());
}
