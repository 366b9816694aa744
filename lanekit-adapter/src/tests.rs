use crate::*;

use lanekit::{Align, EngineOptions, Rect, ScrollBehavior};

fn rect(width: u32, height: u32) -> Rect {
    Rect { width, height }
}

fn binding(count: usize, est: u32, viewport: Rect) -> HostBinding<MockHost> {
    let mut b = HostBinding::new(EngineOptions::new(count, move |_| est)).unwrap();
    b.attach(MockHost::new(viewport));
    b
}

#[test]
fn attach_seeds_engine_and_detach_returns_the_host() {
    let mut host = MockHost::new(rect(100, 50));
    host.push_scroll(120, 0); // pre-existing position
    let mut b = HostBinding::new(EngineOptions::new(100, |_| 10)).unwrap();
    assert!(!b.is_attached());

    assert!(b.attach(host).is_none());
    assert!(b.is_attached());
    assert_eq!(b.engine().viewport_size(), 50);
    assert_eq!(b.engine().scroll_offset(), 120);

    let host = b.detach().expect("host moves back out");
    assert_eq!(host.scroll_offset(), 120);
    // Teardown happened; there is nothing left to detach.
    assert!(b.detach().is_none());
    assert!(!b.is_attached());

    // A detached binding still answers queries and ignores pumps.
    b.pump(1_000);
    assert_eq!(b.engine().total_size(), 1_000);
}

#[test]
fn attaching_a_new_host_hands_back_the_old_one() {
    let mut b = binding(10, 10, rect(100, 50));
    let old = b.attach(MockHost::new(rect(200, 80)));
    assert!(old.is_some());
    assert_eq!(b.engine().viewport_size(), 80);
}

#[test]
fn observers_are_torn_down_exactly_once_per_attach() {
    // MockHost clones share the observer counter.
    let host = MockHost::new(rect(100, 50));
    let probe = host.clone();

    let mut b = HostBinding::new(EngineOptions::new(10, |_| 10)).unwrap();
    assert_eq!(probe.active_observers(), 0);
    b.attach(host);
    assert_eq!(probe.active_observers(), 2); // rect + scroll

    // Rebinding tears the old host's observers down.
    let replacement = MockHost::new(rect(100, 50));
    let replacement_probe = replacement.clone();
    let old = b.attach(replacement).expect("old host");
    assert_eq!(old.active_observers(), 0);
    assert_eq!(replacement_probe.active_observers(), 2);

    // Explicit detach, and nothing double-fires afterwards.
    let host = b.detach().expect("host");
    assert_eq!(host.active_observers(), 0);
    assert!(b.detach().is_none());
    assert_eq!(host.active_observers(), 0);

    // Dropping an attached binding is an exit path too.
    let host = MockHost::new(rect(100, 50));
    let probe = host.clone();
    let mut b = HostBinding::new(EngineOptions::new(10, |_| 10)).unwrap();
    b.attach(host);
    assert_eq!(probe.active_observers(), 2);
    drop(b);
    assert_eq!(probe.active_observers(), 0);
}

#[test]
fn pump_feeds_host_events_into_the_engine() {
    let mut b = binding(100, 10, rect(100, 50));

    b.host_mut().unwrap().push_rect(rect(100, 200));
    b.host_mut().unwrap().push_scroll(340, 1_000);
    b.pump(1_000);

    assert_eq!(b.engine().viewport_size(), 200);
    assert_eq!(b.engine().scroll_offset(), 340);
    assert!(b.engine().is_scrolling());

    // The debounce runs from pump timestamps.
    b.pump(2_000);
    assert!(!b.engine().is_scrolling());
}

#[test]
fn jump_scrolls_drive_the_host_immediately() {
    let mut b = binding(100, 10, rect(100, 50));

    let applied = b.scroll_to_index(30, Align::Start, ScrollBehavior::Jump, 0);
    assert_eq!(applied, 300);
    assert_eq!(b.engine().scroll_offset(), 300);
    assert_eq!(
        b.host().unwrap().scroll_calls.as_slice(),
        &[(300, ScrollBehavior::Jump)]
    );
    assert!(!b.is_animating());
}

#[test]
fn smooth_scrolls_animate_over_ticks() {
    let mut b = binding(100, 10, rect(100, 50));
    b.set_smooth_scroll(100, Easing::Linear);

    let target = b.scroll_to_offset(300, Align::Start, ScrollBehavior::Smooth, 0);
    assert_eq!(target, 300);
    assert!(b.is_animating());
    // Smooth never moves the engine up front.
    assert_eq!(b.engine().scroll_offset(), 0);
    assert!(b.host().unwrap().scroll_calls.is_empty());

    assert_eq!(b.tick(50), Some(150));
    assert_eq!(b.engine().scroll_offset(), 150);
    assert!(b.engine().is_scrolling());

    assert_eq!(b.tick(100), Some(300));
    assert!(!b.is_animating());
    assert!(!b.engine().is_scrolling());
    assert_eq!(b.engine().scroll_offset(), 300);
    assert_eq!(
        b.host().unwrap().scroll_calls.as_slice(),
        &[(150, ScrollBehavior::Jump), (300, ScrollBehavior::Jump)]
    );

    // Idle ticks are no-ops.
    assert_eq!(b.tick(150), None);
}

#[test]
fn a_newer_smooth_request_retargets_the_tween() {
    let mut b = binding(100, 10, rect(100, 50));
    b.set_smooth_scroll(100, Easing::Linear);

    b.scroll_to_offset(200, Align::Start, ScrollBehavior::Smooth, 0);
    b.tick(50); // at 100
    b.scroll_to_offset(600, Align::Start, ScrollBehavior::Smooth, 50);

    // Restarts from the current position, no jump back.
    assert_eq!(b.tick(100), Some(350));
    assert_eq!(b.tick(150), Some(600));
    assert!(!b.is_animating());
}

#[test]
fn user_scroll_cancels_an_active_tween() {
    let mut b = binding(100, 10, rect(100, 50));
    b.scroll_to_offset(500, Align::Start, ScrollBehavior::Smooth, 0);
    assert!(b.is_animating());

    b.host_mut().unwrap().push_scroll(42, 10);
    b.pump(10);

    assert!(!b.is_animating());
    assert_eq!(b.engine().scroll_offset(), 42);
}

enum TestNode {
    Unbound,
    NoSize(usize),
    Sized(usize, u32),
}

impl ItemNode for TestNode {
    fn item_index(&self) -> Option<usize> {
        match self {
            Self::Unbound => None,
            Self::NoSize(i) | Self::Sized(i, _) => Some(*i),
        }
    }

    fn measured_size(&self, _horizontal: bool) -> Option<u32> {
        match self {
            Self::Sized(_, s) => Some(*s),
            _ => None,
        }
    }
}

#[test]
fn measure_nodes_skips_unresolvable_nodes() {
    let mut b = binding(100, 10, rect(100, 50));

    let nodes = [
        TestNode::Unbound,
        TestNode::NoSize(4),
        TestNode::Sized(4, 25),
        TestNode::Sized(7, 13),
    ];
    let applied = b.measure_nodes(nodes.iter(), 0);
    assert_eq!(applied, 0); // not scrolling, no compensation
    assert_eq!(b.engine().item_size(4), Some(25));
    assert_eq!(b.engine().item_size(7), Some(13));
    assert_eq!(b.engine().measurement_cache_len(), 2);
}

#[test]
fn measure_nodes_syncs_the_host_after_compensation() {
    let mut b = binding(100, 10, rect(100, 50));
    b.host_mut().unwrap().push_scroll(500, 0);
    b.pump(0);
    assert!(b.engine().is_scrolling());

    // Item 1 sits above the offset; growing it by 50 shifts the viewport.
    let applied = b.measure_nodes([TestNode::Sized(1, 60)].iter(), 0);
    assert_eq!(applied, 50);
    assert_eq!(b.engine().scroll_offset(), 550);
    assert_eq!(
        b.host().unwrap().scroll_calls.last(),
        Some(&(550, ScrollBehavior::Jump))
    );
}

#[test]
fn anchor_keeps_the_viewport_pinned_across_a_prepend() {
    let mut b: HostBinding<MockHost, u64> = HostBinding::new(EngineOptions::new_with_key(
        10,
        |_| 20,
        |i| 100 + i as u64,
    ))
    .unwrap();
    b.attach(MockHost::new(rect(100, 60)));
    b.engine_mut().set_scroll_offset(40); // item2 (key 102) at the top edge

    let anchor = b.capture_first_visible_anchor().expect("anchor");
    assert_eq!(anchor.key, 102);
    assert_eq!(anchor.offset_into_item, 0);

    // Prepend three items (keys 97..=99); every index shifts by 3.
    b.engine_mut().batch_update(|v| {
        v.set_count(13);
        v.set_get_item_key(|i| 97 + i as u64);
    });

    assert!(b.apply_anchor(&anchor, |k| Some((k - 97) as usize)));
    // key 102 now lives at index 5, which starts at 100.
    assert_eq!(b.engine().scroll_offset(), 100);
    assert_eq!(
        b.engine().key_for(b.engine().visible_range().start_index),
        102
    );
    assert_eq!(
        b.host().unwrap().scroll_calls.last(),
        Some(&(100, ScrollBehavior::Jump))
    );
}

#[test]
fn capture_anchor_at_targets_the_item_under_the_offset() {
    let mut b = binding(100, 10, rect(100, 50));
    b.engine_mut().set_scroll_offset(205);

    let anchor = b.capture_anchor_at(0).expect("anchor");
    // Offset 205 is inside item 20 (which spans 200..210).
    assert_eq!(anchor.key, 20);
    assert_eq!(anchor.offset_into_item, 5);
}

#[test]
fn tween_sampling_is_monotonic_and_exact_at_the_end() {
    let t = Tween::new(100, 600, 0, 200, Easing::EaseOutCubic);
    let mut prev = t.sample(0);
    assert_eq!(prev, 100);
    for now in (0..=200).step_by(10) {
        let cur = t.sample(now);
        assert!(cur >= prev, "sample went backwards at {now}");
        prev = cur;
    }
    assert_eq!(t.sample(200), 600);
    assert!(t.is_done(200));
    assert!(!t.is_done(199));

    // Backward tweens work too.
    let t = Tween::new(600, 100, 0, 200, Easing::Linear);
    assert_eq!(t.sample(100), 350);
    assert_eq!(t.sample(5_000), 100);
}
