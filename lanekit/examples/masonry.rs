// Example: three-column masonry with deferred (shortest-lane) packing.
use lanekit::{EngineOptions, Virtualizer};

fn main() {
    let mut opts = EngineOptions::new(30, |_| 120);
    opts.lanes = 3;
    opts.defer_lane_assignment = true;
    opts.gap = 8;
    let mut v = Virtualizer::new(opts).expect("valid options");
    v.set_viewport_and_scroll(800, 0);

    // Simulate image cards of varying heights arriving from layout.
    v.measure_many((0..30).map(|i| (i, 90 + ((i as u32 * 37) % 150))));

    for lane in 0..3 {
        print!("lane {lane}:");
        v.for_each_virtual_item(|it| {
            if it.lane == lane {
                print!(" #{}@{}..{}", it.index, it.start, it.end());
            }
        });
        println!();
    }
    println!("total_size={}", v.total_size());
    println!("committed_assignments={}", v.lane_assignment_cache_len());
}
