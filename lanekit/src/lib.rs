//! Headless virtualization engine for large scrollable lists, grids and
//! masonry layouts.
//!
//! `lanekit` computes which items of a huge collection are visible in a
//! viewport and where to place them, without owning any UI objects. Hosts
//! (GUI toolkits, TUIs, game UIs, web views) drive the engine with viewport
//! rects, scroll offsets and element measurements, and read back item
//! positions to materialize only what is on screen.
//!
//! # Quick start
//!
//! ```
//! use lanekit::{EngineOptions, Rect, Virtualizer};
//!
//! let mut v = Virtualizer::new(
//!     EngineOptions::new(10_000, |_| 40).with_overscan(2),
//! )
//! .unwrap();
//!
//! v.set_scroll_rect(Rect { width: 320, height: 400 });
//! v.set_scroll_offset(1_200);
//!
//! // Only the on-screen window (plus overscan) is materialized.
//! v.for_each_virtual_item(|item| {
//!     let _ = (item.index, item.start, item.size, item.lane);
//! });
//! assert_eq!(v.total_size(), 400_000);
//! ```
//!
//! # Design notes
//!
//! - All geometry is integer-based: sizes are `u32`, offsets `u64`, deltas
//!   `i64`. No float drift across incremental updates.
//! - Measured sizes are cached per item *key*, so measurements follow items
//!   across dataset reordering (see [`EngineOptions::new_with_key`]).
//! - Multi-lane layouts assign items to lanes either eagerly (`index % lanes`)
//!   or deferred to the shortest lane once measured (masonry); see
//!   [`EngineOptions::with_defer_lane_assignment`].
//! - Out-of-range inputs are clamped, never panicked on: a stale scroll offset
//!   or index from a host that has not caught up with a dataset change yields
//!   the nearest valid result.
//! - The engine is single-threaded by design; wrap it in your own lock if a
//!   host needs to share it.

#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod error;
mod extract;
mod geometry;
mod options;
mod store;
mod types;
mod virtualizer;


pub use error::ConfigError;
pub use extract::IndexEmitter;
pub use options::{
    EngineOptions, InitialOffset, OnChangeCallback, PerformScrollCallback, RangeExtractor,
    ShouldAdjustScrollCallback,
};
pub use store::Key;
pub use types::{
    Align, ItemKey, Range, Rect, ScrollBehavior, ScrollDirection, VirtualItem, VirtualRange,
};
pub use virtualizer::{ScrollRequest, Virtualizer};
