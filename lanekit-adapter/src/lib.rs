//! Host-side utilities for the `lanekit` virtualization engine.
//!
//! `lanekit` is UI-agnostic: it computes ranges and positions but never
//! touches a scroll container. This crate supplies the framework-neutral
//! plumbing adapters share:
//!
//! - [`ScrollHost`] / [`ItemNode`]: the minimal surface a platform exposes
//! - [`HostBinding`]: the observation loop (events in, measurements in,
//!   programmatic scrolls out), with RAII observer teardown via [`Teardown`]
//! - [`Tween`] / [`Easing`]: adapter-driven smooth scrolling
//! - [`ScrollAnchor`]: pin the viewport to an item across data changes
//! - [`MockHost`]: an in-memory host for tests and headless use
//!
//! No toolkit bindings live here; those layer on top.

#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod anchor;
mod binding;
mod host;
mod tween;

#[cfg(test)]
mod tests;

pub use anchor::{ScrollAnchor, apply_anchor, capture_first_visible_anchor};
pub use binding::HostBinding;
pub use host::{HostEvent, ItemNode, MeasuredNode, MockHost, ScrollHost, Teardown};
pub use tween::{Easing, Tween};
