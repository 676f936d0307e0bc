//! Adapter utilities for the `justgrid` crate.
//!
//! The `justgrid` crate is UI-agnostic and focuses on layout math and
//! lifecycle state; paging is an explicit request/complete loop the host is
//! expected to drive. This crate provides small, framework-neutral helpers
//! commonly needed around that loop:
//!
//! - A [`PageSource`] seam plus a [`Driver`] that pumps fetches until the
//!   viewport is satisfied (synchronous hosts; async hosts keep driving the
//!   engine directly)
//! - Scroll anchoring across re-tiles and resets
//! - Tween-based smooth scrolling helpers (optional; adapter-driven)
//!
//! This crate is intentionally framework-agnostic (no ratatui/egui
//! bindings).
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod anchor;
mod driver;
mod source;
mod tween;


pub use anchor::{ScrollAnchor, apply_anchor, capture_anchor};
pub use driver::Driver;
pub use source::{PageSource, SliceSource};
pub use tween::{Easing, Tween};
