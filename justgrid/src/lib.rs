//! A headless justified-gallery virtualization engine.
//!
//! For adapter-level utilities (paging pump, anchoring, tweens), see the
//! `justgrid-adapter` crate.
//!
//! This crate focuses on the algorithms needed to scroll huge media
//! collections at interactive frame rates: justified row packing by
//! aggregate aspect ratio, cursor-paged section building, viewport-window
//! show/hide, resize-driven re-layout, and velocity-based placeholder
//! rendering during fast scrolls.
//!
//! It is UI-agnostic. A TUI/GUI layer is expected to provide:
//! - viewport geometry and scroll offsets
//! - a render collaborator that draws one tile into a frame
//! - a paging collaborator that resolves [`PageRequest`]s into [`ItemPage`]s
//! - frame ticks with host timestamps (`now_ms`) to drive the timers
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod controller;
mod index;
mod options;
mod row;
mod scroll;
mod section;
mod state;
mod tiler;
mod types;

#[cfg(test)]
mod tests;

pub use controller::Gallery;
pub use index::{GalleryKey, ItemIndexMap};
pub use options::{
    GalleryOptions, ItemClickFn, ItemUpdateFn, OptionsPatch, RenderCleanup, RenderFn, ResizeFn,
    VelocityThreshold,
};
pub use row::Row;
pub use scroll::{ScrollReader, ScrollSignal};
pub use section::Section;
pub use state::{FrameState, ScrollState, ViewportState};
pub use tiler::{RowShape, Tiling, tile};
pub use types::{
    AnchorEdge, Attachment, FetchSummary, FetchTarget, ItemFrame, ItemPage, PageRequest, PageToken,
    RenderOutcome, TickOutcome, Tile, Viewport,
};
