use alloc::string::String;
use alloc::vec::Vec;

/// One layout unit: an opaque host key plus a width/height aspect ratio.
///
/// Tiles are immutable once created; everything the engine derives (row
/// membership, frames, ordinals) is keyed by `key`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile<K> {
    pub key: K,
    /// Width divided by height. Must be positive.
    pub aspect_ratio: f32,
}

impl<K> Tile<K> {
    pub fn new(key: K, aspect_ratio: f32) -> Self {
        debug_assert!(
            aspect_ratio > 0.0,
            "tile aspect ratio must be positive (got {aspect_ratio})"
        );
        Self { key, aspect_ratio }
    }
}

/// Viewport geometry in the engine's coordinate space.
///
/// `main` is the scroll axis extent (height for vertical galleries), `cross`
/// is the packing axis extent (width for vertical galleries).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub main: f32,
    pub cross: f32,
}

/// The rectangle handed to the render collaborator for one visible tile.
///
/// `x` runs along the cross axis, `y` along the scroll axis; both are
/// absolute within the scrollable content.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Explicit lifecycle for rows and sections.
///
/// Replaces "is my render node parented" truthiness: `Detached` has never
/// been mounted (or was torn down), `Attached` is mounted and visible,
/// `Hidden` is mounted but outside the visible window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Attachment {
    Detached,
    Attached,
    Hidden,
}

/// Which cross-axis edge a row's tiles are laid out from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnchorEdge {
    Leading,
    Trailing,
}

/// Opaque resume token owned by the paging collaborator.
///
/// The engine never inspects the contents; it only threads tokens between
/// [`ItemPage::next`] and [`PageRequest::cursor`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageToken(pub String);

/// Where a completed page's rows should land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchTarget {
    /// Grow the tail of the layout.
    Append,
    /// Rebuild a compacted section (by section position).
    Refill(usize),
}

/// A fetch the engine wants the host to perform.
///
/// `cursor == None` means "from the start of the feed". The captured `epoch`
/// is compared on completion; a mismatch means a reset happened in between
/// and the page must be discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    pub cursor: Option<PageToken>,
    pub epoch: u64,
    pub target: FetchTarget,
    /// Opaque passthrough for the paging collaborator (e.g. which media
    /// field drives the query). The engine never interprets it.
    pub selected_field: Option<String>,
}

/// One fetched page. `next == None` ends pagination.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemPage<K> {
    pub items: Vec<Tile<K>>,
    pub next: Option<PageToken>,
}

/// What a completed page did to the layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// New sections appended (0 or 1 per page; pages fill the open tail
    /// section until the rows-per-section cap closes it).
    pub sections_added: usize,
    pub rows_added: usize,
    /// The page raced a reset/detach and was discarded untouched.
    pub stale: bool,
    /// No further pages remain after this one.
    pub exhausted: bool,
    /// The engine wants the next page immediately (viewport underfilled,
    /// nothing materialized yet, or the tail section is already on screen).
    pub needs_more: bool,
}

/// Result of a render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    pub active_section: Option<usize>,
    pub shown: usize,
    pub hidden: usize,
    pub needs_fetch: bool,
}

/// Result of a timer tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A coalesced viewport change was committed this tick.
    pub resized: bool,
    /// A render pass ran (resize settle or zoom re-evaluation).
    pub rendered: bool,
    pub needs_fetch: bool,
}

/// `f32::abs` without `std` (the `core` float API has no `abs`).
#[inline]
pub(crate) fn absf(x: f32) -> f32 {
    if x < 0.0 { -x } else { x }
}
