use alloc::vec::Vec;

use crate::options::{RenderCleanup, RenderFn};
use crate::tiler::RowShape;
use crate::types::{AnchorEdge, Attachment, ItemFrame, Tile};

/// One justified row: an ordered run of tiles sharing a height.
///
/// Offsets are relative to the owning section; the section's absolute offset
/// is supplied at show time. The row holds no render objects, only the
/// cleanup handles its render dispatches returned.
pub struct Row<K> {
    shape: RowShape<K>,
    offset: f32,
    cross_extent: f32,
    gap: f32,
    height: f32,
    attachment: Attachment,
    edge: AnchorEdge,
    cleanups: Vec<Option<RenderCleanup>>,
}

impl<K> Row<K> {
    pub(crate) fn new(shape: RowShape<K>, offset: f32, cross_extent: f32, gap: f32) -> Self {
        let mut cleanups = Vec::new();
        cleanups.resize_with(shape.tiles.len(), || None);
        let mut row = Self {
            shape,
            offset,
            cross_extent,
            gap,
            height: 0.0,
            attachment: Attachment::Detached,
            edge: AnchorEdge::Leading,
            cleanups,
        };
        row.remeasure(cross_extent, gap);
        row
    }

    pub fn tiles(&self) -> &[Tile<K>] {
        &self.shape.tiles
    }

    pub fn len(&self) -> usize {
        self.shape.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.tiles.is_empty()
    }

    pub fn aggregate_ratio(&self) -> f32 {
        self.shape.aggregate_ratio
    }

    pub fn extra_margins(&self) -> usize {
        self.shape.extra_margins
    }

    /// Main-axis offset relative to the owning section.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub fn edge(&self) -> AnchorEdge {
        self.edge
    }

    /// Flips which cross-axis edge anchors the tiles (reversed/backward
    /// pages lay out from the trailing edge).
    pub fn switch_edge(&mut self) {
        self.edge = match self.edge {
            AnchorEdge::Leading => AnchorEdge::Trailing,
            AnchorEdge::Trailing => AnchorEdge::Leading,
        };
    }

    fn margin_count(&self) -> usize {
        self.shape.tiles.len().saturating_sub(1) + self.shape.extra_margins
    }

    /// Recomputes the shared height for a new cross extent / gap.
    ///
    /// Invariant: tile widths plus inter-tile gaps (phantom slots included)
    /// fill the cross extent exactly.
    pub(crate) fn remeasure(&mut self, cross_extent: f32, gap: f32) {
        self.cross_extent = cross_extent;
        self.gap = gap;
        let margins = self.margin_count() as f32 * gap;
        self.height = ((cross_extent - margins) / self.shape.aggregate_ratio).max(0.0);
    }

    /// The frame of tile `i`, given the owning section's absolute offset.
    pub fn frame_of(&self, i: usize, section_offset: f32) -> ItemFrame {
        let height = self.height;
        let mut x = 0.0f32;
        for tile in &self.shape.tiles[..i] {
            x += tile.aspect_ratio * height + self.gap;
        }
        let width = self.shape.tiles[i].aspect_ratio * height;
        let x = match self.edge {
            AnchorEdge::Leading => x,
            AnchorEdge::Trailing => self.cross_extent - x - width,
        };
        ItemFrame {
            x,
            y: section_offset + self.offset,
            width,
            height,
        }
    }

    /// Attaches the row and dispatches the render collaborator for every
    /// tile. `soft` marks a refresh of an already-visible row; `zooming`
    /// asks the renderer for placeholders.
    pub(crate) fn show(
        &mut self,
        render: &RenderFn<K>,
        section_offset: f32,
        soft: bool,
        zooming: bool,
    ) {
        self.attachment = Attachment::Attached;
        let height = self.height;
        let y = section_offset + self.offset;
        let mut x = 0.0f32;
        for (i, tile) in self.shape.tiles.iter().enumerate() {
            let width = tile.aspect_ratio * height;
            let frame_x = match self.edge {
                AnchorEdge::Leading => x,
                AnchorEdge::Trailing => self.cross_extent - x - width,
            };
            let frame = ItemFrame {
                x: frame_x,
                y,
                width,
                height,
            };
            // The slot is being replaced; tear the previous render down first.
            if let Some(mut cleanup) = self.cleanups[i].take() {
                cleanup();
            }
            self.cleanups[i] = render(&tile.key, frame, soft, zooming);
            x += width + self.gap;
        }
    }

    /// Detaches the row's render output.
    ///
    /// Panics when the row is already detached: hiding something that was
    /// never shown means the caller's visibility bookkeeping is corrupt.
    pub(crate) fn hide(&mut self) {
        assert!(
            self.attachment != Attachment::Detached,
            "hide on a detached row"
        );
        self.attachment = Attachment::Hidden;
        self.release();
    }

    /// Runs and drops the cached cleanup handles so host-side payloads
    /// become collectible. Lifecycle and ordinals are untouched.
    pub(crate) fn release(&mut self) {
        for slot in &mut self.cleanups {
            if let Some(mut cleanup) = slot.take() {
                cleanup();
            }
        }
    }

    /// Unconditional teardown, used when the whole tree is being discarded.
    pub(crate) fn force_detach(&mut self) {
        self.release();
        self.attachment = Attachment::Detached;
    }

    pub(crate) fn into_tiles(self) -> Vec<Tile<K>> {
        self.shape.tiles
    }
}

impl<K: core::fmt::Debug> core::fmt::Debug for Row<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Row")
            .field("tiles", &self.shape.tiles)
            .field("aggregate_ratio", &self.shape.aggregate_ratio)
            .field("extra_margins", &self.shape.extra_margins)
            .field("offset", &self.offset)
            .field("height", &self.height)
            .field("attachment", &self.attachment)
            .field("edge", &self.edge)
            .finish_non_exhaustive()
    }
}
