use alloc::vec::Vec;

use crate::options::RenderFn;
use crate::row::Row;
use crate::tiler::RowShape;
use crate::types::{Attachment, PageToken, Tile};

/// A batch of rows built from one stretch of the paged feed: the unit of
/// show/hide and of memory compaction.
///
/// Sections are contiguous and non-overlapping along the scroll axis; the
/// controller owns their ordering and absolute offsets.
pub struct Section<K> {
    page_key: u64,
    first_ordinal: u64,
    offset: f32,
    rows: Vec<Row<K>>,
    tile_count: usize,
    cross_extent: f32,
    gap: f32,
    attachment: Attachment,
    /// The controller's out-of-band item updates have reached this section.
    clean: bool,
    compacted: bool,
    /// Height preserved across compaction so the scroll range stays stable.
    retained_height: f32,
    /// Cursor that began this section's first page (`None` = start of feed).
    start_cursor: Option<PageToken>,
    /// Cursor after this section's last consumed page (`None` = exhausted).
    end_cursor: Option<PageToken>,
}

impl<K> Section<K> {
    pub(crate) fn new(page_key: u64, first_ordinal: u64, offset: f32) -> Self {
        Self {
            page_key,
            first_ordinal,
            offset,
            rows: Vec::new(),
            tile_count: 0,
            cross_extent: 0.0,
            gap: 0.0,
            attachment: Attachment::Detached,
            clean: true,
            compacted: false,
            retained_height: 0.0,
            start_cursor: None,
            end_cursor: None,
        }
    }

    pub fn page_key(&self) -> u64 {
        self.page_key
    }

    /// Global ordinal of this section's first tile.
    pub fn first_ordinal(&self) -> u64 {
        self.first_ordinal
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
    }

    pub fn rows(&self) -> &[Row<K>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    /// Last row offset + height + gap; a row-less section keeps whatever
    /// height it had when it compacted.
    pub fn height(&self) -> f32 {
        if self.compacted {
            return self.retained_height;
        }
        match self.rows.last() {
            Some(row) => row.offset() + row.height() + self.gap,
            None => 0.0,
        }
    }

    pub fn contains(&self, offset: f32) -> bool {
        offset >= self.offset && offset < self.offset + self.height()
    }

    /// First row covering `local` (a section-relative offset), else the last.
    pub fn row_at(&self, local: f32) -> Option<&Row<K>> {
        for row in &self.rows {
            if local < row.offset() + row.height() + self.gap {
                return Some(row);
            }
        }
        self.rows.last()
    }

    pub fn is_attached(&self) -> bool {
        self.attachment != Attachment::Detached
    }

    pub fn is_shown(&self) -> bool {
        self.attachment == Attachment::Attached
    }

    pub fn is_clean(&self) -> bool {
        self.clean
    }

    pub(crate) fn set_clean(&mut self, clean: bool) {
        self.clean = clean;
    }

    pub fn is_compacted(&self) -> bool {
        self.compacted
    }

    pub fn start_cursor(&self) -> Option<&PageToken> {
        self.start_cursor.as_ref()
    }

    pub fn end_cursor(&self) -> Option<&PageToken> {
        self.end_cursor.as_ref()
    }

    pub(crate) fn set_cursors(&mut self, start: Option<PageToken>, end: Option<PageToken>) {
        self.start_cursor = start;
        self.end_cursor = end;
    }

    pub(crate) fn set_end_cursor(&mut self, end: Option<PageToken>) {
        self.end_cursor = end;
    }

    /// Mounts the section. Panics on a second mount: attach is once per
    /// lifecycle, everything after is show/hide.
    pub(crate) fn attach(&mut self) {
        assert!(
            self.attachment == Attachment::Detached,
            "section attached twice"
        );
        self.attachment = Attachment::Hidden;
    }

    /// Appends freshly tiled rows, stacking them below the existing ones.
    pub(crate) fn absorb(&mut self, shapes: Vec<RowShape<K>>, cross_extent: f32, gap: f32) {
        self.cross_extent = cross_extent;
        self.gap = gap;
        for shape in shapes {
            let offset = match self.rows.last() {
                Some(row) => row.offset() + row.height() + gap,
                None => 0.0,
            };
            self.tile_count += shape.tiles.len();
            self.rows.push(Row::new(shape, offset, cross_extent, gap));
        }
    }

    /// Drops built rows but keeps the measured height and cursor pair, so
    /// the scroll range is stable and a later refill starts clean.
    pub(crate) fn compact(&mut self) {
        self.retained_height = self.height();
        for row in &mut self.rows {
            row.force_detach();
        }
        self.rows.clear();
        self.tile_count = 0;
        self.compacted = true;
        if self.attachment == Attachment::Attached {
            self.attachment = Attachment::Hidden;
        }
    }

    /// Marks a refill complete: the section's height derives from its rows
    /// again. Until then the retained height keeps the scroll range stable
    /// while refill pages stream in.
    pub(crate) fn finish_refill(&mut self) {
        self.compacted = false;
        self.retained_height = 0.0;
    }

    /// Whether this section was measured against a different cross extent
    /// than the current one (it was hidden during a resize).
    pub fn needs_remeasure(&self, cross_extent: f32, gap: f32) -> bool {
        !self.rows.is_empty() && (self.cross_extent != cross_extent || self.gap != gap)
    }

    /// In-place re-layout for a new cross extent, without re-tiling.
    pub(crate) fn remeasure(&mut self, cross_extent: f32, gap: f32) {
        // Justified row heights scale with the cross extent, so a compacted
        // placeholder's retained height scales along with its neighbors.
        if self.compacted && self.cross_extent > 0.0 {
            self.retained_height *= cross_extent / self.cross_extent;
        }
        self.cross_extent = cross_extent;
        self.gap = gap;
        let mut offset = 0.0f32;
        for row in &mut self.rows {
            row.remeasure(cross_extent, gap);
            row.set_offset(offset);
            offset += row.height() + gap;
        }
    }

    pub(crate) fn show_rows(&mut self, render: &RenderFn<K>, soft: bool, zooming: bool) {
        let offset = self.offset;
        for row in &mut self.rows {
            row.show(render, offset, soft, zooming);
        }
        self.attachment = Attachment::Attached;
    }

    pub(crate) fn hide_rows(&mut self) {
        for row in &mut self.rows {
            // Rows absorbed after the last show pass were never rendered.
            if row.attachment() != Attachment::Detached {
                row.hide();
            }
        }
        self.attachment = Attachment::Hidden;
    }

    pub(crate) fn force_detach(&mut self) {
        for row in &mut self.rows {
            row.force_detach();
        }
        self.attachment = Attachment::Detached;
    }

    /// Drops cached render payloads for every row without changing
    /// visibility state or ordinals.
    pub(crate) fn release_rows(&mut self) {
        for row in &mut self.rows {
            row.release();
        }
    }

    pub fn for_each_key(&self, mut f: impl FnMut(&K)) {
        for row in &self.rows {
            for tile in row.tiles() {
                f(&tile.key);
            }
        }
    }

    /// Strips the section down to its tiles, in order (empty if compacted).
    pub(crate) fn take_tiles(&mut self) -> Vec<Tile<K>> {
        self.tile_count = 0;
        let rows = core::mem::take(&mut self.rows);
        let mut tiles = Vec::new();
        for row in rows {
            tiles.extend(row.into_tiles());
        }
        tiles
    }
}

impl<K: core::fmt::Debug> core::fmt::Debug for Section<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Section")
            .field("page_key", &self.page_key)
            .field("first_ordinal", &self.first_ordinal)
            .field("offset", &self.offset)
            .field("rows", &self.rows.len())
            .field("tile_count", &self.tile_count)
            .field("attachment", &self.attachment)
            .field("clean", &self.clean)
            .field("compacted", &self.compacted)
            .field("start_cursor", &self.start_cursor)
            .field("end_cursor", &self.end_cursor)
            .finish_non_exhaustive()
    }
}
