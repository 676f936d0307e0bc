use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::index::{GalleryKey, ItemIndexMap};
use crate::options::{GalleryOptions, ItemUpdateFn, OptionsPatch};
use crate::scroll::{ScrollReader, ScrollSignal};
use crate::section::Section;
use crate::state::{FrameState, ScrollState, ViewportState};
use crate::tiler::{RowShape, tile};
use crate::types::{
    FetchSummary, FetchTarget, ItemPage, PageRequest, PageToken, RenderOutcome, TickOutcome, Tile,
    Viewport,
};

#[derive(Clone, Debug, PartialEq, Eq)]
enum CursorState {
    /// Nothing fetched yet; the first request carries no token.
    Start,
    Next(PageToken),
    Exhausted,
}

/// An in-progress refill of a compacted section. The section stays
/// compacted (height stable) until the recorded end cursor is reached;
/// `remainder` carries unclosed tiles between refill pages.
#[derive(Debug)]
struct RefillState<K> {
    section: usize,
    resume: PageToken,
    remainder: Vec<Tile<K>>,
}

/// A headless justified-gallery virtualization engine.
///
/// This type is intentionally UI-agnostic:
/// - It holds no render objects; the render collaborator receives keys and
///   frames and owns everything visual.
/// - Hosts drive it with scroll offsets, viewport geometry, and `tick`
///   calls; time is always injected as `now_ms`.
/// - Paging is an explicit request/complete task: [`Gallery::request_page`]
///   arms at most one in-flight fetch, the host resolves it however it
///   likes (sync or async) and reports back via [`Gallery::complete_page`].
///   A monotonic epoch, bumped on every reset, cancels stale completions.
///
/// For a synchronous pump around this loop, see the `justgrid-adapter`
/// crate.
pub struct Gallery<K> {
    options: GalleryOptions<K>,
    attached: bool,
    viewport: Viewport,
    scroll_offset: f32,
    sections: Vec<Section<K>>,
    remainder: Vec<Tile<K>>,
    refill: Option<RefillState<K>>,
    index: ItemIndexMap<K>,
    cursor: CursorState,
    loading: bool,
    epoch: u64,
    page_counter: u64,
    zoom: ScrollReader,
    resizing: bool,
    pending_viewport: Option<Viewport>,
    settle_deadline_ms: Option<u64>,
    pending_update: Option<ItemUpdateFn<K>>,
}

impl<K: GalleryKey> Gallery<K> {
    pub fn new(options: GalleryOptions<K>) -> Self {
        let zoom = ScrollReader::embedded(
            options.horizontal,
            Arc::clone(&options.velocity_threshold),
            options.zoom_quiet_ms,
        );
        gdebug!(
            threshold = options.row_aspect_ratio_threshold,
            rows_per_section = options.rows_per_section,
            "Gallery::new"
        );
        Self {
            options,
            attached: false,
            viewport: Viewport::default(),
            scroll_offset: 0.0,
            sections: Vec::new(),
            remainder: Vec::new(),
            refill: None,
            index: ItemIndexMap::new(),
            cursor: CursorState::Start,
            loading: false,
            epoch: 0,
            page_counter: 0,
            zoom,
            resizing: false,
            pending_viewport: None,
            settle_deadline_ms: None,
            pending_update: None,
        }
    }

    pub fn options(&self) -> &GalleryOptions<K> {
        &self.options
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.cursor, CursorState::Exhausted)
    }

    pub fn is_zooming(&self) -> bool {
        self.zoom.is_zooming()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn sections(&self) -> &[Section<K>] {
        &self.sections
    }

    pub fn item_index(&self) -> &ItemIndexMap<K> {
        &self.index
    }

    pub fn item_ordinal(&self, key: &K) -> Option<u64> {
        self.index.ordinal(key)
    }

    pub fn item_count(&self) -> usize {
        self.index.len()
    }

    /// Total laid-out extent along the scroll axis.
    pub fn total_extent(&self) -> f32 {
        match self.sections.last() {
            Some(section) => section.offset() + section.height(),
            None => self.options.leading_offset,
        }
    }

    pub fn max_scroll_offset(&self) -> f32 {
        (self.total_extent() - self.viewport.main).max(0.0)
    }

    pub fn clamp_scroll_offset(&self, offset: f32) -> f32 {
        offset.clamp(0.0, self.max_scroll_offset())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Measures the mount point and arms the first fetch.
    ///
    /// Re-attaching after [`Gallery::detach`] is equivalent to a fresh
    /// reset: any state left from the previous attachment is discarded.
    pub fn attach(&mut self, viewport: Viewport) -> Option<PageRequest> {
        if self.attached {
            return None;
        }
        // Also invalidates any fetch still in flight from a prior attachment.
        self.clear_all();
        self.attached = true;
        self.viewport = viewport;
        gdebug!(main = viewport.main, cross = viewport.cross, "attach");
        self.request_page()
    }

    /// Tears the render tree down. Idempotent; layout state survives until
    /// the next `attach`, which starts over.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        gdebug!("detach");
        for section in &mut self.sections {
            section.force_detach();
        }
        self.attached = false;
        self.resizing = false;
        self.pending_viewport = None;
        self.settle_deadline_ms = None;
    }

    /// Discards all layout and index state and re-fetches from scratch.
    ///
    /// Bumps the epoch, so any in-flight fetch is discarded on completion.
    pub fn reset(&mut self) -> Option<PageRequest> {
        gdebug!(epoch = self.epoch, "reset");
        self.clear_all();
        if self.attached { self.request_page() } else { None }
    }

    fn clear_all(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        for section in &mut self.sections {
            section.force_detach();
        }
        self.sections.clear();
        self.remainder.clear();
        self.refill = None;
        self.index.reset();
        self.cursor = CursorState::Start;
        self.loading = false;
        self.scroll_offset = 0.0;
        self.page_counter = 0;
        self.pending_update = None;
    }

    // ------------------------------------------------------------------
    // Options / resize
    // ------------------------------------------------------------------

    /// Applies an options patch.
    ///
    /// When a value actually changed (or `force_retile` is set) and sections
    /// exist, the whole layout is rebuilt: all materialized tiles are
    /// flattened in order, re-tiled under the new options, and the scroll
    /// offset is re-anchored so the previously active item stays put.
    /// Returns whether a rebuild happened.
    pub fn update_options(&mut self, patch: &OptionsPatch, force_retile: bool) -> bool {
        let changed = patch.apply(&mut self.options);
        if self.sections.is_empty() {
            return false;
        }
        if !changed && !force_retile {
            return false;
        }
        self.retile_all();
        true
    }

    /// Registers a viewport change. Coalesced: bursts are merged and the
    /// last value wins when the next `tick` commits it.
    pub fn notify_resize(&mut self, viewport: Viewport) {
        self.pending_viewport = Some(viewport);
    }

    /// Immediate viewport change, bypassing coalescing. Cross-extent-only
    /// changes take the cheap re-measure path; the rest is bookkeeping.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let cross_changed = viewport.cross != self.viewport.cross;
        self.viewport = viewport;
        if cross_changed {
            self.remeasure_all();
        }
    }

    fn commit_resize(&mut self, viewport: Viewport, now_ms: u64) -> bool {
        if viewport == self.viewport {
            return false;
        }
        let cross_changed = viewport.cross != self.viewport.cross;
        gdebug!(
            main = viewport.main,
            cross = viewport.cross,
            cross_changed,
            "commit resize"
        );
        self.viewport = viewport;
        // A resize-induced scroll jump must never register as a user zoom.
        self.resizing = true;
        self.settle_deadline_ms = Some(now_ms.saturating_add(self.options.resize_settle_ms));

        let patch = self.options.on_resize.as_ref().map(|f| f(viewport.cross));
        let retiled = match patch {
            Some(patch) => self.update_options(&patch, false),
            None => false,
        };
        if !retiled && cross_changed {
            self.remeasure_all();
        }
        let _ = self.render(false);
        true
    }

    /// Re-measures every row against the current cross extent, in place,
    /// without re-tiling. Heights are pure math, so hidden sections update
    /// too and the section offsets stay consistent.
    fn remeasure_all(&mut self) {
        let cross = self.viewport.cross;
        let gap = self.options.gap;
        for section in &mut self.sections {
            section.remeasure(cross, gap);
        }
        self.reflow_sections();
    }

    fn reflow_sections(&mut self) {
        let mut offset = self.options.leading_offset;
        for section in &mut self.sections {
            section.set_offset(offset);
            offset += section.height();
        }
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// The backpressure-guarded fetch driver.
    ///
    /// Returns `None` while a fetch is in flight, pagination is exhausted
    /// (and nothing needs refilling), or the engine is detached; no
    /// queueing; scroll/resize/render paths re-trigger naturally. Otherwise
    /// flips the in-flight guard and hands out the request to resolve.
    pub fn request_page(&mut self) -> Option<PageRequest> {
        if self.loading || !self.attached {
            return None;
        }
        // A compacted section inside the window refills before the tail grows.
        if let Some(idx) = self.compacted_in_window() {
            // Refills don't interleave: switching targets drops the paused
            // one's partial rows so its next attempt starts clean.
            if let Some(paused) = self.refill.take_if(|r| r.section != idx) {
                if paused.section < self.sections.len() {
                    self.sections[paused.section].compact();
                }
            }
            let cursor = match &self.refill {
                Some(refill) => Some(refill.resume.clone()),
                None => self.sections[idx].start_cursor().cloned(),
            };
            self.loading = true;
            gtrace!(section = idx, epoch = self.epoch, "request refill");
            return Some(PageRequest {
                cursor,
                epoch: self.epoch,
                target: FetchTarget::Refill(idx),
                selected_field: self.options.selected_field.clone(),
            });
        }
        let cursor = match &self.cursor {
            CursorState::Start => None,
            CursorState::Next(token) => Some(token.clone()),
            CursorState::Exhausted => return None,
        };
        self.loading = true;
        gtrace!(epoch = self.epoch, "request page");
        Some(PageRequest {
            cursor,
            epoch: self.epoch,
            target: FetchTarget::Append,
            selected_field: self.options.selected_field.clone(),
        })
    }

    /// Reports a resolved fetch back.
    ///
    /// A completion whose epoch no longer matches (a reset intervened) is
    /// discarded without touching post-reset state. An `Err` propagates
    /// verbatim and leaves the in-flight guard set: a permanently failing
    /// source stalls further fetching until the host retries the same
    /// request or resets.
    pub fn complete_page<E>(
        &mut self,
        request: &PageRequest,
        result: Result<ItemPage<K>, E>,
    ) -> Result<FetchSummary, E> {
        if request.epoch != self.epoch {
            gdebug!(
                stale = request.epoch,
                current = self.epoch,
                "discarding stale page"
            );
            return Ok(FetchSummary {
                stale: true,
                ..FetchSummary::default()
            });
        }
        let page = result?;
        self.loading = false;
        if !self.attached {
            return Ok(FetchSummary {
                stale: true,
                ..FetchSummary::default()
            });
        }
        let summary = match request.target {
            FetchTarget::Append => self.absorb_append(page),
            FetchTarget::Refill(idx) => self.absorb_refill(idx, page),
        };
        Ok(summary)
    }

    fn absorb_append(&mut self, page: ItemPage<K>) -> FetchSummary {
        let page_start = match &self.cursor {
            CursorState::Next(token) => Some(token.clone()),
            CursorState::Start | CursorState::Exhausted => None,
        };
        self.cursor = match page.next.clone() {
            Some(token) => CursorState::Next(token),
            None => CursorState::Exhausted,
        };
        let has_more = matches!(self.cursor, CursorState::Next(_));

        for tile in &page.items {
            debug_assert!(tile.aspect_ratio > 0.0, "non-positive aspect ratio");
            self.index.record(&tile.key);
        }

        let mut pending = core::mem::take(&mut self.remainder);
        pending.extend(page.items);
        let tiling = tile(
            pending,
            self.options.row_aspect_ratio_threshold,
            has_more,
        );
        self.remainder = tiling.remainder;

        let mut summary = FetchSummary {
            exhausted: !has_more,
            rows_added: tiling.rows.len(),
            ..FetchSummary::default()
        };

        let mut tail_shown = false;
        if !tiling.rows.is_empty() {
            let cap = self.options.rows_per_section.max(1);
            let open_tail = matches!(
                self.sections.last(),
                Some(s) if !s.is_compacted() && s.row_count() < cap
            );
            if !open_tail {
                let first_ordinal = tiling.rows[0]
                    .tiles
                    .first()
                    .and_then(|t| self.index.ordinal(&t.key))
                    .unwrap_or_default();
                let mut section =
                    Section::new(self.page_counter, first_ordinal, self.total_extent());
                self.page_counter += 1;
                section.set_cursors(page_start, page.next.clone());
                self.sections.push(section);
                summary.sections_added = 1;
            }
            let idx = self.sections.len() - 1;
            self.sections[idx].absorb(tiling.rows, self.viewport.cross, self.options.gap);
            self.sections[idx].set_end_cursor(page.next);
            if self.sections[idx].row_count() > self.options.compact_row_cap {
                gdebug!(section = idx, "compacting oversized section");
                self.sections[idx].compact();
            }
            tail_shown = self.sections[idx].is_shown();
            self.reflow_sections();
        }

        let underfilled = self.total_extent() < self.viewport.main;
        summary.needs_more = has_more && (underfilled || summary.rows_added == 0 || tail_shown);
        gtrace!(
            rows = summary.rows_added,
            sections = summary.sections_added,
            needs_more = summary.needs_more,
            "page absorbed"
        );
        summary
    }

    fn absorb_refill(&mut self, idx: usize, page: ItemPage<K>) -> FetchSummary {
        if idx >= self.sections.len() {
            // The section was rebuilt away while the fetch was in flight.
            gwarn!(section = idx, "refill target vanished, dropping page");
            self.refill = None;
            return FetchSummary {
                stale: true,
                ..FetchSummary::default()
            };
        }
        for tile in &page.items {
            self.index.record(&tile.key);
        }
        let done = match (&page.next, self.sections[idx].end_cursor()) {
            (None, _) => true,
            (Some(next), Some(end)) => next == end,
            (Some(_), None) => false,
        };

        let mut pending = match self.refill.take() {
            Some(refill) if refill.section == idx => refill.remainder,
            _ => Vec::new(),
        };
        pending.extend(page.items);
        let tiling = tile(pending, self.options.row_aspect_ratio_threshold, !done);

        let section = &mut self.sections[idx];
        let rows_added = tiling.rows.len();
        section.absorb(tiling.rows, self.viewport.cross, self.options.gap);
        section.set_clean(false);
        if done {
            section.finish_refill();
        } else if let Some(resume) = page.next {
            self.refill = Some(RefillState {
                section: idx,
                resume,
                remainder: tiling.remainder,
            });
        }
        self.reflow_sections();

        FetchSummary {
            rows_added,
            needs_more: !done,
            ..FetchSummary::default()
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// The viewport-driven core loop.
    ///
    /// Finds the section under the scroll offset, expands the lookahead
    /// window, hides sections that left it, shows sections that entered it
    /// (pushing pending item updates and deferred re-measures first), and
    /// dispatches every visible row with the current zooming flag.
    pub fn render(&mut self, zooming: bool) -> RenderOutcome {
        let mut out = RenderOutcome::default();
        if !self.attached {
            return out;
        }
        if self.sections.is_empty() {
            out.needs_fetch = !self.loading && !self.is_exhausted();
            return out;
        }
        let Some(active) = self.active_section() else {
            panic!(
                "no active section for offset {} across {} sections",
                self.scroll_offset,
                self.sections.len()
            );
        };
        out.active_section = Some(active);
        let lo = active.saturating_sub(self.options.lookahead);
        let hi = (active + self.options.lookahead).min(self.sections.len() - 1);

        for i in 0..self.sections.len() {
            if (i < lo || i > hi) && self.sections[i].is_shown() {
                self.sections[i].hide_rows();
                out.hidden += 1;
            }
        }

        // Deferred re-measures (sections resized while hidden) move section
        // boundaries, so settle them before any row renders.
        let cross = self.viewport.cross;
        let gap = self.options.gap;
        let mut moved = false;
        for i in lo..=hi {
            if self.sections[i].needs_remeasure(cross, gap) {
                self.sections[i].remeasure(cross, gap);
                moved = true;
            }
        }
        if moved {
            self.reflow_sections();
        }

        let render_fn = Arc::clone(&self.options.render);
        let pending_update = self.pending_update.clone();
        for i in lo..=hi {
            let first_show = !self.sections[i].is_shown();
            if !self.sections[i].is_attached() {
                self.sections[i].attach();
            }
            if first_show && !self.sections[i].is_clean() {
                if let Some(update) = &pending_update {
                    self.sections[i].for_each_key(|key| update(key));
                }
                self.sections[i].set_clean(true);
            }
            self.sections[i].show_rows(&render_fn, !first_show, zooming);
            out.shown += 1;
        }

        let compacted_in_window = (lo..=hi).any(|i| self.sections[i].is_compacted());
        let at_tail = hi + 1 == self.sections.len() && !self.is_exhausted();
        out.needs_fetch = !self.loading && (compacted_in_window || at_tail);
        out
    }

    /// Re-invokes `updater` for every item in every currently shown
    /// section, without re-tiling. Hidden sections are marked stale and get
    /// the update pushed when they next come on screen.
    pub fn update_items(&mut self, updater: impl Fn(&K) + Send + Sync + 'static) {
        let updater: ItemUpdateFn<K> = Arc::new(updater);
        for section in &mut self.sections {
            if section.is_shown() {
                section.for_each_key(|key| updater(key));
                section.set_clean(true);
            } else {
                section.set_clean(false);
            }
        }
        self.pending_update = Some(updater);
    }

    /// Drops cached render payloads everywhere without touching visibility
    /// or ordinals, so hosts can reclaim memory under pressure.
    pub fn release_payloads(&mut self) {
        for section in &mut self.sections {
            section.release_rows();
        }
    }

    // ------------------------------------------------------------------
    // Input events
    // ------------------------------------------------------------------

    /// Feeds a scroll sample and renders.
    ///
    /// While a resize is settling the velocity detector only observes the
    /// position, so the layout jump cannot read as a user zoom.
    pub fn notify_scroll(&mut self, offset: f32, now_ms: u64) -> RenderOutcome {
        self.scroll_offset = offset.max(0.0);
        if !self.attached {
            return RenderOutcome::default();
        }
        if self.resizing {
            self.zoom.observe(self.scroll_offset);
            return self.render(false);
        }
        let zooming = match self.zoom.sample(self.scroll_offset, now_ms) {
            ScrollSignal::Render { zooming } => zooming,
            ScrollSignal::Idle => self.zoom.is_zooming(),
        };
        self.render(zooming)
    }

    /// Advances the engine's timers: commits a coalesced resize, expires
    /// the resize settle deadline (final render), and re-evaluates zoom
    /// recovery. Call once per host frame.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        let mut out = TickOutcome::default();
        if !self.attached {
            return out;
        }
        if let Some(viewport) = self.pending_viewport.take() {
            out.resized = self.commit_resize(viewport, now_ms);
            out.rendered |= out.resized;
        }
        if let Some(deadline) = self.settle_deadline_ms {
            if now_ms >= deadline {
                self.settle_deadline_ms = None;
                self.resizing = false;
                let render = self.render(false);
                out.rendered = true;
                out.needs_fetch |= render.needs_fetch;
            }
        }
        if !self.resizing {
            if let ScrollSignal::Render { zooming } = self.zoom.tick(now_ms) {
                let render = self.render(zooming);
                out.rendered = true;
                out.needs_fetch |= render.needs_fetch;
            }
        }
        out
    }

    /// Forwards a click to the click collaborator. A `true` return asks for
    /// another page ("load more" affordances), which arms a fetch here.
    pub fn notify_item_click(&mut self, key: &K) -> Option<PageRequest> {
        let callback = self.options.on_item_click.clone()?;
        if callback(key, &self.index) {
            self.request_page()
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Anchoring / lookup
    // ------------------------------------------------------------------

    /// The first item of the row under the current scroll offset, plus the
    /// distance scrolled into that row. This is the identity kept stable
    /// across re-tiles.
    pub fn active_item(&self) -> Option<(K, f32)> {
        let idx = self.active_section()?;
        let section = &self.sections[idx];
        let row = section.row_at(self.scroll_offset - section.offset())?;
        let key = row.tiles().first()?.key.clone();
        Some((key, self.scroll_offset - (section.offset() + row.offset())))
    }

    /// Absolute scroll-axis offset of the row containing `key`.
    pub fn item_offset(&self, key: &K) -> Option<f32> {
        for section in &self.sections {
            for row in section.rows() {
                if row.tiles().iter().any(|t| &t.key == key) {
                    return Some(section.offset() + row.offset());
                }
            }
        }
        None
    }

    /// Scrolls so that `key`'s row sits `offset_into_item` above the
    /// viewport top, then renders. Returns the applied offset, or `None`
    /// when the item is not materialized.
    pub fn scroll_to_item(&mut self, key: &K, offset_into_item: f32) -> Option<f32> {
        let target = self.item_offset(key)? + offset_into_item;
        self.scroll_offset = self.clamp_scroll_offset(target);
        let _ = self.render(false);
        Some(self.scroll_offset)
    }

    fn active_section(&self) -> Option<usize> {
        if self.sections.is_empty() {
            return None;
        }
        let target = self.scroll_offset;
        let mut best = 0usize;
        let mut best_distance = f32::INFINITY;
        for (i, section) in self.sections.iter().enumerate() {
            if section.contains(target) {
                return Some(i);
            }
            let distance = if target < section.offset() {
                section.offset() - target
            } else {
                target - (section.offset() + section.height())
            };
            if distance < best_distance {
                best_distance = distance;
                best = i;
            }
        }
        Some(best)
    }

    fn compacted_in_window(&self) -> Option<usize> {
        let active = self.active_section()?;
        let lo = active.saturating_sub(self.options.lookahead);
        let hi = (active + self.options.lookahead).min(self.sections.len() - 1);
        (lo..=hi).find(|&i| self.sections[i].is_compacted())
    }

    // ------------------------------------------------------------------
    // Re-tiling
    // ------------------------------------------------------------------

    /// Flattens every materialized tile in order, re-tiles under the
    /// current options, and rebuilds sections. Compacted sections stay in
    /// position as placeholders (they refill from their cursor pair), so
    /// each contiguous run of materialized sections re-tiles independently
    /// and no remainder leaks across a compacted boundary.
    fn retile_all(&mut self) {
        gdebug!(
            sections = self.sections.len(),
            threshold = self.options.row_aspect_ratio_threshold,
            "full re-tile"
        );
        let anchor = self.active_item();
        // A mid-refill section re-enters the rebuild as a bare placeholder;
        // its next refill starts over from the recorded cursor pair.
        if let Some(paused) = self.refill.take() {
            if paused.section < self.sections.len() {
                self.sections[paused.section].compact();
            }
        }
        let old = core::mem::take(&mut self.sections);
        let tail = core::mem::take(&mut self.remainder);

        let cap = self.options.rows_per_section.max(1);
        let threshold = self.options.row_aspect_ratio_threshold;
        let cross = self.viewport.cross;
        let gap = self.options.gap;

        let mut rebuilt: Vec<Section<K>> = Vec::new();
        let mut run: Vec<Tile<K>> = Vec::new();
        let mut run_cursors: Option<(Option<PageToken>, Option<PageToken>)> = None;

        for mut section in old {
            section.force_detach();
            if section.is_compacted() {
                if !run.is_empty() {
                    let tiling = tile(core::mem::take(&mut run), threshold, false);
                    let cursors = run_cursors.take().unwrap_or((None, None));
                    self.push_row_sections(tiling.rows, cursors, cap, cross, gap, &mut rebuilt);
                }
                run_cursors = None;
                rebuilt.push(section);
            } else {
                let start = section.start_cursor().cloned();
                let end = section.end_cursor().cloned();
                match &mut run_cursors {
                    None => run_cursors = Some((start, end)),
                    Some((_, run_end)) => *run_end = end,
                }
                run.extend(section.take_tiles());
            }
        }

        run.extend(tail);
        let has_more = matches!(self.cursor, CursorState::Next(_));
        if !run.is_empty() {
            let tiling = tile(run, threshold, has_more);
            self.remainder = tiling.remainder;
            let cursors = run_cursors.take().unwrap_or((None, None));
            self.push_row_sections(tiling.rows, cursors, cap, cross, gap, &mut rebuilt);
        }

        self.sections = rebuilt;
        self.reflow_sections();

        if let Some((key, offset_into_item)) = anchor {
            if let Some(offset) = self.item_offset(&key) {
                self.scroll_offset = self.clamp_scroll_offset(offset + offset_into_item);
            }
        }
        let _ = self.render(false);
    }

    fn push_row_sections(
        &mut self,
        rows: Vec<RowShape<K>>,
        cursors: (Option<PageToken>, Option<PageToken>),
        cap: usize,
        cross: f32,
        gap: f32,
        out: &mut Vec<Section<K>>,
    ) {
        let mut shapes = rows;
        while !shapes.is_empty() {
            let take = cap.min(shapes.len());
            let batch: Vec<RowShape<K>> = shapes.drain(..take).collect();
            let first_ordinal = batch[0]
                .tiles
                .first()
                .and_then(|t| self.index.ordinal(&t.key))
                .unwrap_or_default();
            let mut section = Section::new(self.page_counter, first_ordinal, 0.0);
            self.page_counter += 1;
            section.set_cursors(cursors.0.clone(), cursors.1.clone());
            section.absorb(batch, cross, gap);
            out.push(section);
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn viewport_state(&self) -> ViewportState {
        ViewportState {
            viewport: self.viewport,
        }
    }

    pub fn scroll_state(&self) -> ScrollState {
        ScrollState {
            offset: self.scroll_offset,
            zooming: self.zoom.is_zooming(),
        }
    }

    pub fn frame_state(&self) -> FrameState {
        FrameState {
            viewport: self.viewport_state(),
            scroll: self.scroll_state(),
        }
    }

    /// Restores viewport geometry from a snapshot (coalesced like any other
    /// resize).
    pub fn restore_viewport_state(&mut self, state: ViewportState) {
        self.notify_resize(state.viewport);
    }

    /// Restores the scroll position from a snapshot and renders.
    pub fn restore_scroll_state(&mut self, state: ScrollState, now_ms: u64) -> RenderOutcome {
        self.notify_scroll(state.offset, now_ms)
    }
}

impl<K: GalleryKey + core::fmt::Debug> core::fmt::Debug for Gallery<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Gallery")
            .field("attached", &self.attached)
            .field("viewport", &self.viewport)
            .field("scroll_offset", &self.scroll_offset)
            .field("sections", &self.sections.len())
            .field("remainder", &self.remainder.len())
            .field("items", &self.index.len())
            .field("loading", &self.loading)
            .field("epoch", &self.epoch)
            .field("resizing", &self.resizing)
            .field("zoom", &self.zoom)
            .finish_non_exhaustive()
    }
}
