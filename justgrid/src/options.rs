use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;

use crate::index::ItemIndexMap;
use crate::types::ItemFrame;

/// Teardown handle returned by the render collaborator for one tile slot.
///
/// The engine caches it per tile and runs it when the slot is re-rendered,
/// hidden, or explicitly released.
pub type RenderCleanup = Box<dyn FnMut() + Send>;

/// The render collaborator.
///
/// Called once per visible tile per show pass with `(key, frame, soft,
/// placeholder)`. `soft` marks a best-effort refresh of an already-visible
/// tile; `placeholder` asks for a cheap stand-in while the user is scrolling
/// too fast for full-quality output.
pub type RenderFn<K> =
    Arc<dyn Fn(&K, ItemFrame, bool, bool) -> Option<RenderCleanup> + Send + Sync>;

/// The click collaborator. Returning `true` asks the engine for another
/// page fetch (e.g. "load more" affordances rendered inside the grid).
pub type ItemClickFn<K> = Arc<dyn Fn(&K, &ItemIndexMap<K>) -> bool + Send + Sync>;

/// The resize collaborator: maps a new cross-axis extent to an options
/// patch (e.g. a denser row threshold for narrow viewports).
pub type ResizeFn = Arc<dyn Fn(f32) -> OptionsPatch + Send + Sync>;

/// Out-of-band per-item state push, re-dispatched to hidden sections when
/// they next come on screen.
pub type ItemUpdateFn<K> = Arc<dyn Fn(&K) + Send + Sync>;

/// Scroll-velocity threshold provider. `f32::INFINITY` disables fast-scroll
/// detection entirely.
pub type VelocityThreshold = Arc<dyn Fn() -> f32 + Send + Sync>;

/// Configuration for [`crate::Gallery`].
///
/// Cheap to clone: collaborator slots are `Arc`s, so hosts can tweak a few
/// fields and hand the result back without reallocating closures.
pub struct GalleryOptions<K> {
    /// A row closes once its accumulated aspect-ratio sum reaches this.
    /// Higher packs more tiles per row.
    pub row_aspect_ratio_threshold: f32,
    /// Leading space before the first section along the scroll axis.
    pub leading_offset: f32,
    /// Inter-tile margin, also applied between rows and after each section.
    pub gap: f32,
    /// Rows accumulated into one section before it closes.
    pub rows_per_section: usize,
    /// Soft cap: a section exceeding this many rows compacts (drops its rows,
    /// keeps its measured height and cursor pair).
    pub compact_row_cap: usize,
    /// Sections kept shown on each side of the active one.
    pub lookahead: usize,
    /// Scroll axis orientation; only forwarded to the velocity detector.
    pub horizontal: bool,
    /// Quiet time after the last fast scroll delta before full-quality
    /// rendering resumes.
    pub zoom_quiet_ms: u64,
    /// How long after a committed resize the layout is considered settling
    /// (velocity detection stays off, then a final render fires).
    pub resize_settle_ms: u64,
    pub velocity_threshold: VelocityThreshold,
    /// Opaque passthrough copied onto every [`crate::PageRequest`].
    pub selected_field: Option<String>,
    pub render: RenderFn<K>,
    pub on_item_click: Option<ItemClickFn<K>>,
    pub on_resize: Option<ResizeFn>,
}

pub(crate) const DEFAULT_ROW_ASPECT_RATIO_THRESHOLD: f32 = 5.0;
pub(crate) const DEFAULT_GAP: f32 = 4.0;
pub(crate) const DEFAULT_ROWS_PER_SECTION: usize = 24;
pub(crate) const DEFAULT_COMPACT_ROW_CAP: usize = 96;
pub(crate) const DEFAULT_LOOKAHEAD: usize = 2;
pub(crate) const DEFAULT_ZOOM_QUIET_MS: u64 = 350;
pub(crate) const DEFAULT_RESIZE_SETTLE_MS: u64 = 500;

impl<K> GalleryOptions<K> {
    /// Creates options around the one mandatory collaborator, the renderer.
    pub fn new(
        render: impl Fn(&K, ItemFrame, bool, bool) -> Option<RenderCleanup> + Send + Sync + 'static,
    ) -> Self {
        Self {
            row_aspect_ratio_threshold: DEFAULT_ROW_ASPECT_RATIO_THRESHOLD,
            leading_offset: 0.0,
            gap: DEFAULT_GAP,
            rows_per_section: DEFAULT_ROWS_PER_SECTION,
            compact_row_cap: DEFAULT_COMPACT_ROW_CAP,
            lookahead: DEFAULT_LOOKAHEAD,
            horizontal: false,
            zoom_quiet_ms: DEFAULT_ZOOM_QUIET_MS,
            resize_settle_ms: DEFAULT_RESIZE_SETTLE_MS,
            velocity_threshold: Arc::new(|| f32::INFINITY),
            selected_field: None,
            render: Arc::new(render),
            on_item_click: None,
            on_resize: None,
        }
    }

    pub fn with_row_aspect_ratio_threshold(mut self, threshold: f32) -> Self {
        self.row_aspect_ratio_threshold = threshold;
        self
    }

    pub fn with_leading_offset(mut self, leading_offset: f32) -> Self {
        self.leading_offset = leading_offset;
        self
    }

    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_rows_per_section(mut self, rows_per_section: usize) -> Self {
        self.rows_per_section = rows_per_section;
        self
    }

    pub fn with_compact_row_cap(mut self, compact_row_cap: usize) -> Self {
        self.compact_row_cap = compact_row_cap;
        self
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_horizontal(mut self, horizontal: bool) -> Self {
        self.horizontal = horizontal;
        self
    }

    pub fn with_zoom_quiet_ms(mut self, zoom_quiet_ms: u64) -> Self {
        self.zoom_quiet_ms = zoom_quiet_ms;
        self
    }

    pub fn with_resize_settle_ms(mut self, resize_settle_ms: u64) -> Self {
        self.resize_settle_ms = resize_settle_ms;
        self
    }

    pub fn with_velocity_threshold(
        mut self,
        velocity_threshold: impl Fn() -> f32 + Send + Sync + 'static,
    ) -> Self {
        self.velocity_threshold = Arc::new(velocity_threshold);
        self
    }

    pub fn with_selected_field(mut self, selected_field: Option<String>) -> Self {
        self.selected_field = selected_field;
        self
    }

    pub fn with_on_item_click(
        mut self,
        on_item_click: Option<impl Fn(&K, &ItemIndexMap<K>) -> bool + Send + Sync + 'static>,
    ) -> Self {
        self.on_item_click = on_item_click.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_on_resize(
        mut self,
        on_resize: Option<impl Fn(f32) -> OptionsPatch + Send + Sync + 'static>,
    ) -> Self {
        self.on_resize = on_resize.map(|f| Arc::new(f) as _);
        self
    }
}

impl<K> Clone for GalleryOptions<K> {
    fn clone(&self) -> Self {
        Self {
            row_aspect_ratio_threshold: self.row_aspect_ratio_threshold,
            leading_offset: self.leading_offset,
            gap: self.gap,
            rows_per_section: self.rows_per_section,
            compact_row_cap: self.compact_row_cap,
            lookahead: self.lookahead,
            horizontal: self.horizontal,
            zoom_quiet_ms: self.zoom_quiet_ms,
            resize_settle_ms: self.resize_settle_ms,
            velocity_threshold: Arc::clone(&self.velocity_threshold),
            selected_field: self.selected_field.clone(),
            render: Arc::clone(&self.render),
            on_item_click: self.on_item_click.clone(),
            on_resize: self.on_resize.clone(),
        }
    }
}

impl<K> core::fmt::Debug for GalleryOptions<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GalleryOptions")
            .field(
                "row_aspect_ratio_threshold",
                &self.row_aspect_ratio_threshold,
            )
            .field("leading_offset", &self.leading_offset)
            .field("gap", &self.gap)
            .field("rows_per_section", &self.rows_per_section)
            .field("compact_row_cap", &self.compact_row_cap)
            .field("lookahead", &self.lookahead)
            .field("horizontal", &self.horizontal)
            .field("zoom_quiet_ms", &self.zoom_quiet_ms)
            .field("resize_settle_ms", &self.resize_settle_ms)
            .field("selected_field", &self.selected_field)
            .finish_non_exhaustive()
    }
}

/// A partial options update, as produced by the resize collaborator or a
/// host settings panel. Only the layout-affecting fields participate; any
/// change to one of them triggers a full re-tile when sections exist.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionsPatch {
    pub row_aspect_ratio_threshold: Option<f32>,
    pub leading_offset: Option<f32>,
    pub gap: Option<f32>,
    pub selected_field: Option<Option<String>>,
}

impl OptionsPatch {
    pub fn row_aspect_ratio_threshold(mut self, threshold: f32) -> Self {
        self.row_aspect_ratio_threshold = Some(threshold);
        self
    }

    pub fn leading_offset(mut self, leading_offset: f32) -> Self {
        self.leading_offset = Some(leading_offset);
        self
    }

    pub fn gap(mut self, gap: f32) -> Self {
        self.gap = Some(gap);
        self
    }

    pub fn selected_field(mut self, selected_field: Option<String>) -> Self {
        self.selected_field = Some(selected_field);
        self
    }

    /// Applies the patch, returning whether any value actually changed.
    pub(crate) fn apply<K>(&self, options: &mut GalleryOptions<K>) -> bool {
        let mut changed = false;
        if let Some(v) = self.row_aspect_ratio_threshold {
            if v != options.row_aspect_ratio_threshold {
                options.row_aspect_ratio_threshold = v;
                changed = true;
            }
        }
        if let Some(v) = self.leading_offset {
            if v != options.leading_offset {
                options.leading_offset = v;
                changed = true;
            }
        }
        if let Some(v) = self.gap {
            if v != options.gap {
                options.gap = v;
                changed = true;
            }
        }
        if let Some(v) = &self.selected_field {
            if *v != options.selected_field {
                options.selected_field = v.clone();
                changed = true;
            }
        }
        changed
    }
}
