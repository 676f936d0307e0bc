use alloc::sync::Arc;

use crate::options::VelocityThreshold;
use crate::types::absf;

/// What a scroll sample or frame tick asks the host to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollSignal {
    Idle,
    /// Re-render with the given zooming flag (`true` = placeholders).
    Render { zooming: bool },
}

/// Classifies scrolling as fast ("zooming") vs normal from per-sample
/// position deltas, with debounced recovery.
///
/// All state is per instance: one reader per engine, never shared. The
/// threshold is re-read from the provider on every sample; `f32::INFINITY`
/// disables detection entirely (hosts use that during active resizes).
/// Trading placeholders for scroll smoothness: a delta above the threshold
/// flips zooming on and fires `render(true)` immediately, and each frame
/// tick re-fires it until the quiet timer (re-armed by every further fast
/// delta) expires and fires `render(false)` exactly once.
pub struct ScrollReader {
    horizontal: bool,
    threshold: VelocityThreshold,
    on_render: Option<Arc<dyn Fn(bool) + Send + Sync>>,
    zooming: bool,
    last_position: Option<f32>,
    quiet_deadline_ms: Option<u64>,
    quiet_ms: u64,
}

impl ScrollReader {
    /// Standalone reader that invokes `on_render` directly.
    pub fn new(
        horizontal: bool,
        threshold: impl Fn() -> f32 + Send + Sync + 'static,
        on_render: impl Fn(bool) + Send + Sync + 'static,
    ) -> Self {
        Self {
            horizontal,
            threshold: Arc::new(threshold),
            on_render: Some(Arc::new(on_render)),
            zooming: false,
            last_position: None,
            quiet_deadline_ms: None,
            quiet_ms: crate::options::DEFAULT_ZOOM_QUIET_MS,
        }
    }

    /// Reader owned by a controller that interprets the returned signals
    /// itself instead of taking a callback.
    pub(crate) fn embedded(horizontal: bool, threshold: VelocityThreshold, quiet_ms: u64) -> Self {
        Self {
            horizontal,
            threshold,
            on_render: None,
            zooming: false,
            last_position: None,
            quiet_deadline_ms: None,
            quiet_ms,
        }
    }

    pub fn with_quiet_ms(mut self, quiet_ms: u64) -> Self {
        self.quiet_ms = quiet_ms;
        self
    }

    pub fn is_horizontal(&self) -> bool {
        self.horizontal
    }

    pub fn is_zooming(&self) -> bool {
        self.zooming
    }

    /// Records a scroll position without evaluating velocity. Used while
    /// detection is suspended so the next real sample doesn't see a
    /// resize-induced jump as a user gesture.
    pub fn observe(&mut self, position: f32) {
        self.last_position = Some(position);
    }

    /// Feeds one scroll sample.
    pub fn sample(&mut self, position: f32, now_ms: u64) -> ScrollSignal {
        let threshold = (self.threshold)();
        if threshold.is_infinite() {
            self.last_position = Some(position);
            return ScrollSignal::Idle;
        }
        let delta = match self.last_position {
            Some(last) => absf(position - last),
            None => 0.0,
        };
        self.last_position = Some(position);
        if delta > threshold {
            gtrace!(delta, threshold, "fast scroll delta");
            self.zooming = true;
            self.quiet_deadline_ms = Some(now_ms.saturating_add(self.quiet_ms));
            return self.emit(true);
        }
        ScrollSignal::Idle
    }

    /// Frame-rate re-evaluation: keeps placeholder rendering alive during an
    /// active zoom and fires the single recovery render once the quiet
    /// deadline passes.
    pub fn tick(&mut self, now_ms: u64) -> ScrollSignal {
        if !self.zooming {
            return ScrollSignal::Idle;
        }
        match self.quiet_deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.zooming = false;
                self.quiet_deadline_ms = None;
                self.emit(false)
            }
            _ => self.emit(true),
        }
    }

    fn emit(&self, zooming: bool) -> ScrollSignal {
        if let Some(render) = &self.on_render {
            render(zooming);
        }
        ScrollSignal::Render { zooming }
    }
}

impl core::fmt::Debug for ScrollReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScrollReader")
            .field("horizontal", &self.horizontal)
            .field("zooming", &self.zooming)
            .field("last_position", &self.last_position)
            .field("quiet_deadline_ms", &self.quiet_deadline_ms)
            .field("quiet_ms", &self.quiet_ms)
            .finish_non_exhaustive()
    }
}
