use justgrid::{
    Gallery, GalleryKey, GalleryOptions, PageRequest, RenderOutcome, TickOutcome, Viewport,
};

use crate::{Easing, PageSource, Tween};

/// A framework-neutral pump around a [`Gallery`] and a [`PageSource`].
///
/// The engine exposes paging as an explicit request/complete task; this type
/// closes that loop for synchronous hosts. Adapters drive it by calling:
/// - `attach` / `reset` for lifecycle changes
/// - `on_scroll` / `on_resize` when UI events occur
/// - `tick(now_ms)` each frame (resize commits, zoom recovery, tweens)
///
/// Every entry point that can leave the engine hungry pumps the source until
/// the engine stops asking (`needs_more` / `needs_fetch` clear). Async hosts
/// should skip this type and resolve [`PageRequest`]s themselves.
pub struct Driver<K, S> {
    gallery: Gallery<K>,
    source: S,
    tween: Option<Tween>,
}

impl<K: GalleryKey, S: PageSource<K>> Driver<K, S> {
    pub fn new(options: GalleryOptions<K>, source: S) -> Self {
        Self {
            gallery: Gallery::new(options),
            source,
            tween: None,
        }
    }

    pub fn from_gallery(gallery: Gallery<K>, source: S) -> Self {
        Self {
            gallery,
            source,
            tween: None,
        }
    }

    pub fn gallery(&self) -> &Gallery<K> {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut Gallery<K> {
        &mut self.gallery
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_parts(self) -> (Gallery<K>, S) {
        (self.gallery, self.source)
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn cancel_animation(&mut self) {
        self.tween = None;
    }

    /// Attaches the gallery and pumps the initial fetch chain. Returns the
    /// number of pages served.
    pub fn attach(&mut self, viewport: Viewport) -> Result<usize, S::Error> {
        let request = self.gallery.attach(viewport);
        self.pump_from(request)
    }

    /// Resets the gallery and pumps the fresh fetch chain.
    pub fn reset(&mut self) -> Result<usize, S::Error> {
        self.cancel_animation();
        let request = self.gallery.reset();
        self.pump_from(request)
    }

    /// Serves page requests until the engine stops asking for more.
    pub fn pump(&mut self) -> Result<usize, S::Error> {
        let request = self.gallery.request_page();
        self.pump_from(request)
    }

    fn pump_from(&mut self, mut request: Option<PageRequest>) -> Result<usize, S::Error> {
        let mut pages = 0usize;
        while let Some(req) = request {
            let result = self.source.fetch(&req);
            let summary = self.gallery.complete_page(&req, result)?;
            pages += 1;
            request = if summary.needs_more {
                self.gallery.request_page()
            } else {
                None
            };
        }
        Ok(pages)
    }

    /// Forwards a user scroll (cancelling any tween) and pumps if the
    /// render pass reached the tail.
    pub fn on_scroll(&mut self, offset: f32, now_ms: u64) -> Result<RenderOutcome, S::Error> {
        self.cancel_animation();
        let outcome = self.gallery.notify_scroll(offset, now_ms);
        if outcome.needs_fetch {
            self.pump()?;
        }
        Ok(outcome)
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        self.gallery.notify_resize(viewport);
    }

    /// Advances tween scrolling and the engine's timers.
    pub fn tick(&mut self, now_ms: u64) -> Result<TickOutcome, S::Error> {
        if let Some(tween) = self.tween {
            let offset = tween.sample(now_ms);
            let render = self.gallery.notify_scroll(offset, now_ms);
            if tween.is_done(now_ms) {
                self.tween = None;
            }
            if render.needs_fetch {
                self.pump()?;
            }
        }
        let outcome = self.gallery.tick(now_ms);
        if outcome.needs_fetch {
            self.pump()?;
        }
        Ok(outcome)
    }

    /// Jumps to an item's row immediately. Returns the applied offset when
    /// the item is materialized.
    pub fn scroll_to_item(&mut self, key: &K) -> Result<Option<f32>, S::Error> {
        self.cancel_animation();
        let applied = self.gallery.scroll_to_item(key, 0.0);
        if applied.is_some() {
            self.pump()?;
        }
        Ok(applied)
    }

    /// Starts a tween toward an item's row. Returns the clamped target
    /// offset when the item is materialized.
    pub fn start_tween_to_item(
        &mut self,
        key: &K,
        now_ms: u64,
        duration_ms: u64,
        easing: Easing,
    ) -> Option<f32> {
        let to = self.gallery.item_offset(key)?;
        let to = self.gallery.clamp_scroll_offset(to);
        let from = self.gallery.scroll_offset();
        self.tween = Some(Tween::new(from, to, now_ms, duration_ms, easing));
        Some(to)
    }
}

impl<K: GalleryKey + core::fmt::Debug, S> core::fmt::Debug for Driver<K, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Driver")
            .field("gallery", &self.gallery)
            .field("tween", &self.tween)
            .finish_non_exhaustive()
    }
}
