use crate::*;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        debug_assert!(start < end_exclusive);
        start + (self.next_u64() as usize) % (end_exclusive - start)
    }

    fn gen_ratio(&mut self) -> f32 {
        0.25 + (self.next_u64() % 300) as f32 / 100.0
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-2
}

fn ratio_tiles(ratios: &[f32]) -> Vec<Tile<u64>> {
    ratios
        .iter()
        .enumerate()
        .map(|(i, &r)| Tile::new(i as u64, r))
        .collect()
}

fn page_of(start_key: u64, ratios: &[f32], next: Option<&str>) -> ItemPage<u64> {
    ItemPage {
        items: ratios
            .iter()
            .enumerate()
            .map(|(i, &r)| Tile::new(start_key + i as u64, r))
            .collect(),
        next: next.map(|s| PageToken(String::from(s))),
    }
}

type RenderLog = Arc<Mutex<Vec<(u64, ItemFrame, bool, bool)>>>;

fn logging_options(log: &RenderLog) -> GalleryOptions<u64> {
    let log = Arc::clone(log);
    GalleryOptions::new(move |key: &u64, frame, soft, placeholder| {
        log.lock().unwrap().push((*key, frame, soft, placeholder));
        None
    })
    .with_gap(0.0)
}

fn complete(g: &mut Gallery<u64>, req: &PageRequest, page: ItemPage<u64>) -> FetchSummary {
    g.complete_page::<&str>(req, Ok(page)).unwrap()
}

/// Ten sections of two rows each: 40 tiles of ratio 1, threshold 2, cross
/// extent 200 → rows 100 high, sections 200 high, total extent 2000.
fn ten_section_gallery(log: &RenderLog, last_next: Option<&str>) -> Gallery<u64> {
    let opts = logging_options(log)
        .with_row_aspect_ratio_threshold(2.0)
        .with_rows_per_section(2);
    let mut g = Gallery::new(opts);
    let mut req = g
        .attach(Viewport {
            main: 100.0,
            cross: 200.0,
        })
        .unwrap();
    for i in 0..10u64 {
        let next = if i < 9 { Some("next") } else { last_next };
        complete(&mut g, &req, page_of(4 * i, &[1.0; 4], next));
        if i < 9 {
            req = g.request_page().unwrap();
        }
    }
    g
}

// ------------------------------------------------------------------
// Tiler
// ------------------------------------------------------------------

#[test]
fn tiling_reconstructs_input_exactly() {
    let mut rng = Lcg::new(42);
    for _ in 0..200 {
        let count = rng.gen_range_usize(0, 40);
        let input: Vec<Tile<u64>> = (0..count)
            .map(|i| Tile::new(i as u64, rng.gen_ratio()))
            .collect();
        let threshold = rng.gen_range_usize(1, 9) as f32;
        let has_more = rng.gen_bool();

        let tiling = tile(input.clone(), threshold, has_more);

        let mut keys = Vec::new();
        for row in &tiling.rows {
            keys.extend(row.tiles.iter().map(|t| t.key));
        }
        keys.extend(tiling.remainder.iter().map(|t| t.key));
        let expected: Vec<u64> = (0..count as u64).collect();
        assert_eq!(keys, expected, "tiles lost or duplicated");

        if has_more {
            let tail: f32 = tiling.remainder.iter().map(|t| t.aspect_ratio).sum();
            assert!(tail < threshold, "remainder would have closed a row");
        }
    }
}

#[test]
fn closed_rows_respect_threshold_bounds() {
    let mut rng = Lcg::new(7);
    for _ in 0..100 {
        let count = rng.gen_range_usize(1, 40);
        let input: Vec<Tile<u64>> = (0..count)
            .map(|i| Tile::new(i as u64, rng.gen_ratio()))
            .collect();
        let threshold = rng.gen_range_usize(1, 9) as f32;

        let tiling = tile(input, threshold, true);
        for row in &tiling.rows {
            assert!(row.aspect_sum >= threshold);
            let last = row.tiles.last().unwrap().aspect_ratio;
            assert!(row.aspect_sum - last < threshold);
        }
    }
}

#[test]
fn uniform_trailing_row_stretches_to_whole_multiple() {
    let tiling = tile(ratio_tiles(&[1.0; 5]), 3.0, false);
    assert_eq!(tiling.rows.len(), 2);
    assert!(tiling.remainder.is_empty());

    let first = &tiling.rows[0];
    assert_eq!(
        first.tiles.iter().map(|t| t.key).collect::<Vec<_>>(),
        [0, 1, 2]
    );
    assert!(approx(first.aggregate_ratio, 3.0));
    assert_eq!(first.extra_margins, 0);

    let last = &tiling.rows[1];
    assert_eq!(
        last.tiles.iter().map(|t| t.key).collect::<Vec<_>>(),
        [3, 4]
    );
    assert!(approx(last.aspect_sum, 2.0));
    assert!(approx(last.aggregate_ratio, 3.0));
    assert_eq!(last.extra_margins, 1);
}

#[test]
fn mixed_trailing_row_clamps_to_threshold() {
    let tiling = tile(ratio_tiles(&[1.0, 0.5]), 3.0, false);
    assert_eq!(tiling.rows.len(), 1);
    let row = &tiling.rows[0];
    assert!(approx(row.aspect_sum, 1.5));
    assert!(approx(row.aggregate_ratio, 3.0));
    assert_eq!(row.extra_margins, 0);
}

#[test]
fn oversized_single_tile_forms_own_row() {
    let tiling = tile(ratio_tiles(&[6.0, 1.0]), 5.0, false);
    assert_eq!(tiling.rows.len(), 2);
    assert_eq!(tiling.rows[0].tiles.len(), 1);
    assert!(approx(tiling.rows[0].aggregate_ratio, 6.0));
    // Lone ratio-1 tail stretches to five phantom slots.
    assert!(approx(tiling.rows[1].aggregate_ratio, 5.0));
    assert_eq!(tiling.rows[1].extra_margins, 4);
}

#[test]
fn empty_input_yields_nothing() {
    let tiling = tile(Vec::<Tile<u64>>::new(), 5.0, false);
    assert!(tiling.rows.is_empty());
    assert!(tiling.remainder.is_empty());
}

#[test]
fn trailing_tiles_become_remainder_when_more_pages_exist() {
    let tiling = tile(ratio_tiles(&[1.0; 5]), 3.0, true);
    assert_eq!(tiling.rows.len(), 1);
    assert_eq!(
        tiling.remainder.iter().map(|t| t.key).collect::<Vec<_>>(),
        [3, 4]
    );
}

// ------------------------------------------------------------------
// Row
// ------------------------------------------------------------------

#[test]
fn row_layout_fills_cross_extent() {
    let mut tiling = tile(ratio_tiles(&[1.5, 0.8, 1.2, 1.0, 1.0]), 3.0, false);
    let gap = 4.0;
    for shape in tiling.rows.drain(..) {
        let margins = (shape.tiles.len() - 1 + shape.extra_margins) as f32 * gap;
        let row = Row::new(shape, 0.0, 300.0, gap);
        let widths: f32 = row
            .tiles()
            .iter()
            .map(|t| t.aspect_ratio * row.height())
            .sum();
        // Tile widths + gaps (phantom slots included) fill the extent up to
        // the stretch/clamp slack captured by aggregate_ratio.
        let occupied = row.aggregate_ratio() * row.height() + margins;
        assert!(approx(occupied, 300.0), "occupied {occupied}");
        assert!(widths <= 300.0 + 1e-2);
    }
}

#[test]
fn row_show_dispatches_frames_and_hide_runs_cleanups() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cleanups = Arc::new(AtomicUsize::new(0));
    let render: RenderFn<u64> = {
        let calls = Arc::clone(&calls);
        let cleanups = Arc::clone(&cleanups);
        Arc::new(move |_key, _frame, _soft, _zooming| {
            calls.fetch_add(1, Ordering::SeqCst);
            let cleanups = Arc::clone(&cleanups);
            Some(Box::new(move || {
                cleanups.fetch_add(1, Ordering::SeqCst);
            }) as RenderCleanup)
        })
    };

    let tiling = tile(ratio_tiles(&[1.0; 3]), 3.0, false);
    let mut row = Row::new(tiling.rows.into_iter().next().unwrap(), 0.0, 300.0, 0.0);
    assert_eq!(row.attachment(), Attachment::Detached);

    row.show(&render, 50.0, false, false);
    assert_eq!(row.attachment(), Attachment::Attached);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(row.frame_of(0, 50.0).y, 50.0);

    row.hide();
    assert_eq!(row.attachment(), Attachment::Hidden);
    assert_eq!(cleanups.load(Ordering::SeqCst), 3);
}

#[test]
#[should_panic(expected = "hide on a detached row")]
fn hiding_a_detached_row_panics() {
    let tiling = tile(ratio_tiles(&[1.0; 3]), 3.0, false);
    let mut row = Row::new(tiling.rows.into_iter().next().unwrap(), 0.0, 300.0, 0.0);
    row.hide();
}

#[test]
fn switch_edge_mirrors_frames() {
    let tiling = tile(ratio_tiles(&[1.0, 2.0]), 3.0, false);
    let mut row = Row::new(tiling.rows.into_iter().next().unwrap(), 0.0, 300.0, 0.0);

    let leading = row.frame_of(0, 0.0);
    row.switch_edge();
    assert_eq!(row.edge(), AnchorEdge::Trailing);
    let trailing = row.frame_of(0, 0.0);
    assert!(approx(trailing.x, 300.0 - leading.x - leading.width));
    assert!(approx(trailing.width, leading.width));
}

// ------------------------------------------------------------------
// ScrollReader
// ------------------------------------------------------------------

#[test]
fn fast_delta_flips_zooming_and_recovers_after_quiet_period() {
    let renders: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&renders);
    let mut reader = ScrollReader::new(false, || 50.0, move |zooming| {
        sink.lock().unwrap().push(zooming);
    });

    assert_eq!(reader.sample(0.0, 0), ScrollSignal::Idle);
    assert_eq!(
        reader.sample(60.0, 10),
        ScrollSignal::Render { zooming: true }
    );
    assert!(reader.is_zooming());

    // Placeholder rendering is re-driven every frame during the zoom.
    assert_eq!(reader.tick(100), ScrollSignal::Render { zooming: true });
    assert_eq!(reader.tick(359), ScrollSignal::Render { zooming: true });

    // 350ms after the last fast delta the recovery render fires, once.
    assert_eq!(reader.tick(360), ScrollSignal::Render { zooming: false });
    assert!(!reader.is_zooming());
    assert_eq!(reader.tick(400), ScrollSignal::Idle);

    let log = renders.lock().unwrap();
    assert_eq!(*log, [true, true, true, false]);
    assert_eq!(log.iter().filter(|z| !**z).count(), 1);
}

#[test]
fn further_fast_deltas_rearm_quiet_timer() {
    let mut reader = ScrollReader::new(false, || 50.0, |_| {}).with_quiet_ms(350);
    reader.sample(0.0, 0);
    reader.sample(100.0, 10);
    reader.sample(200.0, 200);
    // Deadline moved to 550; still zooming at 400.
    assert_eq!(reader.tick(400), ScrollSignal::Render { zooming: true });
    assert_eq!(reader.tick(550), ScrollSignal::Render { zooming: false });
}

#[test]
fn infinite_threshold_disables_detection() {
    let mut reader = ScrollReader::new(false, || f32::INFINITY, |_| {});
    reader.sample(0.0, 0);
    assert_eq!(reader.sample(10_000.0, 10), ScrollSignal::Idle);
    assert!(!reader.is_zooming());
}

// ------------------------------------------------------------------
// Gallery: paging
// ------------------------------------------------------------------

#[test]
fn attach_arms_first_fetch_and_backpressure_holds() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = Gallery::new(logging_options(&log).with_row_aspect_ratio_threshold(3.0));

    let req = g
        .attach(Viewport {
            main: 600.0,
            cross: 300.0,
        })
        .unwrap();
    assert_eq!(req.cursor, None);
    assert_eq!(req.target, FetchTarget::Append);
    assert!(g.is_loading());

    // One fetch in flight: further drives short-circuit with no queueing.
    assert!(g.request_page().is_none());
    assert!(g.request_page().is_none());

    let summary = complete(&mut g, &req, page_of(0, &[1.0; 10], Some("p1")));
    assert!(!g.is_loading());
    assert_eq!(summary.rows_added, 3);
    assert_eq!(summary.sections_added, 1);
    assert!(g.request_page().is_some());
}

#[test]
fn pages_fill_sections_until_viewport_filled() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = Gallery::new(logging_options(&log).with_row_aspect_ratio_threshold(3.0));

    let req = g
        .attach(Viewport {
            main: 600.0,
            cross: 300.0,
        })
        .unwrap();
    // 10 ratio-1 tiles at threshold 3: three rows, one tile of remainder.
    // Rows are 100 high, so one page covers 300 of a 600 viewport.
    let summary = complete(&mut g, &req, page_of(0, &[1.0; 10], Some("p1")));
    assert!(approx(g.total_extent(), 300.0));
    assert!(summary.needs_more, "underfilled viewport must prefetch");

    let req = g.request_page().unwrap();
    assert_eq!(req.cursor, Some(PageToken(String::from("p1"))));
    let summary = complete(&mut g, &req, page_of(10, &[1.0; 10], Some("p2")));
    assert!(g.total_extent() >= 600.0);
    assert!(!summary.needs_more);

    // Both pages accumulated into the one open section.
    assert_eq!(g.sections().len(), 1);
    assert_eq!(g.sections()[0].row_count(), 6);
    assert_eq!(g.item_count(), 20);
}

#[test]
fn stale_page_after_reset_is_discarded() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = Gallery::new(logging_options(&log).with_row_aspect_ratio_threshold(3.0));

    let old_req = g
        .attach(Viewport {
            main: 300.0,
            cross: 300.0,
        })
        .unwrap();
    let new_req = g.reset().unwrap();
    assert_ne!(old_req.epoch, new_req.epoch);

    let summary = complete(&mut g, &old_req, page_of(0, &[1.0; 6], None));
    assert!(summary.stale);
    assert_eq!(g.item_count(), 0);
    assert!(g.sections().is_empty());
    assert!(g.is_loading(), "the post-reset fetch is still in flight");

    let summary = complete(&mut g, &new_req, page_of(0, &[1.0; 6], None));
    assert!(!summary.stale);
    assert_eq!(g.item_count(), 6);
}

#[test]
fn failed_page_leaves_loading_set_until_retry() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = Gallery::new(logging_options(&log));

    let req = g
        .attach(Viewport {
            main: 300.0,
            cross: 300.0,
        })
        .unwrap();
    let err = g.complete_page::<&str>(&req, Err("backend down"));
    assert_eq!(err.unwrap_err(), "backend down");

    // Fetching stalls until the host retries the same request or resets.
    assert!(g.is_loading());
    assert!(g.request_page().is_none());

    let summary = complete(&mut g, &req, page_of(0, &[1.0; 5], None));
    assert!(!summary.stale);
    assert!(!g.is_loading());
}

#[test]
fn detach_then_attach_starts_fresh() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    assert_eq!(g.item_count(), 40);

    g.detach();
    g.detach(); // idempotent
    assert!(!g.is_attached());
    assert!(g.render(false).shown == 0);

    let req = g
        .attach(Viewport {
            main: 100.0,
            cross: 200.0,
        })
        .unwrap();
    assert_eq!(req.cursor, None, "re-attach starts a fresh session");
    assert_eq!(g.item_count(), 0);
    assert!(g.sections().is_empty());
}

// ------------------------------------------------------------------
// Gallery: rendering & visibility
// ------------------------------------------------------------------

#[test]
fn render_windows_sections_around_scroll_offset() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    assert_eq!(g.sections().len(), 10);
    assert!(approx(g.total_extent(), 2000.0));
    for (i, section) in g.sections().iter().enumerate() {
        assert!(approx(section.offset(), 200.0 * i as f32));
        assert_eq!(section.first_ordinal(), 4 * i as u64);
    }

    let out = g.notify_scroll(1000.0, 0);
    assert_eq!(out.active_section, Some(5));
    assert_eq!(out.shown, 5);
    for (i, section) in g.sections().iter().enumerate() {
        assert_eq!(section.is_shown(), (3..=7).contains(&i), "section {i}");
    }

    // Scrolling back hides what left the window.
    let out = g.notify_scroll(0.0, 10);
    assert_eq!(out.active_section, Some(0));
    assert!(out.hidden > 0);
    for (i, section) in g.sections().iter().enumerate() {
        assert_eq!(section.is_shown(), i <= 2, "section {i}");
    }
    assert!(!out.needs_fetch, "pagination is exhausted");
}

#[test]
fn render_requests_fetch_at_tail() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, Some("p10"));
    let out = g.notify_scroll(1900.0, 0);
    assert_eq!(out.active_section, Some(9));
    assert!(out.needs_fetch, "window reached the last known section");
}

#[test]
fn zooming_render_requests_placeholders() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let opts = logging_options(&log)
        .with_row_aspect_ratio_threshold(2.0)
        .with_rows_per_section(2)
        .with_velocity_threshold(|| 50.0);
    let mut g = Gallery::new(opts);
    let req = g
        .attach(Viewport {
            main: 100.0,
            cross: 200.0,
        })
        .unwrap();
    complete(&mut g, &req, page_of(0, &[1.0; 8], None));

    g.notify_scroll(0.0, 0);
    log.lock().unwrap().clear();

    g.notify_scroll(120.0, 10); // delta 120 > 50
    assert!(g.is_zooming());
    {
        let entries = log.lock().unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.3), "placeholders during zoom");
    }

    log.lock().unwrap().clear();
    let out = g.tick(360); // 10 + 350 quiet expired
    assert!(out.rendered);
    assert!(!g.is_zooming());
    let entries = log.lock().unwrap();
    assert!(entries.iter().all(|e| !e.3), "full renders after recovery");
}

#[test]
fn update_items_pushes_pending_to_newly_shown_sections() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    g.notify_scroll(0.0, 0); // sections 0..=2 shown

    let touched: Arc<Mutex<BTreeSet<u64>>> = Arc::new(Mutex::new(BTreeSet::new()));
    let sink = Arc::clone(&touched);
    g.update_items(move |key: &u64| {
        sink.lock().unwrap().insert(*key);
    });
    {
        let set = touched.lock().unwrap();
        assert!(set.contains(&0) && set.contains(&11));
        assert!(!set.contains(&36), "hidden sections untouched");
    }

    // The far section receives the pending update when it comes on screen.
    g.notify_scroll(1800.0, 10);
    let set = touched.lock().unwrap();
    assert!(set.contains(&36));
}

#[test]
fn release_payloads_drops_cached_cleanups() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let opts = {
        let cleanups = Arc::clone(&cleanups);
        GalleryOptions::new(move |_key: &u64, _frame, _soft, _zooming| {
            let cleanups = Arc::clone(&cleanups);
            Some(Box::new(move || {
                cleanups.fetch_add(1, Ordering::SeqCst);
            }) as RenderCleanup)
        })
        .with_gap(0.0)
        .with_row_aspect_ratio_threshold(2.0)
    };
    let mut g = Gallery::new(opts);
    let req = g
        .attach(Viewport {
            main: 400.0,
            cross: 200.0,
        })
        .unwrap();
    complete(&mut g, &req, page_of(0, &[1.0; 8], None));
    g.notify_scroll(0.0, 0);

    assert_eq!(cleanups.load(Ordering::SeqCst), 0);
    g.release_payloads();
    assert_eq!(cleanups.load(Ordering::SeqCst), 8);
}

// ------------------------------------------------------------------
// Gallery: options, resize, re-tile
// ------------------------------------------------------------------

#[test]
fn unchanged_options_patch_is_a_no_op() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    let keys: Vec<u64> = g.sections().iter().map(|s| s.page_key()).collect();

    let same = OptionsPatch::default().row_aspect_ratio_threshold(2.0);
    assert!(!g.update_options(&same, false));
    let after: Vec<u64> = g.sections().iter().map(|s| s.page_key()).collect();
    assert_eq!(keys, after, "no section/row rebuild");

    let changed = OptionsPatch::default().row_aspect_ratio_threshold(4.0);
    assert!(g.update_options(&changed, false));
    let after: Vec<u64> = g.sections().iter().map(|s| s.page_key()).collect();
    assert_ne!(keys, after);
}

#[test]
fn ordinals_are_assigned_once_and_survive_retile() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    for key in 0..40u64 {
        assert_eq!(g.item_ordinal(&key), Some(key));
    }

    g.update_options(&OptionsPatch::default().row_aspect_ratio_threshold(4.0), false);
    g.notify_resize(Viewport {
        main: 100.0,
        cross: 320.0,
    });
    g.tick(0);

    assert_eq!(g.item_count(), 40);
    for key in 0..40u64 {
        assert_eq!(g.item_ordinal(&key), Some(key), "ordinal moved for {key}");
    }
}

#[test]
fn anchor_keeps_active_item_stable_across_retile() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    g.notify_scroll(1000.0, 0);

    let (key, delta) = g.active_item().unwrap();
    assert_eq!(key, 20);
    assert!(approx(delta, 0.0));

    // Threshold 4 packs four ratio-1 tiles per row: 50-high rows, new
    // section boundaries, same item at the viewport top.
    g.update_options(&OptionsPatch::default().row_aspect_ratio_threshold(4.0), false);
    let offset = g.item_offset(&20).unwrap();
    assert!(approx(g.scroll_offset(), offset + delta));
    assert!(approx(offset, 250.0));
}

#[test]
fn cross_extent_resize_remeasures_without_retile() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    let keys: Vec<u64> = g.sections().iter().map(|s| s.page_key()).collect();

    g.notify_resize(Viewport {
        main: 100.0,
        cross: 400.0,
    });
    g.notify_resize(Viewport {
        main: 100.0,
        cross: 300.0,
    });
    let out = g.tick(0);
    assert!(out.resized, "one coalesced commit; last viewport wins");

    // Rows are 150 high at cross 300 (aggregate ratio 2), no rebuild.
    let after: Vec<u64> = g.sections().iter().map(|s| s.page_key()).collect();
    assert_eq!(keys, after);
    assert!(approx(g.sections()[0].rows()[0].height(), 150.0));
    assert!(approx(g.total_extent(), 3000.0));
}

#[test]
fn resize_suppresses_zoom_until_settled() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let opts = logging_options(&log)
        .with_row_aspect_ratio_threshold(2.0)
        .with_rows_per_section(2)
        .with_velocity_threshold(|| 10.0);
    let mut g = Gallery::new(opts);
    let req = g
        .attach(Viewport {
            main: 100.0,
            cross: 200.0,
        })
        .unwrap();
    complete(&mut g, &req, page_of(0, &[1.0; 8], None));
    g.notify_scroll(0.0, 0);

    g.notify_resize(Viewport {
        main: 100.0,
        cross: 260.0,
    });
    assert!(g.tick(10).resized);

    // A re-layout jump during the settle window must not read as a zoom.
    g.notify_scroll(300.0, 20);
    assert!(!g.is_zooming());

    let out = g.tick(510); // 10 + 500 settle expired, final render
    assert!(out.rendered);
    g.notify_scroll(600.0, 520);
    assert!(g.is_zooming(), "detection resumes after settling");
}

#[test]
fn resize_collaborator_patch_triggers_retile() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let opts = logging_options(&log)
        .with_row_aspect_ratio_threshold(2.0)
        .with_rows_per_section(2)
        .with_on_resize(Some(|cross: f32| {
            OptionsPatch::default().row_aspect_ratio_threshold(if cross < 150.0 {
                1.0
            } else {
                2.0
            })
        }));
    let mut g = Gallery::new(opts);
    let req = g
        .attach(Viewport {
            main: 100.0,
            cross: 200.0,
        })
        .unwrap();
    complete(&mut g, &req, page_of(0, &[1.0; 8], None));

    g.notify_resize(Viewport {
        main: 100.0,
        cross: 120.0,
    });
    g.tick(0);
    assert!(approx(g.options().row_aspect_ratio_threshold, 1.0));
    // One tile per row now.
    assert_eq!(g.sections().iter().map(Section::row_count).sum::<usize>(), 8);
}

// ------------------------------------------------------------------
// Gallery: compaction
// ------------------------------------------------------------------

#[test]
fn compaction_preserves_height_and_refills_on_demand() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let opts = logging_options(&log)
        .with_row_aspect_ratio_threshold(3.0)
        .with_rows_per_section(10)
        .with_compact_row_cap(2);
    let mut g = Gallery::new(opts);
    let req = g
        .attach(Viewport {
            main: 1000.0,
            cross: 300.0,
        })
        .unwrap();

    // Nine ratio-1 tiles: three 100-high rows, over the cap of two.
    complete(&mut g, &req, page_of(0, &[1.0; 9], Some("p1")));
    assert!(g.sections()[0].is_compacted());
    assert_eq!(g.sections()[0].row_count(), 0);
    assert!(approx(g.sections()[0].height(), 300.0), "height retained");
    assert_eq!(g.item_count(), 9, "ordinals survive compaction");

    // The compacted section is inside the window, so it refills first.
    let refill = g.request_page().unwrap();
    assert_eq!(refill.target, FetchTarget::Refill(0));
    assert_eq!(refill.cursor, None, "refill restarts from the recorded cursor");

    let summary = complete(&mut g, &refill, page_of(0, &[1.0; 9], Some("p1")));
    assert!(!summary.needs_more, "cursor pair closed the refill");
    assert!(!g.sections()[0].is_compacted());
    assert_eq!(g.sections()[0].row_count(), 3);
    assert!(approx(g.sections()[0].height(), 300.0));
    assert_eq!(g.item_count(), 9);
}

#[test]
fn multi_page_refill_resumes_from_recorded_cursor() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let opts = logging_options(&log)
        .with_row_aspect_ratio_threshold(3.0)
        .with_rows_per_section(10)
        .with_compact_row_cap(2);
    let mut g = Gallery::new(opts);
    let req = g
        .attach(Viewport {
            main: 1000.0,
            cross: 300.0,
        })
        .unwrap();
    // Two pages land in one section (three rows), tripping the cap.
    complete(&mut g, &req, page_of(0, &[1.0; 6], Some("p1")));
    let req = g.request_page().unwrap();
    complete(&mut g, &req, page_of(6, &[1.0; 3], Some("p2")));
    assert!(g.sections()[0].is_compacted());
    assert!(approx(g.sections()[0].height(), 300.0));

    // The refill replays the section's pages from its recorded start cursor.
    let refill = g.request_page().unwrap();
    assert_eq!(refill.target, FetchTarget::Refill(0));
    assert_eq!(refill.cursor, None);
    let summary = complete(&mut g, &refill, page_of(0, &[1.0; 6], Some("p1")));
    assert!(summary.needs_more, "end cursor not reached yet");
    assert!(g.sections()[0].is_compacted(), "height stays retained");
    assert!(approx(g.sections()[0].height(), 300.0));
    assert_eq!(g.sections()[0].row_count(), 2);

    // The follow-up resumes where the first refill page left off.
    let refill = g.request_page().unwrap();
    assert_eq!(refill.target, FetchTarget::Refill(0));
    assert_eq!(refill.cursor, Some(PageToken(String::from("p1"))));
    let summary = complete(&mut g, &refill, page_of(6, &[1.0; 3], Some("p2")));
    assert!(!summary.needs_more, "cursor pair closed the refill");
    assert!(!g.sections()[0].is_compacted());
    assert_eq!(g.sections()[0].row_count(), 3);
    assert!(approx(g.sections()[0].height(), 300.0));
    assert_eq!(g.item_count(), 9);
}

// ------------------------------------------------------------------
// Collaborators & bookkeeping
// ------------------------------------------------------------------

#[test]
fn click_collaborator_can_request_more() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let opts = logging_options(&log)
        .with_row_aspect_ratio_threshold(2.0)
        .with_on_item_click(Some(|key: &u64, index: &ItemIndexMap<u64>| {
            // "Load more" when the last known item is clicked.
            index.ordinal(key) == Some(index.len() as u64 - 1)
        }));
    let mut g = Gallery::new(opts);
    let req = g
        .attach(Viewport {
            main: 100.0,
            cross: 200.0,
        })
        .unwrap();
    complete(&mut g, &req, page_of(0, &[1.0; 4], Some("p1")));

    assert!(g.notify_item_click(&0).is_none());
    let req = g.notify_item_click(&3).unwrap();
    assert_eq!(req.cursor, Some(PageToken(String::from("p1"))));
}

#[test]
fn index_map_records_each_key_once() {
    let mut index = ItemIndexMap::<u64>::new();
    assert_eq!(index.record(&7), 0);
    assert_eq!(index.record(&9), 1);
    assert_eq!(index.record(&7), 0, "ordinals are assigned exactly once");
    assert_eq!(index.len(), 2);

    let mut seen = Vec::new();
    index.for_each(|&k, o| seen.push((k, o)));
    seen.sort_unstable();
    assert_eq!(seen, [(7, 0), (9, 1)]);

    index.reset();
    assert!(index.is_empty());
    assert_eq!(index.record(&9), 0);
}

#[test]
fn frame_state_snapshot_round_trip() {
    let log: RenderLog = Arc::new(Mutex::new(Vec::new()));
    let mut g = ten_section_gallery(&log, None);
    g.notify_scroll(700.0, 0);

    let frame = g.frame_state();
    assert!(approx(frame.scroll.offset, 700.0));
    assert!(approx(frame.viewport.viewport.cross, 200.0));

    let mut restored = ten_section_gallery(&log, None);
    restored.restore_viewport_state(frame.viewport);
    restored.tick(0);
    restored.restore_scroll_state(frame.scroll, 0);
    assert!(approx(restored.scroll_offset(), 700.0));
    assert_eq!(restored.frame_state(), frame);
}
