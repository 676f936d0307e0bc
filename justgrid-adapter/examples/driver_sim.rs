// Example: simulate a host frame loop around Driver + SliceSource.
use justgrid::{GalleryOptions, Tile, Viewport};
use justgrid_adapter::{Driver, SliceSource};

fn main() {
    let ratios = [1.0, 1.5, 0.75, 1.33, 0.66, 1.78];
    let tiles: Vec<Tile<u64>> = (0..240)
        .map(|i| Tile::new(i as u64, ratios[i % ratios.len()]))
        .collect();
    let source = SliceSource::new(tiles, 24);

    let options = GalleryOptions::new(|_key: &u64, _frame, _soft, _zooming| None)
        .with_row_aspect_ratio_threshold(4.0)
        .with_velocity_threshold(|| 400.0);
    let mut driver = Driver::new(options, source);

    driver
        .attach(Viewport {
            main: 800.0,
            cross: 1200.0,
        })
        .unwrap();
    println!(
        "attached: {} items, extent {:.0}",
        driver.gallery().item_count(),
        driver.gallery().total_extent()
    );

    // Scroll through the grid in steps; the driver fetches whenever the
    // visible window reaches the last known section.
    let mut now_ms = 0u64;
    for step in 1..=20 {
        now_ms += 16;
        let offset = step as f32 * 300.0;
        let outcome = driver.on_scroll(offset, now_ms).unwrap();
        driver.tick(now_ms).unwrap();
        println!(
            "scroll {:>5.0}: active={:?} shown={} items={}",
            offset,
            outcome.active_section,
            outcome.shown,
            driver.gallery().item_count()
        );
    }
}
