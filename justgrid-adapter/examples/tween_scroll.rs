// Example: smooth scroll to an item with an adapter-driven tween.
use justgrid::{GalleryOptions, Tile, Viewport};
use justgrid_adapter::{Driver, Easing, SliceSource};

fn main() {
    let tiles: Vec<Tile<u64>> = (0..120).map(|i| Tile::new(i as u64, 1.0)).collect();
    let options = GalleryOptions::new(|_key: &u64, _frame, _soft, _zooming| None)
        .with_row_aspect_ratio_threshold(3.0);
    let mut driver = Driver::new(options, SliceSource::new(tiles, 30));

    driver
        .attach(Viewport {
            main: 600.0,
            cross: 900.0,
        })
        .unwrap();

    let target = driver
        .start_tween_to_item(&20, 0, 240, Easing::EaseInOutCubic)
        .expect("item 20 is materialized");
    println!("tweening to {target:.0}");

    let mut now_ms = 0u64;
    while driver.is_animating() {
        now_ms += 16;
        driver.tick(now_ms).unwrap();
        println!("t={now_ms:>3}ms offset={:.1}", driver.gallery().scroll_offset());
    }
}
