// Example: standalone scroll-velocity detection with debounced recovery.
use justgrid::{ScrollReader, ScrollSignal};

fn main() {
    let mut reader = ScrollReader::new(
        false,
        || 50.0,
        |zooming| println!("render(zooming={zooming})"),
    );

    // A slow sample, then a fast one that trips the detector.
    reader.sample(0.0, 0);
    reader.sample(20.0, 16);
    let signal = reader.sample(120.0, 32);
    println!("after fast delta: {signal:?}, zooming={}", reader.is_zooming());

    // Frame ticks keep placeholder rendering alive during the zoom...
    for now_ms in [48u64, 64, 200] {
        reader.tick(now_ms);
    }

    // ...until the quiet period expires and the recovery render fires once.
    match reader.tick(32 + 350) {
        ScrollSignal::Render { zooming } => println!("recovered, zooming={zooming}"),
        ScrollSignal::Idle => println!("still idle"),
    }
    println!("final zooming={}", reader.is_zooming());
}
