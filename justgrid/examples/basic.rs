// Example: minimal manual request/complete loop with an inline page feed.
use justgrid::{Gallery, GalleryOptions, ItemPage, PageToken, Tile, Viewport};

fn serve(cursor: Option<&PageToken>) -> ItemPage<u64> {
    let start: u64 = cursor.map(|t| t.0.parse().unwrap()).unwrap_or(0);
    let ratios = [1.5, 1.0, 0.75, 1.33, 1.0, 0.66, 1.78, 1.0];
    let items = ratios
        .iter()
        .enumerate()
        .map(|(i, &r)| Tile::new(start + i as u64, r))
        .collect();
    let next = (start < 32).then(|| PageToken((start + 8).to_string()));
    ItemPage { items, next }
}

fn main() {
    let options = GalleryOptions::new(|key: &u64, frame, _soft, placeholder| {
        println!(
            "render {key}: x={:.0} y={:.0} {:.0}x{:.0} placeholder={placeholder}",
            frame.x, frame.y, frame.width, frame.height
        );
        None
    })
    .with_row_aspect_ratio_threshold(4.0);

    let mut gallery = Gallery::new(options);
    let mut request = gallery.attach(Viewport {
        main: 600.0,
        cross: 900.0,
    });

    while let Some(req) = request {
        let page = serve(req.cursor.as_ref());
        let summary = gallery.complete_page::<&str>(&req, Ok(page)).unwrap();
        request = if summary.needs_more {
            gallery.request_page()
        } else {
            None
        };
    }

    println!(
        "laid out {} items across {} sections, total extent {:.0}",
        gallery.item_count(),
        gallery.sections().len(),
        gallery.total_extent()
    );

    // First render pass shows the window around the top of the grid.
    let outcome = gallery.notify_scroll(0.0, 0);
    println!(
        "shown={} hidden={} needs_fetch={}",
        outcome.shown, outcome.hidden, outcome.needs_fetch
    );
}
