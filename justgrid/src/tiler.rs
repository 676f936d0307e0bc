//! Justified row packing.
//!
//! Pure: no layout units, no lifecycle. The output shapes carry everything a
//! [`crate::Row`] needs to size itself against a concrete cross extent.

use alloc::vec::Vec;

use crate::types::Tile;

/// A packed run of tiles, closed either by reaching the aspect-ratio
/// threshold or by being the final row of an exhausted feed.
#[derive(Clone, Debug, PartialEq)]
pub struct RowShape<K> {
    pub tiles: Vec<Tile<K>>,
    /// The true sum of the tiles' aspect ratios.
    pub aspect_sum: f32,
    /// The ratio the row is laid out against. Equals `aspect_sum` for closed
    /// rows; synthesized (uniform stretch) or clamped up to the threshold for
    /// a trailing partial row.
    pub aggregate_ratio: f32,
    /// Phantom tile slots added when a uniform trailing row was stretched to
    /// a whole multiple of its ratio; each contributes one inter-tile gap.
    pub extra_margins: usize,
}

/// Result of one packing pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Tiling<K> {
    pub rows: Vec<RowShape<K>>,
    /// Unclosed trailing tiles, to be prepended to the next page.
    pub remainder: Vec<Tile<K>>,
}

/// Partitions `tiles` into rows by accumulated aspect ratio.
///
/// A row closes as soon as its running sum reaches `threshold` (the closing
/// tile included), so a single tile wider than the threshold forms a row of
/// its own. With `has_more` the unclosed tail is returned as `remainder`;
/// otherwise it is emitted as a final row: stretched to a whole multiple of
/// the shared ratio when the tail is uniform, clamped up to `threshold` when
/// it is mixed. Every input tile lands in exactly one row or the remainder.
pub fn tile<K>(tiles: Vec<Tile<K>>, threshold: f32, has_more: bool) -> Tiling<K> {
    debug_assert!(threshold > 0.0, "row threshold must be positive");

    let mut rows = Vec::new();
    let mut current: Vec<Tile<K>> = Vec::new();
    let mut sum = 0.0f32;

    for tile in tiles {
        sum += tile.aspect_ratio;
        current.push(tile);
        if sum >= threshold {
            rows.push(RowShape {
                tiles: core::mem::take(&mut current),
                aspect_sum: sum,
                aggregate_ratio: sum,
                extra_margins: 0,
            });
            sum = 0.0;
        }
    }

    if current.is_empty() {
        return Tiling {
            rows,
            remainder: Vec::new(),
        };
    }

    if has_more {
        return Tiling {
            rows,
            remainder: current,
        };
    }

    let (aggregate_ratio, extra_margins) = trailing_row_ratio(&current, threshold);
    rows.push(RowShape {
        aspect_sum: sum,
        aggregate_ratio,
        extra_margins,
        tiles: current,
    });
    Tiling {
        rows,
        remainder: Vec::new(),
    }
}

/// Layout ratio for a trailing partial row (`sum < threshold` by
/// construction).
///
/// Uniform tail: the smallest whole multiple of the shared ratio that
/// reaches the threshold, so the tiles stretch to fill the full width with
/// `extra_margins` phantom slots. Mixed tail: clamp to the threshold, which
/// may leave the row visually underfilled.
fn trailing_row_ratio<K>(tiles: &[Tile<K>], threshold: f32) -> (f32, usize) {
    let first = tiles[0].aspect_ratio;
    let uniform = tiles
        .iter()
        .all(|t| t.aspect_ratio.to_bits() == first.to_bits());
    if !uniform {
        return (threshold, 0);
    }
    // Integer search instead of ceil() keeps this no_std-clean.
    let mut count = tiles.len();
    while (count as f32) * first < threshold {
        count += 1;
    }
    ((count as f32) * first, count - tiles.len())
}
