use core::fmt;

use justgrid::{Gallery, GalleryKey};

/// A scroll anchor that preserves visual position across layout changes.
///
/// Typical use cases:
/// - keeping the same photo at the viewport top through a re-tile (threshold
///   change, rotation)
/// - restoring a session's position after a reset, once the item is paged
///   back in
#[derive(Clone, PartialEq)]
pub struct ScrollAnchor<K> {
    pub key: K,
    /// Distance from the anchor row's start to the viewport's scroll offset.
    pub offset_into_item: f32,
}

impl<K: fmt::Debug> fmt::Debug for ScrollAnchor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollAnchor")
            .field("key", &self.key)
            .field("offset_into_item", &self.offset_into_item)
            .finish()
    }
}

/// Captures an anchor for the item under the current scroll offset.
///
/// Returns `None` when nothing is laid out yet.
pub fn capture_anchor<K: GalleryKey>(gallery: &Gallery<K>) -> Option<ScrollAnchor<K>> {
    let (key, offset_into_item) = gallery.active_item()?;
    Some(ScrollAnchor {
        key,
        offset_into_item,
    })
}

/// Applies a previously captured anchor by adjusting the scroll offset.
///
/// Returns `true` when the anchor's item is materialized and the offset was
/// applied.
pub fn apply_anchor<K: GalleryKey>(gallery: &mut Gallery<K>, anchor: &ScrollAnchor<K>) -> bool {
    gallery
        .scroll_to_item(&anchor.key, anchor.offset_into_item)
        .is_some()
}
