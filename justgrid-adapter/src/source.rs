use alloc::string::ToString;
use alloc::vec::Vec;

use justgrid::{ItemPage, PageRequest, PageToken, Tile};

/// The paging collaborator seam for synchronous hosts.
///
/// Implementations must tolerate being asked again for a page they already
/// served: a stale completion (after a reset) is discarded by the engine and
/// the same cursor may come back.
pub trait PageSource<K> {
    type Error;

    fn fetch(&mut self, request: &PageRequest) -> Result<ItemPage<K>, Self::Error>;
}

/// Serves fixed-size pages from an in-memory tile list.
///
/// Tokens are stringified start offsets, which keeps them opaque to the
/// engine while staying trivially debuggable.
#[derive(Clone, Debug)]
pub struct SliceSource<K> {
    tiles: Vec<Tile<K>>,
    page_size: usize,
}

impl<K: Clone> SliceSource<K> {
    pub fn new(tiles: Vec<Tile<K>>, page_size: usize) -> Self {
        Self {
            tiles,
            page_size: page_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl<K: Clone> PageSource<K> for SliceSource<K> {
    type Error = core::convert::Infallible;

    fn fetch(&mut self, request: &PageRequest) -> Result<ItemPage<K>, Self::Error> {
        let start = request
            .cursor
            .as_ref()
            .and_then(|token| token.0.parse::<usize>().ok())
            .unwrap_or(0)
            .min(self.tiles.len());
        let end = (start + self.page_size).min(self.tiles.len());
        let next = (end < self.tiles.len()).then(|| PageToken(end.to_string()));
        Ok(ItemPage {
            items: self.tiles[start..end].to_vec(),
            next,
        })
    }
}
