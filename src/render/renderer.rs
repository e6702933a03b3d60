use tracing::trace;

use super::{OutputSink, Tile, TileSink};

/// Forwards decoded tiles to an output sink, halting once a tile starts
/// below the visible surface.
///
/// Decoders emit tiles top to bottom, so the first tile whose origin is at
/// or past the bottom edge means every later tile would be too. Horizontal
/// and partial vertical overflow is left to the sink's own clipping.
pub struct TileRenderer<S: OutputSink> {
    sink: S,
    painted: usize,
}

impl<S: OutputSink> TileRenderer<S> {
    /// Create a renderer that owns (or borrows, via `&mut`) `sink`.
    pub fn new(sink: S) -> Self {
        Self { sink, painted: 0 }
    }

    /// Number of tiles forwarded to the sink.
    pub fn painted(&self) -> usize {
        self.painted
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: OutputSink> TileSink for TileRenderer<S> {
    /// # Panics
    /// Panics on a tile with zero width or height.
    fn on_tile(&mut self, tile: &Tile<'_>) -> bool {
        assert!(
            tile.width > 0 && tile.height > 0,
            "decoder produced an empty {}x{} tile at ({}, {})",
            tile.width,
            tile.height,
            tile.x,
            tile.y
        );

        let bounds = self.sink.bounds();
        if bounds.is_below(tile.y) {
            trace!("Tile at y={} is below {}px surface, stopping", tile.y, bounds.height);
            return false;
        }

        self.sink.paint_block(tile);
        self.painted += 1;
        true
    }
}
