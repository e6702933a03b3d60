/// An axis-aligned block of decoded RGB565 pixels.
///
/// The origin is in destination-surface coordinates and may lie partly or
/// fully outside the surface. Pixels are row-major, `width * height` long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile<'a> {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u16],
}

impl<'a> Tile<'a> {
    /// Create a tile.
    ///
    /// # Panics
    /// Panics if `pixels.len() != width * height`.
    pub fn new(x: i32, y: i32, width: u32, height: u32, pixels: &'a [u16]) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "tile buffer does not match {}x{} geometry",
            width,
            height
        );
        Self {
            x,
            y,
            width,
            height,
            pixels,
        }
    }

    /// Row `row` of the tile's pixels.
    pub fn row(&self, row: u32) -> &'a [u16] {
        let start = row as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }
}

/// Visible extent of an output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceBounds {
    pub width: u32,
    pub height: u32,
}

impl SurfaceBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether a tile starting at row `y` lies entirely below the surface.
    #[inline]
    pub fn is_below(&self, y: i32) -> bool {
        i64::from(y) >= i64::from(self.height)
    }
}

/// Destination surface for painted tiles.
///
/// Implementations clip any part of a tile that falls outside
/// [`bounds`](OutputSink::bounds).
pub trait OutputSink {
    /// Current visible extent.
    fn bounds(&self) -> SurfaceBounds;

    /// Paint `tile` at its origin, clipping against the bounds.
    fn paint_block(&mut self, tile: &Tile<'_>);
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn bounds(&self) -> SurfaceBounds {
        (**self).bounds()
    }

    fn paint_block(&mut self, tile: &Tile<'_>) {
        (**self).paint_block(tile)
    }
}

/// Per-tile callback driven by a decode process.
///
/// Returning `false` tells the decoder to stop producing tiles for the
/// current image.
pub trait TileSink {
    fn on_tile(&mut self, tile: &Tile<'_>) -> bool;
}

impl<T: TileSink + ?Sized> TileSink for &mut T {
    fn on_tile(&mut self, tile: &Tile<'_>) -> bool {
        (**self).on_tile(tile)
    }
}

/// Adapts a closure into a [`TileSink`].
pub struct FnTileSink<F>(pub F);

impl<F: FnMut(&Tile<'_>) -> bool> TileSink for FnTileSink<F> {
    fn on_tile(&mut self, tile: &Tile<'_>) -> bool {
        (self.0)(tile)
    }
}
