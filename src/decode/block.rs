use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader, RgbImage};
use tracing::debug;

use crate::error::DecodeError;
use crate::render::color::rgb565;
use crate::render::{Tile, TileSink};

/// Edge length of emitted tiles, matching a 4:2:0 JPEG MCU.
pub const DEFAULT_BLOCK_SIZE: u32 = 16;

/// Supported output scale factors.
pub const VALID_SCALES: [u8; 4] = [1, 2, 4, 8];

/// Summary of one [`BlockDecoder::draw`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawSummary {
    /// Tiles handed to the sink, including the one that stopped decoding
    pub tiles: usize,

    /// Whether the sink stopped decoding before the image was exhausted
    pub halted: bool,
}

// =============================================================================
// Block Decoder
// =============================================================================

/// Decodes JPEG data and streams it to a [`TileSink`] in fixed-size blocks.
///
/// # Example
///
/// ```ignore
/// use framecache::decode::BlockDecoder;
/// use framecache::render::{Framebuffer, TileRenderer};
///
/// let decoder = BlockDecoder::new().with_scale(2)?.with_swap_bytes(true);
/// let mut renderer = TileRenderer::new(Framebuffer::new(240, 320));
///
/// // Top-left corner of the image at (0, 0)
/// let summary = decoder.draw(&jpeg, 0, 0, &mut renderer)?;
/// ```
#[derive(Debug, Clone)]
pub struct BlockDecoder {
    scale: u8,
    swap_bytes: bool,
    block_size: u32,
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDecoder {
    /// Create a decoder at full scale with native byte order.
    pub fn new() -> Self {
        Self {
            scale: 1,
            swap_bytes: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Reduce output by `scale` (1, 2, 4 or 8).
    pub fn with_scale(mut self, scale: u8) -> Result<Self, DecodeError> {
        if !is_valid_scale(scale) {
            return Err(DecodeError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(self)
    }

    /// Emit byte-swapped RGB565 pixels.
    pub fn with_swap_bytes(mut self, swap_bytes: bool) -> Self {
        self.swap_bytes = swap_bytes;
        self
    }

    /// Emit tiles of `block_size` x `block_size` pixels.
    ///
    /// # Panics
    /// Panics if `block_size` is zero.
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        self.block_size = block_size;
        self
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    /// Get the unscaled image dimensions without fully decoding.
    ///
    /// # Returns
    ///
    /// `(width, height)` in pixels.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), DecodeError> {
        let reader = ImageReader::with_format(Cursor::new(source), ImageFormat::Jpeg);
        reader.into_dimensions().map_err(|e| DecodeError::Decode {
            message: e.to_string(),
        })
    }

    /// Decode `source` and push it to `sink` with its top-left corner at
    /// `(x, y)`.
    ///
    /// Tiles are emitted left to right within a block row, block rows top to
    /// bottom. Edge tiles are narrower or shorter when the image size is not
    /// a multiple of the block size. Emission stops as soon as the sink
    /// returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a decodable JPEG. Nothing is
    /// sent to the sink in that case.
    pub fn draw<T: TileSink + ?Sized>(
        &self,
        source: &[u8],
        x: i32,
        y: i32,
        sink: &mut T,
    ) -> Result<DrawSummary, DecodeError> {
        let image = self.decode_scaled(source)?;
        let (width, height) = image.dimensions();
        debug!("Decoded {}x{} image (scale 1/{})", width, height, self.scale);

        let mut buf = Vec::with_capacity((self.block_size * self.block_size) as usize);
        let mut tiles = 0;

        for block_y in (0..height).step_by(self.block_size as usize) {
            let block_h = self.block_size.min(height - block_y);

            for block_x in (0..width).step_by(self.block_size as usize) {
                let block_w = self.block_size.min(width - block_x);

                buf.clear();
                for py in block_y..block_y + block_h {
                    for px in block_x..block_x + block_w {
                        let [r, g, b] = image.get_pixel(px, py).0;
                        let color = rgb565(r, g, b);
                        buf.push(if self.swap_bytes { color.swap_bytes() } else { color });
                    }
                }

                let tile = Tile::new(
                    x.saturating_add(block_x as i32),
                    y.saturating_add(block_y as i32),
                    block_w,
                    block_h,
                    &buf,
                );

                tiles += 1;
                if !sink.on_tile(&tile) {
                    return Ok(DrawSummary {
                        tiles,
                        halted: true,
                    });
                }
            }
        }

        Ok(DrawSummary {
            tiles,
            halted: false,
        })
    }

    fn decode_scaled(&self, source: &[u8]) -> Result<RgbImage, DecodeError> {
        let reader = ImageReader::with_format(Cursor::new(source), ImageFormat::Jpeg);
        let image = reader
            .decode()
            .map_err(|e| DecodeError::Decode {
                message: e.to_string(),
            })?
            .to_rgb8();

        if self.scale == 1 {
            return Ok(image);
        }

        let scale = u32::from(self.scale);
        let width = image.width().div_ceil(scale);
        let height = image.height().div_ceil(scale);
        Ok(imageops::resize(&image, width, height, FilterType::Triangle))
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Whether `scale` is one of 1, 2, 4 or 8.
#[inline]
pub fn is_valid_scale(scale: u8) -> bool {
    VALID_SCALES.contains(&scale)
}

// =============================================================================
// Tests
// =============================================================================
