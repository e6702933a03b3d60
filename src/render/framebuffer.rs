//! In-memory RGB565 surface.
//!
//! Stands in for a display panel: tiles are clipped against the surface
//! edges on paint, and the current contents can be exported as a JPEG
//! snapshot.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use super::color::rgb888;
use super::{OutputSink, SurfaceBounds, Tile};
use crate::error::SnapshotError;

/// Default JPEG quality for snapshots.
pub const DEFAULT_SNAPSHOT_QUALITY: u8 = 90;

/// Row-major RGB565 framebuffer.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
    /// Incoming tiles carry byte-swapped pixels
    swapped_input: bool,
}

impl Framebuffer {
    /// Create a black framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            swapped_input: false,
        }
    }

    /// Treat painted pixels as byte-swapped (big-endian on the wire) and
    /// swap them back when storing.
    pub fn with_swapped_input(mut self, swapped: bool) -> Self {
        self.swapped_input = swapped;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Fill the whole surface with one colour.
    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
    }

    /// Fill a rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: u16) {
        let Some((x0, x1, y0, y1)) = self.clip(x, y, width, height) else {
            return;
        };
        let stride = self.width as usize;
        for row in y0..y1 {
            self.pixels[row * stride + x0..row * stride + x1].fill(color);
        }
    }

    /// Clip a rectangle to the surface, returning `(x0, x1, y0, y1)` as
    /// half-open pixel ranges, or `None` if nothing is visible.
    fn clip(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Option<(usize, usize, usize, usize)> {
        let x0 = i64::from(x).max(0);
        let y0 = i64::from(y).max(0);
        let x1 = (i64::from(x) + i64::from(width)).min(i64::from(self.width));
        let y1 = (i64::from(y) + i64::from(height)).min(i64::from(self.height));

        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize, x1 as usize, y0 as usize, y1 as usize))
    }

    /// Convert the surface to an 8-bit RGB image.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            image::Rgb(rgb888(self.pixels[y as usize * self.width as usize + x as usize]))
        })
    }

    /// Encode the surface as JPEG.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, SnapshotError> {
        let quality = quality.clamp(1, 100);
        let img = self.to_rgb_image();

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .encode_image(&img)
            .map_err(|e| SnapshotError::Encode {
                message: e.to_string(),
            })?;

        Ok(output)
    }

    /// Write a JPEG snapshot of the surface to `path`.
    pub async fn save_jpeg(
        &self,
        path: impl AsRef<Path>,
        quality: u8,
    ) -> Result<(), SnapshotError> {
        let data = self.encode_jpeg(quality)?;
        tokio::fs::write(path.as_ref(), data)
            .await
            .map_err(|e| SnapshotError::Io(format!("{}: {}", path.as_ref().display(), e)))
    }
}

impl OutputSink for Framebuffer {
    fn bounds(&self) -> SurfaceBounds {
        SurfaceBounds::new(self.width, self.height)
    }

    fn paint_block(&mut self, tile: &Tile<'_>) {
        let Some((x0, x1, y0, y1)) = self.clip(tile.x, tile.y, tile.width, tile.height) else {
            return;
        };

        let stride = self.width as usize;
        let skip_cols = (x0 as i64 - i64::from(tile.x)) as usize;
        let cols = x1 - x0;

        for dst_row in y0..y1 {
            let src_row = (dst_row as i64 - i64::from(tile.y)) as u32;
            let src = &tile.row(src_row)[skip_cols..skip_cols + cols];
            let dst = &mut self.pixels[dst_row * stride + x0..dst_row * stride + x1];

            if self.swapped_input {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = s.swap_bytes();
                }
            } else {
                dst.copy_from_slice(src);
            }
        }
    }
}
