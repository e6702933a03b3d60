//! Tile streaming renderer.
//!
//! A decode process pushes tiles one at a time into a [`TileSink`]. The
//! [`TileRenderer`] sink forwards each tile to an [`OutputSink`] until a
//! tile starts below the visible surface, then tells the decoder to stop.
//!
//! ```text
//! ┌──────────────┐  on_tile   ┌──────────────┐  paint_block  ┌──────────────┐
//! │ BlockDecoder │ ─────────► │ TileRenderer │ ────────────► │  OutputSink  │
//! │              │ ◄───────── │  (y < h ?)   │               │ (clips)      │
//! └──────────────┘  continue  └──────────────┘               └──────────────┘
//! ```

pub mod color;
mod framebuffer;
mod renderer;
mod tile;

pub use framebuffer::{Framebuffer, DEFAULT_SNAPSHOT_QUALITY};
pub use renderer::TileRenderer;
pub use tile::{FnTileSink, OutputSink, SurfaceBounds, Tile, TileSink};
