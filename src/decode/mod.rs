//! JPEG block decoder.
//!
//! Decodes a JPEG into RGB565 and pushes it to a [`TileSink`](crate::render::TileSink)
//! in MCU-sized tiles, row by row from the top. The sink can stop decoding
//! at any tile.
//!
//! # Design Decisions
//!
//! - **Whole-image decode**: the bitstream is decoded by the `image` crate
//!   in one pass; only tile emission is incremental.
//! - **Power-of-two scaling**: output can be reduced by 1, 2, 4 or 8, the
//!   factors a hardware MCU decoder supports natively.
//! - **Byte order**: pixels can be byte-swapped for sinks that expect
//!   big-endian RGB565.

mod block;

pub use block::{is_valid_scale, BlockDecoder, DrawSummary, DEFAULT_BLOCK_SIZE, VALID_SCALES};
