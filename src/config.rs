//! Configuration management for framecache.
//!
//! This module provides the CLI surface:
//! - Command-line arguments via clap, one subcommand per workflow
//! - Environment variables with `FRAMECACHE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Subcommands
//!
//! - `fetch` - resolve one URL into the cache and report the outcome
//! - `show` - resolve, decode and render into a framebuffer in a loop
//! - `info` - print the dimensions of a cached JPEG
//!
//! # Environment Variables
//!
//! - `FRAMECACHE_URL` - Remote locator of the image
//! - `FRAMECACHE_CACHE_KEY` - Cache key (default: derived from the URL)
//! - `FRAMECACHE_CACHE_DIR` - Cache directory (default: ./cache)
//! - `FRAMECACHE_CHUNK_SIZE` - Bytes per network read (default: 128)
//! - `FRAMECACHE_WIDTH` / `FRAMECACHE_HEIGHT` - Surface size (default: 240x320)
//! - `FRAMECACHE_SCALE` - JPEG scale factor 1, 2, 4 or 8 (default: 1)
//! - `FRAMECACHE_OUTPUT` - Snapshot path for `show`

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::decode::is_valid_scale;
use crate::fetch::{ResourceDescriptor, DEFAULT_CHUNK_SIZE};
use crate::render::color;
use crate::render::DEFAULT_SNAPSHOT_QUALITY;
use crate::store::{FsStore, STAGING_SUFFIX};

// =============================================================================
// Default Values
// =============================================================================

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Default surface width (portrait 240x320 panel).
pub const DEFAULT_WIDTH: u32 = 240;

/// Default surface height.
pub const DEFAULT_HEIGHT: u32 = 320;

/// Largest accepted surface edge.
pub const MAX_SURFACE_EDGE: u32 = 4096;

/// Largest accepted network read size.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

/// Default delay between frames in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// framecache - cache-or-fetch remote JPEGs and stream them onto a display surface.
#[derive(Parser, Debug, Clone)]
#[command(name = "framecache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Make a remote image available in the local cache.
    Fetch(FetchConfig),

    /// Resolve an image, then decode and render it into a framebuffer.
    Show(ShowConfig),

    /// Print the dimensions of a cached JPEG.
    Info(InfoConfig),
}

/// Output format for the `fetch` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable line
    #[default]
    Text,
    /// JSON object
    Json,
}

/// Where an image comes from and where it is cached.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Remote locator of the image.
    #[arg(long, env = "FRAMECACHE_URL")]
    pub url: String,

    /// Cache key for the image.
    ///
    /// Defaults to the last path segment of the URL, e.g. `/captured.jpg`.
    #[arg(long, env = "FRAMECACHE_CACHE_KEY")]
    pub cache_key: Option<String>,

    /// Directory holding cached images.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "FRAMECACHE_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Maximum bytes moved per network read.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, env = "FRAMECACHE_CHUNK_SIZE")]
    pub chunk_size: usize,
}

impl SourceArgs {
    /// Validate the source arguments.
    pub fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| format!("Invalid --url '{}': {}", self.url, e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!("--url must be http or https, got '{}'", parsed.scheme()));
        }

        // Explicit or derived, the key must be storable before anything is fetched.
        validate_cache_key(&self.descriptor()?.cache_key)?;

        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(format!("chunk_size must be between 1 and {}", MAX_CHUNK_SIZE));
        }

        Ok(())
    }

    /// Build the resource descriptor, deriving the cache key if none was given.
    pub fn descriptor(&self) -> Result<ResourceDescriptor, String> {
        match self.cache_key {
            Some(ref key) => Ok(ResourceDescriptor::new(self.url.clone(), key.clone())),
            None => ResourceDescriptor::from_url(self.url.clone()).map_err(|e| e.to_string()),
        }
    }
}

/// Configuration for the `fetch` command.
#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Delete any cached copy first, forcing a download.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FetchConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()
    }
}

/// Configuration for the `show` command.
#[derive(Args, Debug, Clone)]
pub struct ShowConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Surface width in pixels.
    #[arg(long, default_value_t = DEFAULT_WIDTH, env = "FRAMECACHE_WIDTH")]
    pub width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = DEFAULT_HEIGHT, env = "FRAMECACHE_HEIGHT")]
    pub height: u32,

    /// Horizontal position of the image's top-left corner.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub x: i32,

    /// Vertical position of the image's top-left corner.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub y: i32,

    /// JPEG scale factor (1, 2, 4 or 8).
    #[arg(long, default_value_t = 1, env = "FRAMECACHE_SCALE")]
    pub scale: u8,

    /// Emit byte-swapped RGB565, as SPI panels expect.
    #[arg(long, default_value_t = false)]
    pub swap_bytes: bool,

    /// Colour to clear the surface with before each frame.
    ///
    /// A name (black, white, red, green, blue) or an RGB565 hex value such as 0xF800.
    #[arg(long, default_value = "red", value_parser = parse_rgb565)]
    pub background: u16,

    /// Write a JPEG snapshot of the surface here after each frame.
    #[arg(long, env = "FRAMECACHE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// JPEG quality for snapshots (1-100).
    #[arg(long, default_value_t = DEFAULT_SNAPSHOT_QUALITY)]
    pub quality: u8,

    /// Number of frames to render; 0 runs until interrupted.
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,

    /// Delay between frames in milliseconds.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ShowConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;

        if self.width == 0 || self.height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }
        if self.width > MAX_SURFACE_EDGE || self.height > MAX_SURFACE_EDGE {
            return Err(format!("width and height must be at most {}", MAX_SURFACE_EDGE));
        }

        if !is_valid_scale(self.scale) {
            return Err("scale must be 1, 2, 4 or 8".to_string());
        }

        if self.quality == 0 || self.quality > 100 {
            return Err("quality must be between 1 and 100".to_string());
        }

        Ok(())
    }

    /// Whether the render loop should stop after `completed` frames.
    pub fn is_done(&self, completed: u32) -> bool {
        self.iterations != 0 && completed >= self.iterations
    }
}

/// Configuration for the `info` command.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Cache key of the image, e.g. `/captured.jpg`.
    #[arg(long, env = "FRAMECACHE_CACHE_KEY")]
    pub cache_key: String,

    /// Directory holding cached images.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "FRAMECACHE_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InfoConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_cache_key(&self.cache_key)
    }
}

/// Reject keys the cache directory cannot hold, before any network I/O.
fn validate_cache_key(key: &str) -> Result<(), String> {
    FsStore::validate_key(key).map_err(|_| {
        format!(
            "cache key '{}' must be a relative file name without '..' or a '{}' suffix",
            key, STAGING_SUFFIX
        )
    })
}

/// Parse a colour name or RGB565 hex value.
pub fn parse_rgb565(value: &str) -> Result<u16, String> {
    let named = match value.to_ascii_lowercase().as_str() {
        "black" => Some(color::BLACK),
        "white" => Some(color::WHITE),
        "red" => Some(color::RED),
        "green" => Some(color::GREEN),
        "blue" => Some(color::BLUE),
        _ => None,
    };
    if let Some(named) = named {
        return Ok(named);
    }

    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(hex, 16)
        .map_err(|_| format!("'{}' is not a colour name or RGB565 hex value", value))
}

// =============================================================================
// Tests
// =============================================================================
