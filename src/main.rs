//! framecache - fetch a remote JPEG once, then stream it onto a display surface.
//!
//! This binary wires the resolver, decoder and renderer together.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framecache::{
    config::{Cli, Command, FetchConfig, InfoConfig, OutputFormat, ShowConfig, SourceArgs},
    BlockDecoder, Framebuffer, FsStore, HttpTransport, Outcome, PersistentStore, Resolver,
    ResourceDescriptor, TileRenderer,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Fetch(config) => run_fetch(config).await,
        Command::Show(config) => run_show(config).await,
        Command::Info(config) => run_info(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "framecache=debug"
    } else {
        "framecache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build a resolver and descriptor from the shared source arguments.
async fn build_resolver(
    source: &SourceArgs,
) -> Result<(Resolver<HttpTransport, FsStore>, ResourceDescriptor), String> {
    let descriptor = source.descriptor()?;
    let transport = HttpTransport::new().map_err(|e| e.to_string())?;
    let store = FsStore::open(&source.cache_dir)
        .await
        .map_err(|e| format!("Failed to open cache directory: {}", e))?;

    Ok((
        Resolver::with_chunk_size(transport, store, source.chunk_size),
        descriptor,
    ))
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let (resolver, descriptor) = match build_resolver(&config.source).await {
        Ok(parts) => parts,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.refresh {
        match resolver.store().remove(&descriptor.cache_key).await {
            Ok(true) => info!("Removed cached copy of {}", descriptor.cache_key),
            Ok(false) => debug!("No cached copy of {} to remove", descriptor.cache_key),
            Err(e) => {
                error!("Failed to remove {}: {}", descriptor.cache_key, e);
                return ExitCode::FAILURE;
            }
        }
    }

    let outcome = resolver.resolve(&descriptor).await;

    match config.format {
        OutputFormat::Text => match outcome {
            Outcome::AlreadyCached => println!("{}: already cached", descriptor.cache_key),
            Outcome::Fetched { bytes } => {
                println!("{}: fetched {} bytes", descriptor.cache_key, bytes)
            }
            Outcome::FetchFailed(ref e) => println!("{}: failed: {}", descriptor.cache_key, e),
        },
        OutputFormat::Json => {
            let report = FetchReport::new(&descriptor, &outcome);
            match serde_json::to_string_pretty(&report) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    error!("Failed to serialize outcome: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    if outcome.is_available() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// JSON shape of a `fetch` result.
#[derive(Serialize)]
struct FetchReport<'a> {
    url: &'a str,
    cache_key: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> FetchReport<'a> {
    fn new(descriptor: &'a ResourceDescriptor, outcome: &Outcome) -> Self {
        let (status, bytes, error) = match outcome {
            Outcome::AlreadyCached => ("cached", None, None),
            Outcome::Fetched { bytes } => ("fetched", Some(*bytes), None),
            Outcome::FetchFailed(e) => ("failed", None, Some(e.to_string())),
        };
        Self {
            url: &descriptor.url,
            cache_key: &descriptor.cache_key,
            status,
            bytes,
            error,
        }
    }
}

// =============================================================================
// Show Command
// =============================================================================

async fn run_show(config: ShowConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let (resolver, descriptor) = match build_resolver(&config.source).await {
        Ok(parts) => parts,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let decoder = match BlockDecoder::new().with_scale(config.scale) {
        Ok(decoder) => decoder.with_swap_bytes(config.swap_bytes),
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  URL: {}", descriptor.url);
    info!("  Cache: {}{}", config.source.cache_dir.display(), descriptor.cache_key);
    info!("  Surface: {}x{}", config.width, config.height);
    info!("  Scale: 1/{}, swap bytes: {}", config.scale, config.swap_bytes);

    let mut renderer = TileRenderer::new(
        Framebuffer::new(config.width, config.height).with_swapped_input(config.swap_bytes),
    );
    let mut frames = 0u32;
    let mut rendered_any = false;

    loop {
        renderer.sink_mut().fill(config.background);

        let outcome = resolver.resolve(&descriptor).await;
        if let Outcome::FetchFailed(ref e) = outcome {
            warn!("{} unavailable: {}", descriptor.cache_key, e);
        } else {
            match render_frame(&resolver, &descriptor, &decoder, &config, &mut renderer).await {
                Ok(()) => rendered_any = true,
                Err(e) => error!("Render failed: {}", e),
            }
        }

        if let Some(ref output) = config.output {
            if let Err(e) = renderer.sink().save_jpeg(output, config.quality).await {
                error!("Failed to write snapshot: {}", e);
                return ExitCode::FAILURE;
            }
            debug!("Snapshot written to {}", output.display());
        }

        frames += 1;
        if config.is_done(frames) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(config.interval_ms)).await;
    }

    if rendered_any {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Decode the cached image and push it through the renderer, logging timing.
async fn render_frame(
    resolver: &Resolver<HttpTransport, FsStore>,
    descriptor: &ResourceDescriptor,
    decoder: &BlockDecoder,
    config: &ShowConfig,
    renderer: &mut TileRenderer<Framebuffer>,
) -> Result<(), String> {
    let jpeg = resolver
        .open(descriptor)
        .await
        .map_err(|e| e.to_string())?;

    let started = Instant::now();
    let painted_before = renderer.painted();
    let summary = decoder
        .draw(&jpeg, config.x, config.y, renderer)
        .map_err(|e| e.to_string())?;

    info!(
        "Rendered {} in {} ms ({} tiles, {} painted{})",
        descriptor.cache_key,
        started.elapsed().as_millis(),
        summary.tiles,
        renderer.painted() - painted_before,
        if summary.halted { ", halted" } else { "" }
    );

    Ok(())
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info(config: InfoConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let store = match FsStore::open(&config.cache_dir).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open cache directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let jpeg = match store.open_for_read(&config.cache_key).await {
        Ok(jpeg) => jpeg,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match BlockDecoder::new().dimensions(&jpeg) {
        Ok((width, height)) => {
            println!("{}: {}x{} ({} bytes)", config.cache_key, width, height, jpeg.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
