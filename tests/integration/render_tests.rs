//! Resolve-decode-render integration tests.
//!
//! Tests verify:
//! - A fetched JPEG lands on the framebuffer at its position
//! - Decoding halts once tiles start below the surface
//! - Scaling and byte swapping survive the whole pipeline
//! - Snapshots of the surface are valid JPEGs

use framecache::render::color::{self, rgb888};
use framecache::{BlockDecoder, Framebuffer, ResourceDescriptor, TileRenderer};

use super::test_utils::{create_resolver, create_test_jpeg, ImageServer};

fn is_reddish(pixel: u16) -> bool {
    let [r, g, b] = rgb888(pixel);
    r > 200 && g < 60 && b < 60
}

fn is_greenish(pixel: u16) -> bool {
    let [r, g, b] = rgb888(pixel);
    g > 200 && r < 60 && b < 60
}

/// Serve `jpeg`, resolve it into a fresh cache and return the cached bytes.
async fn fetch_jpeg(jpeg: Vec<u8>) -> bytes::Bytes {
    let server = ImageServer::start(vec![("/captured.jpg", jpeg)]).await;
    let (_dir, resolver) = create_resolver().await;
    let descriptor = ResourceDescriptor::from_url(server.url("/captured.jpg")).unwrap();

    assert!(resolver.resolve(&descriptor).await.was_fetched());
    resolver.open(&descriptor).await.unwrap()
}

#[tokio::test]
async fn test_fetched_image_is_drawn_at_position() {
    let jpeg = fetch_jpeg(create_test_jpeg(64, 48, [0, 255, 0])).await;

    let mut framebuffer = Framebuffer::new(240, 320);
    framebuffer.fill(color::RED);
    let mut renderer = TileRenderer::new(&mut framebuffer);

    let summary = BlockDecoder::new()
        .draw(&jpeg, 100, 200, &mut renderer)
        .unwrap();
    assert_eq!(summary.tiles, 12);
    assert!(!summary.halted);
    assert_eq!(renderer.painted(), 12);

    assert!(is_greenish(framebuffer.pixel(100, 200).unwrap()));
    assert!(is_greenish(framebuffer.pixel(163, 247).unwrap()));
    // Background is untouched around the image
    assert_eq!(framebuffer.pixel(99, 200), Some(color::RED));
    assert_eq!(framebuffer.pixel(164, 247), Some(color::RED));
    assert_eq!(framebuffer.pixel(100, 248), Some(color::RED));
}

#[tokio::test]
async fn test_tall_image_halts_below_surface() {
    let jpeg = fetch_jpeg(create_test_jpeg(32, 640, [255, 0, 0])).await;

    let mut renderer = TileRenderer::new(Framebuffer::new(240, 320));
    let summary = BlockDecoder::new().draw(&jpeg, 0, 0, &mut renderer).unwrap();

    // 20 rows of 2 tiles fit; the first tile of row 21 stops decoding
    assert!(summary.halted);
    assert_eq!(summary.tiles, 41);
    assert_eq!(renderer.painted(), 40);

    let framebuffer = renderer.into_sink();
    assert!(is_reddish(framebuffer.pixel(0, 319).unwrap()));
    assert!(is_reddish(framebuffer.pixel(31, 0).unwrap()));
    assert_eq!(framebuffer.pixel(32, 0), Some(color::BLACK));
}

#[tokio::test]
async fn test_wide_image_is_clipped_by_sink() {
    let jpeg = fetch_jpeg(create_test_jpeg(480, 32, [255, 0, 0])).await;

    let mut renderer = TileRenderer::new(Framebuffer::new(240, 320));
    let summary = BlockDecoder::new().draw(&jpeg, -8, 0, &mut renderer).unwrap();

    // Tiles off the right edge are still forwarded; the sink clips them
    assert!(!summary.halted);
    assert_eq!(summary.tiles, 60);

    let framebuffer = renderer.into_sink();
    assert!(is_reddish(framebuffer.pixel(0, 0).unwrap()));
    assert!(is_reddish(framebuffer.pixel(239, 31).unwrap()));
    assert_eq!(framebuffer.pixel(0, 32), Some(color::BLACK));
}

#[tokio::test]
async fn test_scaled_swapped_pipeline() {
    let jpeg = fetch_jpeg(create_test_jpeg(128, 128, [0, 255, 0])).await;

    let decoder = BlockDecoder::new()
        .with_scale(4)
        .unwrap()
        .with_swap_bytes(true);
    assert_eq!(decoder.dimensions(&jpeg).unwrap(), (128, 128));

    let mut renderer =
        TileRenderer::new(Framebuffer::new(240, 320).with_swapped_input(true));
    let summary = decoder.draw(&jpeg, 0, 0, &mut renderer).unwrap();
    assert_eq!(summary.tiles, 4);

    let framebuffer = renderer.into_sink();
    assert!(is_greenish(framebuffer.pixel(0, 0).unwrap()));
    assert!(is_greenish(framebuffer.pixel(31, 31).unwrap()));
    assert_eq!(framebuffer.pixel(32, 32), Some(color::BLACK));
}

#[tokio::test]
async fn test_snapshot_of_rendered_surface() {
    let jpeg = fetch_jpeg(create_test_jpeg(64, 64, [255, 0, 0])).await;

    let mut renderer = TileRenderer::new(Framebuffer::new(240, 320));
    BlockDecoder::new().draw(&jpeg, 0, 0, &mut renderer).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("frame.jpg");
    renderer.sink().save_jpeg(&path, 90).await.unwrap();

    let snapshot = std::fs::read(&path).unwrap();
    let decoder = BlockDecoder::new();
    assert_eq!(decoder.dimensions(&snapshot).unwrap(), (240, 320));
}
