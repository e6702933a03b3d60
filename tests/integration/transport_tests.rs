//! HTTP transport integration tests.
//!
//! Tests verify:
//! - Reachability probing against live and closed ports
//! - Status and declared length are reported as sent
//! - Bodies stream fully with and without a Content-Length
//! - The source reports disconnection once the body ends

use framecache::{ByteSource, HttpBodySource, HttpTransport, Transport};

use super::test_utils::{create_payload, unreachable_url, ImageServer, RawServer};

/// Drain a body source with reads of at most `chunk` bytes.
async fn read_all(source: &mut HttpBodySource, chunk: usize) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = vec![0u8; chunk];
    while source.is_connected() {
        let n = source.read_up_to(&mut buf).await.unwrap();
        data.extend_from_slice(&buf[..n]);
    }
    data
}

// =============================================================================
// Reachability
// =============================================================================

#[tokio::test]
async fn test_live_server_is_reachable() {
    let server = ImageServer::start(vec![("/a.jpg", vec![1, 2, 3])]).await;
    let transport = HttpTransport::new().unwrap();

    assert!(transport.is_reachable(&server.url("/a.jpg")).await);
    // Probing does not issue a request
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_ipv6_literal_is_reachable() {
    let Ok(server) = ImageServer::start_on("[::1]:0", vec![("/a.jpg", vec![1, 2, 3])]).await
    else {
        // No IPv6 loopback on this host
        return;
    };
    let transport = HttpTransport::new().unwrap();

    let url = server.url("/a.jpg");
    assert!(url.starts_with("http://[::1]:"));
    assert!(transport.is_reachable(&url).await);
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let transport = HttpTransport::new().unwrap();
    assert!(!transport.is_reachable(&unreachable_url("/a.jpg").await).await);
}

// =============================================================================
// Requests
// =============================================================================

#[tokio::test]
async fn test_get_with_content_length() {
    let payload = create_payload(1000);
    let server = ImageServer::start(vec![("/captured.jpg", payload.clone())]).await;
    let transport = HttpTransport::new().unwrap();

    let mut response = transport.get(&server.url("/captured.jpg")).await.unwrap();
    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.content_length, Some(1000));

    let data = read_all(&mut response.body, 128).await;
    assert_eq!(data, payload);
    assert!(!response.body.is_connected());
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_get_chunked_without_length() {
    let server = RawServer::chunked(vec![vec![1u8; 50], vec![2u8; 50], vec![3u8; 28]]).await;
    let transport = HttpTransport::new().unwrap();

    let mut response = transport.get(&server.url("/stream.jpg")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.content_length, None);

    let data = read_all(&mut response.body, 128).await;
    assert_eq!(data.len(), 128);
    assert!(data[..50].iter().all(|&b| b == 1));
    assert!(data[50..100].iter().all(|&b| b == 2));
    assert!(data[100..].iter().all(|&b| b == 3));
}

#[tokio::test]
async fn test_small_reads_split_network_chunks() {
    let payload = create_payload(300);
    let server = ImageServer::start(vec![("/a.jpg", payload.clone())]).await;
    let transport = HttpTransport::new().unwrap();

    let mut response = transport.get(&server.url("/a.jpg")).await.unwrap();
    let mut buf = [0u8; 7];
    let n = response.body.read_up_to(&mut buf).await.unwrap();
    assert_eq!(n, 7);
    assert_eq!(&buf[..], &payload[..7]);
    assert!(response.body.available() > 0 || response.body.is_connected());

    let rest = read_all(&mut response.body, 7).await;
    assert_eq!(rest, payload[7..].to_vec());
}

#[tokio::test]
async fn test_get_missing_path_reports_status() {
    let server = ImageServer::start(vec![("/a.jpg", vec![1, 2, 3])]).await;
    let transport = HttpTransport::new().unwrap();

    let response = transport.get(&server.url("/missing.jpg")).await.unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_get_closed_port_fails() {
    let transport = HttpTransport::new().unwrap();
    let result = transport.get(&unreachable_url("/a.jpg").await).await;
    assert!(result.is_err());
}
