use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::TcpStream;
use tracing::debug;
use url::Host;

use super::{ByteSource, FetchResponse, Transport};
use crate::error::IoError;

/// Default timeout for establishing the HTTP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the reachability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP-backed implementation of [`Transport`].
///
/// Issues plain GET requests with reqwest. Reachability is probed by opening
/// a TCP connection to the locator's host and port.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default timeouts.
    pub fn new() -> Result<Self, IoError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a transport with custom connect and probe timeouts.
    pub fn with_timeouts(
        connect_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, IoError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| IoError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            probe_timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    type Source = HttpBodySource;

    async fn is_reachable(&self, url: &str) -> bool {
        let Some((host, port)) = reachability_target(url) else {
            return false;
        };

        let probe = TcpStream::connect((host.as_str(), port));
        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Reachability probe to {}:{} failed: {}", host, port, e);
                false
            }
            Err(_) => {
                debug!("Reachability probe to {}:{} timed out", host, port);
                false
            }
        }
    }

    async fn get(&self, url: &str) -> Result<FetchResponse<Self::Source>, IoError> {
        url::Url::parse(url).map_err(|e| IoError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        debug!("GET {} -> {} (length: {:?})", url, status, content_length);

        Ok(FetchResponse {
            status,
            content_length,
            body: HttpBodySource::new(response),
        })
    }
}

/// Host and port to probe for `url`.
///
/// IPv6 literals are returned without their URL brackets so they parse as
/// an address rather than being looked up as a host name.
fn reachability_target(url: &str) -> Option<(String, u16)> {
    let parsed = url::Url::parse(url).ok()?;
    let port = parsed.port_or_known_default()?;

    let host = match parsed.host()? {
        Host::Domain(domain) => domain.to_string(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };

    Some((host, port))
}

/// Body stream of an HTTP response.
///
/// Network chunks are buffered one at a time and handed out in slices of
/// whatever size the caller asks for.
pub struct HttpBodySource {
    /// The live response; `None` once the body has ended or failed
    response: Option<reqwest::Response>,
    /// Unread bytes of the current chunk
    pending: Bytes,
}

impl HttpBodySource {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response: Some(response),
            pending: Bytes::new(),
        }
    }
}

#[async_trait]
impl ByteSource for HttpBodySource {
    fn available(&self) -> usize {
        self.pending.len()
    }

    async fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        if self.pending.is_empty() {
            let Some(response) = self.response.as_mut() else {
                return Ok(0);
            };

            match response.chunk().await {
                Ok(Some(chunk)) => self.pending = chunk,
                Ok(None) => {
                    self.response = None;
                    return Ok(0);
                }
                Err(e) => {
                    self.response = None;
                    return Err(IoError::Stream(e.to_string()));
                }
            }
        }

        let n = buf.len().min(self.pending.len());
        let chunk = self.pending.split_to(n);
        buf[..n].copy_from_slice(&chunk);
        Ok(n)
    }

    fn is_connected(&self) -> bool {
        self.response.is_some() || !self.pending.is_empty()
    }
}
