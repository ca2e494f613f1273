//! Remote archives read through HTTP `Range` requests.
//!
//! Only the bytes the indexer asks for travel over the wire: the end
//! records, the central directory and one local header per entry.

use async_trait::async_trait;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{Client, StatusCode};
use std::io::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::ReadAt;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Attempts per range request before a timeout or connect error is final
const DEFAULT_MAX_RETRY: u32 = 10;
const RETRY_STEP: Duration = Duration::from_millis(500);

/// Random access to a remote archive over HTTP
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Open `url` with a default client.
    ///
    /// A HEAD request checks that the server accepts byte ranges and
    /// reports the archive size.
    pub async fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::other)?;
        Self::with_client(client, url.into()).await
    }

    /// Open `url` with a caller-configured client (proxies, TLS roots, timeouts).
    pub async fn with_client(client: Client, url: String) -> Result<Self> {
        let size = probe(&client, &url).await?;
        debug!(%url, size, "remote archive accepts range requests");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: DEFAULT_MAX_RETRY,
        })
    }

    /// Total payload bytes received so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// One `206` response for `start..=end`, copied into `buf`.
    ///
    /// The server may send less than asked for; the count is returned.
    async fn fetch_into(&self, start: u64, end: u64, buf: &mut [u8]) -> Result<usize> {
        let range = format!("bytes={start}-{end}");
        let mut attempt = 0;

        loop {
            match self.client.get(&self.url).header(RANGE, &range).send().await {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => {
                    let body = resp.bytes().await.map_err(Error::other)?;
                    let n = body.len().min(buf.len());
                    buf[..n].copy_from_slice(&body[..n]);
                    trace!(%range, received = n, "range response");
                    return Ok(n);
                }
                Ok(resp) => {
                    return Err(Error::other(format!(
                        "range request {range} answered with status {}",
                        resp.status()
                    )));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    attempt += 1;
                    if attempt >= self.max_retry {
                        return Err(Error::other(format!(
                            "range request {range} failed after {attempt} attempts: {e}"
                        )));
                    }
                    warn!(%range, attempt, max = self.max_retry, "retrying: {e}");
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(e) => return Err(Error::other(e)),
            }
        }
    }
}

/// HEAD the archive and return its size.
async fn probe(client: &Client, url: &str) -> Result<u64> {
    let resp = client.head(url).send().await.map_err(Error::other)?;
    if !resp.status().is_success() {
        return Err(Error::other(format!("HEAD {url} answered with status {}", resp.status())));
    }

    let headers = resp.headers();
    let accepts_bytes = headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("bytes"));
    if !accepts_bytes {
        return Err(Error::other(format!("{url} does not support range requests")));
    }

    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::other(format!("{url} did not report a content length")))
}

/// Inclusive byte range for `len` bytes from `offset`, clipped to `size`.
fn byte_range(offset: u64, len: usize, size: u64) -> Option<(u64, u64)> {
    if len == 0 || offset >= size {
        return None;
    }
    let end = offset.saturating_add(len as u64 - 1).min(size - 1);
    Some((offset, end))
}

fn backoff(attempt: u32) -> Duration {
    RETRY_STEP * attempt
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let Some((start, end)) = byte_range(offset, buf.len(), self.size) else {
            return Ok(0);
        };
        let wanted = (end - start + 1) as usize;

        // Servers may cut a range short; ask again for the rest.
        let mut received = 0;
        while received < wanted {
            let n = self
                .fetch_into(start + received as u64, end, &mut buf[received..wanted])
                .await?;
            if n == 0 {
                break;
            }
            received += n;
            self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
