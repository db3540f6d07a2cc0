//! Network retrieval seam for the transfer engine.
//!
//! The [`Fetcher`] trait retrieves a complete response body for a URL,
//! reporting received bytes as chunks arrive. [`HttpFetcher`] is the
//! production implementation over `reqwest`; tests substitute scripted
//! fetchers.
//!
//! The trait uses boxed futures so it stays dyn-compatible and the engine can
//! hold an `Arc<dyn Fetcher>`.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::error::{TransferError, TransferResult};

/// Observer called with `(bytes_received, total_bytes)` after each chunk.
pub type ChunkObserver<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// A single retrieval request.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Source URL.
    pub url: &'a str,
    /// Extra request headers.
    pub headers: &'a [(String, String)],
    /// Timeout for the whole request.
    pub timeout: Duration,
}

/// Retrieves remote bytes.
pub trait Fetcher: Send + Sync {
    /// Fetch the full body for `request`.
    ///
    /// Implementations should call `on_chunk` in non-decreasing byte order
    /// and return [`TransferError::Cancelled`] once `cancel` fires.
    fn fetch<'a>(
        &'a self,
        request: FetchRequest<'a>,
        on_chunk: ChunkObserver<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, TransferResult<Bytes>>;
}

/// HTTP(S) fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client.
    pub fn new() -> TransferResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("edgemodel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransferError::Http {
                url: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_body(
        &self,
        request: FetchRequest<'_>,
        on_chunk: ChunkObserver<'_>,
        cancel: &CancellationToken,
    ) -> TransferResult<Bytes> {
        let url = request.url;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransferError::Timeout {
                    url: url.to_string(),
                    timeout_secs: request.timeout.as_secs(),
                }
            } else {
                TransferError::Http {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let mut builder = self.client.get(url).timeout(request.timeout);
        for (name, value) in request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder.send().await.map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut body = BytesMut::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);

        while let Some(chunk) = response.chunk().await.map_err(map_err)? {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            body.extend_from_slice(&chunk);
            on_chunk(body.len() as u64, total);
        }

        Ok(body.freeze())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest<'a>,
        on_chunk: ChunkObserver<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, TransferResult<Bytes>> {
        self.fetch_body(request, on_chunk, cancel).boxed()
    }
}
