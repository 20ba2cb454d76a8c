// HTTP range adapter - byte-range access to the stream endpoint using reqwest

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, PRAGMA, RANGE};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Accept header sent with media requests
pub const ACCEPT_VIDEO: &str = "video/mp4,video/*;q=0.9,*/*;q=0.8";
/// Header that skips the interstitial page of tunneling proxies
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

const TUNNEL_HOST_SUFFIXES: &[&str] = &[
    ".ngrok.io",
    ".ngrok.app",
    ".ngrok-free.app",
    ".ngrok-free.dev",
];

/// When to send the tunneling-proxy bypass header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelBypass {
    /// Only for known tunnel hosts
    #[default]
    Auto,
    Always,
    Never,
}

impl TunnelBypass {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Ok(TunnelBypass::Auto),
            "always" | "true" => Ok(TunnelBypass::Always),
            "never" | "false" => Ok(TunnelBypass::Never),
            other => Err(DomainError::BadArgs(format!(
                "Invalid tunnel bypass mode: {}. Valid modes: auto, always, never",
                other
            ))),
        }
    }

    pub fn applies_to(&self, url: &Url) -> bool {
        match self {
            TunnelBypass::Always => true,
            TunnelBypass::Never => false,
            TunnelBypass::Auto => url
                .host_str()
                .map(|host| TUNNEL_HOST_SUFFIXES.iter().any(|suffix| host.ends_with(suffix)))
                .unwrap_or(false),
        }
    }
}

/// Build the shared reqwest client
pub fn build_client(connect_timeout: Option<Duration>) -> Result<Client, DomainError> {
    let mut builder = Client::builder().user_agent(concat!("cutstream/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| DomainError::TransportFailed(format!("Failed to build HTTP client: {}", e)))
}

/// Race a request against the session's cancellation token
pub(crate) async fn cancellable<T, F>(
    cancel: &CancellationToken,
    request: F,
) -> Result<Fetched<T>, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    if cancel.is_cancelled() {
        return Ok(Fetched::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(Fetched::Cancelled),
        result = request => result.map(Fetched::Data),
    }
}

/// Range-fetch client for the stream endpoint
#[derive(Clone)]
pub struct HttpRangeClient {
    client: Client,
    tunnel_bypass: TunnelBypass,
}

impl HttpRangeClient {
    pub fn new(client: Client, tunnel_bypass: TunnelBypass) -> Self {
        Self {
            client,
            tunnel_bypass,
        }
    }

    /// Request with cache-busting headers and, when applicable, the tunnel bypass header
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bypass = self.tunnel_bypass.applies_to(&url);
        let mut req = self
            .client
            .request(method, url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");
        if bypass {
            req = req.header(TUNNEL_BYPASS_HEADER, "true");
        }
        req
    }

    async fn probe_inner(&self, url: &Url) -> Result<ResourceMetadata, DomainError> {
        let resp = self
            .request(Method::HEAD, url.clone())
            .send()
            .await
            .map_err(|e| DomainError::MetadataUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DomainError::MetadataUnavailable(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let headers = resp.headers();
        let total_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(url = %url, ?total_length, ?content_type, "Probed stream metadata");
        Ok(ResourceMetadata {
            content_type,
            total_length,
        })
    }

    async fn fetch_range_inner(&self, url: &Url, range: ByteRange) -> Result<Bytes, DomainError> {
        let resp = self
            .request(Method::GET, url.clone())
            .header(RANGE, range.header_value())
            .header(ACCEPT, ACCEPT_VIDEO)
            .send()
            .await
            .map_err(|e| DomainError::ChunkFetchFailed {
                status: None,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DomainError::ChunkFetchFailed {
                status: Some(status.as_u16()),
                message: format!("HTTP error! status: {}", status.as_u16()),
            });
        }

        resp.bytes().await.map_err(|e| DomainError::ChunkFetchFailed {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })
    }

    async fn fetch_whole_inner(&self, url: &Url) -> Result<WholeResource, DomainError> {
        let mut busted = url.clone();
        busted
            .query_pairs_mut()
            .append_pair("t", &chrono::Utc::now().timestamp_millis().to_string());

        let resp = self
            .request(Method::GET, busted)
            .header(ACCEPT, ACCEPT_VIDEO)
            .send()
            .await
            .map_err(|e| DomainError::WholeFileFetchFailed {
                status: None,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("request failed");
            warn!(url = %url, status = status.as_u16(), "Whole-file fetch rejected");
            return Err(DomainError::WholeFileFetchFailed {
                status: Some(status.as_u16()),
                message: format!("Error fetching video: {} {}", status.as_u16(), reason),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| DomainError::WholeFileFetchFailed {
                status: Some(status.as_u16()),
                message: e.to_string(),
            })?;

        Ok(WholeResource { body, content_type })
    }
}

#[async_trait]
impl RangeFetchPort for HttpRangeClient {
    async fn probe(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Fetched<ResourceMetadata>, DomainError> {
        cancellable(cancel, self.probe_inner(url)).await
    }

    async fn fetch_range(
        &self,
        url: &Url,
        range: ByteRange,
        cancel: &CancellationToken,
    ) -> Result<Fetched<Bytes>, DomainError> {
        cancellable(cancel, self.fetch_range_inner(url, range)).await
    }

    async fn fetch_whole(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Fetched<WholeResource>, DomainError> {
        cancellable(cancel, self.fetch_whole_inner(url)).await
    }
}
