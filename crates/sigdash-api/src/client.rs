//! HTTP client for the snapshot and toggle endpoints.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use sigdash_core::TradingMode;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::types::{SnapshotResponse, ToggleResponse};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Server endpoints consumed by the sync loop.
///
/// Implementations must bound every call by a timeout; a call that does
/// not complete in time resolves to `ApiError::Timeout`.
pub trait SignalApi: Send + Sync {
    /// Fetch the full state (`GET /snapshot`).
    fn fetch_snapshot(&self) -> BoxFuture<'_, ApiResult<SnapshotResponse>>;

    /// Flip the persisted mode (`POST /toggle_mode`), returning the new mode.
    fn toggle_mode(&self) -> BoxFuture<'_, ApiResult<TradingMode>>;
}

/// Arc wrapper for SignalApi trait objects.
pub type DynSignalApi = Arc<dyn SignalApi>;

/// reqwest-backed `SignalApi`.
pub struct HttpSignalApi {
    client: Client,
    snapshot_url: String,
    toggle_url: String,
    timeout: Duration,
}

impl HttpSignalApi {
    /// Create a client for `base_url` with the default endpoint paths.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_paths(base_url, "/snapshot", "/toggle_mode", DEFAULT_TIMEOUT)
    }

    /// Create a client with explicit endpoint paths and timeout.
    pub fn with_paths(
        base_url: &str,
        snapshot_path: &str,
        toggle_path: &str,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            snapshot_url: join_url(base_url, snapshot_path),
            toggle_url: join_url(base_url, toggle_path),
            timeout,
        })
    }

    pub fn snapshot_url(&self) -> &str {
        &self.snapshot_url
    }

    pub fn toggle_url(&self) -> &str {
        &self.toggle_url
    }

    async fn get_snapshot(&self) -> ApiResult<SnapshotResponse> {
        debug!(url = %self.snapshot_url, "Fetching snapshot");

        let response = self
            .client
            .get(&self.snapshot_url)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout))?;

        let snapshot: SnapshotResponse = self.decode(response).await?;
        debug!(
            mode = %snapshot.mode,
            signals = snapshot.signals.len(),
            "Snapshot received"
        );
        Ok(snapshot)
    }

    async fn post_toggle(&self) -> ApiResult<TradingMode> {
        info!(url = %self.toggle_url, "Requesting mode toggle");

        let response = self
            .client
            .post(&self.toggle_url)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout))?;

        let toggled: ToggleResponse = self.decode(response).await?;
        info!(mode = %toggled.mode, "Mode toggle answered");
        Ok(toggled.mode)
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl SignalApi for HttpSignalApi {
    fn fetch_snapshot(&self) -> BoxFuture<'_, ApiResult<SnapshotResponse>> {
        Box::pin(self.get_snapshot())
    }

    fn toggle_mode(&self) -> BoxFuture<'_, ApiResult<TradingMode>> {
        Box::pin(self.post_toggle())
    }
}

impl std::fmt::Debug for HttpSignalApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSignalApi")
            .field("snapshot_url", &self.snapshot_url)
            .field("toggle_url", &self.toggle_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://host:5000", "/snapshot"), "http://host:5000/snapshot");
        assert_eq!(join_url("http://host:5000/", "snapshot"), "http://host:5000/snapshot");
        assert_eq!(join_url("http://host/api/", "/toggle_mode"), "http://host/api/toggle_mode");
    }

    #[test]
    fn test_client_urls() {
        let api = HttpSignalApi::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(api.snapshot_url(), "http://127.0.0.1:5000/snapshot");
        assert_eq!(api.toggle_url(), "http://127.0.0.1:5000/toggle_mode");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let api = HttpSignalApi::with_paths(
            "http://127.0.0.1:9",
            "/snapshot",
            "/toggle_mode",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = api.fetch_snapshot().await.unwrap_err();
        assert!(
            matches!(err, ApiError::Transport(_) | ApiError::Timeout(_)),
            "unexpected error: {err:?}"
        );
    }
}
