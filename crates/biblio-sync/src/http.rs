//! Reqwest-backed remote ledger adapter.
//!
//! This adapter owns transport details only: request serialisation, timeout
//! and HTTP error mapping. The reconciliation contract (upsert keyed by
//! transaction id) lives in [`crate::remote::RemoteLedger`].
//!
//! ## Endpoint Shape
//! ```text
//! GET  {endpoint}/health        → 2xx means reachable
//! POST {endpoint}/transactions  → body: UpsertRequest (JSON)
//!                                 2xx: UpsertResponse { acked_ids }
//!                                 other: batch rejected, retried next tick
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use biblio_core::Transaction;

use crate::error::{SyncError, SyncResult};
use crate::remote::{BatchAck, RemoteLedger};

// =============================================================================
// Wire Types
// =============================================================================

/// Upsert request body.
#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    /// Submitting device, for server-side audit.
    device_id: &'a str,
    /// The batch, keyed by each record's `id`.
    transactions: &'a [Transaction],
}

/// Upsert response body.
///
/// A server that only confirms whole batches echoes every id; one that
/// can confirm subsets lists exactly what it stored.
#[derive(Debug, Deserialize)]
struct UpsertResponse {
    acked_ids: Vec<String>,
}

// =============================================================================
// HTTP Remote
// =============================================================================

/// Remote ledger adapter that performs HTTP requests against one endpoint.
pub struct HttpRemote {
    client: Client,
    base: Url,
    device_id: String,
    request_timeout_secs: u64,
}

impl HttpRemote {
    /// Builds an adapter using a reqwest client with an explicit request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint URL is invalid or the reqwest
    /// client cannot be constructed.
    pub fn new(
        endpoint: &str,
        device_id: impl Into<String>,
        request_timeout: Duration,
    ) -> SyncResult<Self> {
        let base = Url::parse(endpoint)?;

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(HttpRemote {
            client,
            base,
            device_id: device_id.into(),
            request_timeout_secs: request_timeout.as_secs(),
        })
    }

    fn route(&self, path: &str) -> SyncResult<Url> {
        // Joining against "a/b" vs "a/b/" differs in url; normalize once
        let mut base = self.base.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(base.join(path)?)
    }

    fn map_transport_error(&self, error: reqwest::Error) -> SyncError {
        if error.is_timeout() {
            SyncError::Timeout(self.request_timeout_secs)
        } else {
            SyncError::RemoteRejected(error.to_string())
        }
    }
}

#[async_trait]
impl RemoteLedger for HttpRemote {
    async fn probe(&self) -> bool {
        let Ok(url) = self.route("health") else {
            return false;
        };

        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Remote probe failed");
                false
            }
        }
    }

    async fn upsert_transactions(&self, batch: &[Transaction]) -> SyncResult<BatchAck> {
        let url = self.route("transactions")?;

        let response = self
            .client
            .post(url)
            .json(&UpsertRequest {
                device_id: &self.device_id,
                transactions: batch,
            })
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body));
        }

        let decoded: UpsertResponse = response
            .json()
            .await
            .map_err(|e| SyncError::SerializationFailed(e.to_string()))?;

        debug!(acked = decoded.acked_ids.len(), "Remote acknowledged batch");

        Ok(BatchAck {
            acked_ids: decoded.acked_ids,
        })
    }
}

fn map_status_error(status: StatusCode, body: &str) -> SyncError {
    let preview: String = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview: String = preview.chars().take(160).collect();

    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    SyncError::RemoteRejected(message)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_joins_with_and_without_trailing_slash() {
        let remote = HttpRemote::new(
            "https://ledger.example.edu/api",
            "kiosk-01",
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(
            remote.route("transactions").unwrap().as_str(),
            "https://ledger.example.edu/api/transactions"
        );

        let remote = HttpRemote::new(
            "https://ledger.example.edu/api/",
            "kiosk-01",
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(
            remote.route("health").unwrap().as_str(),
            "https://ledger.example.edu/api/health"
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(HttpRemote::new("not a url", "kiosk-01", Duration::from_secs(10)).is_err());
    }

    #[test]
    fn test_status_error_includes_body_preview() {
        let err = map_status_error(StatusCode::INTERNAL_SERVER_ERROR, "backend\nunavailable");
        assert_eq!(
            err.to_string(),
            "Remote rejected batch: status 500: backend unavailable"
        );

        let err = map_status_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.to_string(), "Remote rejected batch: status 502");
    }
}
