//! HTTP client for the manifest endpoint.

use std::time::Duration;

use reqwest::blocking::Client;

use super::model::{parse_manifest, Manifest};
use crate::error::{EngineResult, SyncError};
use crate::sync::ManifestSource;

/// Query parameter naming the requested package.
pub const PACKAGE_QUERY_PARAM: &str = "modpack";

/// Default timeout for the manifest request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches manifests from a fixed endpoint.
///
/// A single attempt is made per call; failures are reported to the caller,
/// which aborts the run.
#[derive(Debug, Clone)]
pub struct ManifestClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl ManifestClient {
    /// Create a client for `endpoint` with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> EngineResult<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client for `endpoint` with a custom timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> EngineResult<Self> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network {
                url: endpoint.clone(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ManifestSource for ManifestClient {
    fn fetch(&self, package_id: Option<&str>) -> EngineResult<Manifest> {
        let mut request = self.client.get(&self.endpoint);
        if let Some(id) = package_id {
            request = request.query(&[(PACKAGE_QUERY_PARAM, id)]);
        }

        tracing::debug!(endpoint = %self.endpoint, package = ?package_id, "Fetching manifest");

        let response = request
            .send()
            .map_err(|e| SyncError::from_transport(&self.endpoint, &e, self.timeout.as_secs()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SyncError::from_transport(&self.endpoint, &e, self.timeout.as_secs()))?;

        // Error responses may still carry a JSON body with a message.
        match parse_manifest(&body) {
            Err(SyncError::Parse(_)) if !status.is_success() => Err(SyncError::Server {
                message: format!("HTTP {}", status.as_u16()),
            }),
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_client_default_timeout() {
        let client = ManifestClient::new("http://localhost/api/files").unwrap();
        assert_eq!(client.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
        assert_eq!(client.endpoint(), "http://localhost/api/files");
    }

    #[test]
    fn test_manifest_client_with_timeout() {
        let client =
            ManifestClient::with_timeout("http://localhost/api/files", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.timeout().as_secs(), 5);
    }

    #[test]
    fn test_unreachable_endpoint_is_network_error() {
        let client =
            ManifestClient::with_timeout("http://127.0.0.1:1/files", Duration::from_secs(2))
                .unwrap();
        let err = client.fetch(Some("survival")).unwrap_err();
        assert!(err.is_network(), "unexpected error: {:?}", err);
    }
}
