//! Transport configuration: where the service lives and how long to wait.

use std::time::Duration;

use sirview_protocol::DEFAULT_BASE_URL;

use crate::ClientError;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Service root, e.g. `http://localhost:8080`. A trailing `/` is ignored.
    pub base_url: String,
    /// Time allowed to establish a TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Total time allowed for a batch or health request. Not applied to the
    /// stream, which stays open indefinitely.
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl TransportConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client, ClientError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_separator() {
        let cfg = TransportConfig::with_base_url("http://sim.example:8080/");
        assert_eq!(
            cfg.endpoint("/api/simulation/run"),
            "http://sim.example:8080/api/simulation/run"
        );
    }

    #[test]
    fn endpoint_strips_repeated_separators() {
        let cfg = TransportConfig::with_base_url("http://sim.example//");
        assert_eq!(cfg.endpoint("api/x"), "http://sim.example/api/x");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let cfg = TransportConfig::with_base_url("https://host/prefix");
        assert_eq!(cfg.endpoint("/api/simulation/health"), "https://host/prefix/api/simulation/health");
    }
}
