//! reqwest-backed HTTP capabilities.
//!
//! `HttpClient` implements both [`Reachability`] and [`HeaderEcho`]. It is
//! single-attempt: a probe measures the network as it is now.

use crate::capabilities::{HeaderEcho, Reachability};
use crate::core::ProbeError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,

    /// Agent string sent with every request.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("privacyscan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP capability backed by a shared `reqwest::Client`.
///
/// # Example
///
/// ```rust,ignore
/// use privacyscan::capabilities::{HttpClient, HttpClientConfig};
/// use std::time::Duration;
///
/// let client = HttpClient::new(HttpClientConfig::new().with_timeout(Duration::from_secs(5)))?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: HttpClientConfig,
    client: reqwest::Client,
}

impl HttpClient {
    /// Creates a client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProbeError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> Result<Self, ProbeError> {
        Self::new(HttpClientConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn map_send_error(&self, url: &str, error: reqwest::Error) -> ProbeError {
        if error.is_timeout() {
            ProbeError::timeout(url, self.config.timeout)
        } else {
            ProbeError::request(url, error.to_string())
        }
    }
}

#[async_trait]
impl Reachability for HttpClient {
    async fn reach(&self, url: &str) -> Result<Duration, ProbeError> {
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        let elapsed = start.elapsed();
        tracing::debug!(
            url = %url,
            status = response.status().as_u16(),
            latency_ms = elapsed.as_millis() as u64,
            "Reachability request answered"
        );

        Ok(elapsed)
    }
}

#[async_trait]
impl HeaderEcho for HttpClient {
    async fn echo_headers(&self, url: &str) -> Result<HashMap<String, String>, ProbeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        if !response.status().is_success() {
            return Err(ProbeError::request(
                url,
                format!("unexpected status: {}", response.status()),
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProbeError::malformed(url, e.to_string()))?;

        parse_echoed_headers(url, &body)
    }
}

/// Extracts the `headers` object of an echo response.
fn parse_echoed_headers(
    url: &str,
    body: &serde_json::Value,
) -> Result<HashMap<String, String>, ProbeError> {
    let headers = body
        .get("headers")
        .and_then(|h| h.as_object())
        .ok_or_else(|| ProbeError::malformed(url, "missing 'headers' object"))?;

    Ok(headers
        .iter()
        .filter_map(|(name, value)| value.as_str().map(|v| (name.clone(), v.to_string())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_builder() {
        let config = HttpClientConfig::new()
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("scan-test");

        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "scan-test");
    }

    #[test]
    fn test_parse_echoed_headers() {
        let body = json!({
            "headers": {
                "Accept": "*/*",
                "Via": "1.1 proxy.corp",
                "X-Amzn-Trace-Id": "Root=1-abc"
            }
        });

        let headers = parse_echoed_headers("https://httpbin.org/headers", &body).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers["Via"], "1.1 proxy.corp");
    }

    #[test]
    fn test_parse_echoed_headers_missing_object() {
        let body = json!({ "origin": "203.0.113.7" });
        let err = parse_echoed_headers("https://httpbin.org/headers", &body).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { .. }));
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpClient::with_defaults().is_ok());
    }

    /// Serves one canned response on a loopback port and returns its URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
        format!("http://{addr}/")
    }

    /// Returns a loopback URL nothing is listening on.
    async fn closed_port() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_any_status_is_reachable() {
        let client = HttpClient::with_defaults().unwrap();
        let url = serve_once("404 Not Found", "{}").await;

        assert!(client.reach(&url).await.is_ok());
    }

    #[tokio::test]
    async fn test_refused_connection_is_request_error() {
        let client = HttpClient::with_defaults().unwrap();
        let url = closed_port().await;

        let err = client.reach(&url).await.unwrap_err();
        assert!(matches!(err, ProbeError::Request { .. }));
        assert!(!err.is_capability_failure());
        assert_eq!(err.target(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_refused_site_is_the_only_blocked_one() {
        use crate::core::{Probe, Status};
        use crate::probes::network::{NetworkProbe, NetworkProbeConfig};
        use std::sync::Arc;

        let live = serve_once("404 Not Found", "").await;
        let dead = closed_port().await;
        let probe = NetworkProbe::with_config(
            Arc::new(HttpClient::with_defaults().unwrap()),
            NetworkProbeConfig::new().with_sites([live, dead]),
        );

        let result = probe.check().await.unwrap();
        assert_eq!(result.status, Status::Danger);
        assert_eq!(result.details["blockedSites"], 1);
        assert_eq!(result.details["results"][0]["accessible"], true);
        assert_eq!(result.details["results"][1]["blocked"], true);
    }

    #[tokio::test]
    async fn test_echo_returns_headers() {
        let client = HttpClient::with_defaults().unwrap();
        let url = serve_once("200 OK", r#"{"headers":{"Via":"1.1 squid","Accept":"*/*"}}"#).await;

        let headers = client.echo_headers(&url).await.unwrap();
        assert_eq!(headers["Via"], "1.1 squid");
        assert_eq!(headers.len(), 2);
    }

    #[tokio::test]
    async fn test_echo_server_error_is_error() {
        let client = HttpClient::with_defaults().unwrap();
        let url = serve_once("500 Internal Server Error", r#"{"headers":{}}"#).await;

        let err = client.echo_headers(&url).await.unwrap_err();
        assert!(matches!(err, ProbeError::Request { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_echo_without_headers_object_is_malformed() {
        let client = HttpClient::with_defaults().unwrap();
        let url = serve_once("200 OK", r#"{"origin":"203.0.113.7"}"#).await;

        let err = client.echo_headers(&url).await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { .. }));
    }
}
