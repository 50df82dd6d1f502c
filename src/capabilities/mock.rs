//! Deterministic capability fakes for testing.
//!
//! Every outbound dependency of the probes has a fake here, each able to
//! simulate the failure modes the probes have to survive: blocked hosts,
//! missing capabilities, stalled handshakes.

use crate::capabilities::{CandidateHandler, HeaderEcho, PeerConnector, PeerSession, Reachability};
use crate::core::ProbeError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockResponse {
    Reachable(Duration),
    Blocked(String),
}

/// A fake reachability capability.
///
/// Unknown URLs are reachable with the default latency.
///
/// # Examples
///
/// ```rust
/// use privacyscan::capabilities::mock::MockReachability;
/// use std::time::Duration;
///
/// let net = MockReachability::new()
///     .with_latency("https://www.google.com", Duration::from_millis(120))
///     .with_blocked("https://www.youtube.com");
/// ```
#[derive(Debug)]
pub struct MockReachability {
    responses: RwLock<HashMap<String, MockResponse>>,
    default_latency: Duration,
    unavailable: bool,
    calls: RwLock<Vec<String>>,
}

impl MockReachability {
    /// Creates a fake where every URL is reachable in 20ms.
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            default_latency: Duration::from_millis(20),
            unavailable: false,
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Creates a fake whose fetch primitive does not exist at all.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    /// Sets the latency for unknown URLs.
    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Makes `url` reachable with the given latency.
    pub fn with_latency(self, url: impl Into<String>, latency: Duration) -> Self {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.into(), MockResponse::Reachable(latency));
        self
    }

    /// Makes `url` unreachable.
    pub fn with_blocked(self, url: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                url.into(),
                MockResponse::Blocked("connection reset".to_string()),
            );
        self
    }

    /// Returns the URLs contacted so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the number of requests made.
    pub fn call_count(&self) -> usize {
        self.calls
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for MockReachability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reachability for MockReachability {
    async fn reach(&self, url: &str) -> Result<Duration, ProbeError> {
        if self.unavailable {
            return Err(ProbeError::unavailable("fetch", "fetch is not defined"));
        }

        self.calls
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(url.to_string());

        let response = self
            .responses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
            .cloned();

        match response {
            Some(MockResponse::Reachable(latency)) => Ok(latency),
            Some(MockResponse::Blocked(reason)) => Err(ProbeError::request(url, reason)),
            None => Ok(self.default_latency),
        }
    }
}

/// A fake header-echo endpoint.
#[derive(Debug, Default)]
pub struct MockHeaderEcho {
    headers: HashMap<String, String>,
    failure: Option<String>,
}

impl MockHeaderEcho {
    /// Creates an endpoint echoing a plain, proxy-free header set.
    pub fn new() -> Self {
        Self::default()
            .with_header("Accept", "*/*")
            .with_header("Host", "httpbin.org")
    }

    /// Adds an echoed header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Makes every request fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

#[async_trait]
impl HeaderEcho for MockHeaderEcho {
    async fn echo_headers(&self, url: &str) -> Result<HashMap<String, String>, ProbeError> {
        match &self.failure {
            Some(message) => Err(ProbeError::request(url, message.clone())),
            None => Ok(self.headers.clone()),
        }
    }
}

/// A fake peer connector that replays fixed candidate lines.
#[derive(Debug)]
pub struct MockPeerConnector {
    candidates: Vec<String>,
    supported: bool,
    completes: bool,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl MockPeerConnector {
    /// Creates a connector that gathers nothing and completes immediately.
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            supported: true,
            completes: true,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a connector that yields a typical host and reflexive candidate.
    pub fn with_local_addresses() -> Self {
        Self::new()
            .with_candidate("candidate:1 1 udp 2122260223 192.168.1.23 54321 typ host")
            .with_candidate(
                "candidate:2 1 udp 1686052607 203.0.113.7 54321 typ srflx raddr 192.168.1.23 rport 54321",
            )
    }

    /// Creates a connector for a host without peer-connection support.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Adds a candidate line to replay.
    pub fn with_candidate(mut self, candidate: impl Into<String>) -> Self {
        self.candidates.push(candidate.into());
        self
    }

    /// Never signals gathering completion, so the caller's window elapses.
    pub fn stalled(mut self) -> Self {
        self.completes = false;
        self
    }

    /// Returns how many sessions were opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Returns how many sessions were closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockPeerConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerConnector for MockPeerConnector {
    fn open(&self) -> Result<Box<dyn PeerSession>, ProbeError> {
        if !self.supported {
            return Err(ProbeError::unavailable(
                "peer-connection",
                "RTCPeerConnection is not supported",
            ));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPeerSession {
            candidates: self.candidates.clone(),
            completes: self.completes,
            handler: None,
            channels: 0,
            is_closed: false,
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct MockPeerSession {
    candidates: Vec<String>,
    completes: bool,
    handler: Option<CandidateHandler>,
    channels: usize,
    is_closed: bool,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PeerSession for MockPeerSession {
    fn on_candidate(&mut self, handler: CandidateHandler) {
        self.handler = Some(handler);
    }

    fn create_data_channel(&mut self, _label: &str) -> Result<(), ProbeError> {
        self.channels += 1;
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<String, ProbeError> {
        Ok("v=0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n".to_string())
    }

    async fn set_local_description(&mut self, _offer: String) -> Result<(), ProbeError> {
        if self.channels == 0 {
            return Ok(());
        }
        if let Some(handler) = &self.handler {
            for candidate in &self.candidates {
                handler(Some(candidate));
            }
            if self.completes {
                handler(None);
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.is_closed {
            self.is_closed = true;
            self.handler = None;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reachability() {
        let net = MockReachability::new()
            .with_latency("https://a.example", Duration::from_millis(5))
            .with_blocked("https://b.example");

        assert_eq!(
            net.reach("https://a.example").await.unwrap(),
            Duration::from_millis(5)
        );
        assert!(net.reach("https://b.example").await.is_err());
        assert_eq!(
            net.reach("https://c.example").await.unwrap(),
            Duration::from_millis(20)
        );
        assert_eq!(net.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_reachability_unavailable() {
        let net = MockReachability::unavailable();
        let err = net.reach("https://a.example").await.unwrap_err();
        assert!(err.is_capability_failure());
        assert_eq!(net.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_header_echo() {
        let echo = MockHeaderEcho::new().with_header("Via", "1.1 squid");
        let headers = echo.echo_headers("https://httpbin.org/headers").await.unwrap();
        assert_eq!(headers.get("Via").map(String::as_str), Some("1.1 squid"));

        let failing = MockHeaderEcho::new().failing("dns failure");
        assert!(failing.echo_headers("https://httpbin.org/headers").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_peer_session_replays_candidates() {
        let connector = MockPeerConnector::with_local_addresses();
        let mut session = connector.open().unwrap();

        let seen = Arc::new(RwLock::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.on_candidate(Arc::new(move |c: Option<&str>| {
            sink.write()
                .unwrap()
                .push(c.map(str::to_string));
        }));
        session.create_data_channel("").unwrap();
        let offer = session.create_offer().await.unwrap();
        session.set_local_description(offer).await.unwrap();
        session.close();
        session.close();

        let seen = seen.read().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[2].is_none());
        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.closed(), 1);
    }

    #[test]
    fn test_mock_peer_unsupported() {
        let connector = MockPeerConnector::unsupported();
        assert!(connector.open().is_err());
        assert_eq!(connector.opened(), 0);
    }
}
