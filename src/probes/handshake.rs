//! Bounded-wait address discovery over a peer connection.
//!
//! Opens a peer connection, gathers candidates for at most a fixed window,
//! and reports the IPv4 addresses they reveal. A host that reveals no
//! address at all is most likely behind a proxy that blocks UDP.
//!
//! The discovery always resolves. The session is closed on every path:
//! window elapsed, gathering completed early, or setup failed midway.

use crate::capabilities::{PeerConnector, PeerSession};

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Outcome of the address discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResult {
    /// `true` when no address was discovered.
    pub has_proxy: bool,
    /// Distinct IPv4 addresses, in discovery order.
    pub ips: Vec<String>,
    /// What was attempted.
    pub details: String,
}

impl HandshakeResult {
    fn unsupported() -> Self {
        Self {
            has_proxy: false,
            ips: Vec::new(),
            details: "WebRTC not supported".to_string(),
        }
    }

    fn gathered(ips: Vec<String>) -> Self {
        Self {
            has_proxy: ips.is_empty(),
            ips,
            details: "WebRTC IP detection".to_string(),
        }
    }
}

/// Closes the wrapped session when dropped.
struct SessionGuard(Box<dyn PeerSession>);

impl Deref for SessionGuard {
    type Target = dyn PeerSession;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Gathers candidates through `connector` for at most `window`.
pub async fn discover_addresses(connector: &dyn PeerConnector, window: Duration) -> HandshakeResult {
    let session = match connector.open() {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(error = %e, "Peer connection unavailable");
            return HandshakeResult::unsupported();
        }
    };
    let mut session = SessionGuard(session);

    let ips = Arc::new(Mutex::new(Vec::<String>::new()));
    let gathered = Arc::new(Notify::new());

    let sink = Arc::clone(&ips);
    let done = Arc::clone(&gathered);
    session.on_candidate(Arc::new(move |candidate: Option<&str>| match candidate {
        Some(line) => {
            if let Some(ip) = extract_ipv4(line) {
                let mut ips = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let ip = ip.to_string();
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }
        }
        None => done.notify_one(),
    }));

    if let Err(e) = session.create_data_channel("") {
        tracing::debug!(error = %e, "Data channel could not be created");
        return HandshakeResult::unsupported();
    }

    // Negotiation errors only mean fewer candidates; the window still runs.
    match session.create_offer().await {
        Ok(offer) => {
            if let Err(e) = session.set_local_description(offer).await {
                tracing::debug!(error = %e, "Local description rejected");
            }
        }
        Err(e) => tracing::debug!(error = %e, "Offer creation failed"),
    }

    let completed = tokio::time::timeout(window, gathered.notified())
        .await
        .is_ok();
    drop(session);

    let ips = ips
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    tracing::debug!(
        completed_early = completed,
        address_count = ips.len(),
        "Candidate gathering finished"
    );

    HandshakeResult::gathered(ips)
}

/// Returns the first IPv4-looking token of a candidate line.
pub fn extract_ipv4(candidate: &str) -> Option<Ipv4Addr> {
    candidate
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| token.contains('.'))
        .find_map(|token| {
            if let Ok(ip) = token.parse() {
                return Some(ip);
            }
            let parts: Vec<&str> = token.split('.').collect();
            parts
                .windows(4)
                .find_map(|w| w.join(".").parse::<Ipv4Addr>().ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::mock::MockPeerConnector;

    #[test]
    fn test_extract_ipv4() {
        assert_eq!(
            extract_ipv4("candidate:1 1 udp 2122260223 192.168.1.23 54321 typ host"),
            Some(Ipv4Addr::new(192, 168, 1, 23))
        );
        assert_eq!(
            extract_ipv4("candidate:1 1 udp 2122260223 4b1e.local 54321 typ host"),
            None
        );
        assert_eq!(
            extract_ipv4("candidate:3 1 udp 2122 fe80::1 5000 typ host"),
            None
        );
        assert_eq!(
            extract_ipv4("ip=10.0.0.1.5"),
            Some(Ipv4Addr::new(10, 0, 0, 1))
        );
    }

    #[test]
    fn test_extract_ipv4_skips_invalid_octets() {
        assert_eq!(
            extract_ipv4("candidate:2 1 udp 1686 999.1.2.3 6000 typ srflx raddr 10.0.0.7"),
            Some(Ipv4Addr::new(10, 0, 0, 7))
        );
        assert_eq!(extract_ipv4("candidate:9 1 udp 1 256.256.256.256 9 typ host"), None);
    }

    #[tokio::test]
    async fn test_discovery_collects_distinct_addresses() {
        let connector = MockPeerConnector::with_local_addresses()
            .with_candidate("candidate:3 1 tcp 1518280447 192.168.1.23 9 typ host tcptype active");

        let result = discover_addresses(&connector, Duration::from_secs(3)).await;

        assert!(!result.has_proxy);
        assert_eq!(result.ips, vec!["192.168.1.23", "203.0.113.7"]);
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn test_no_candidates_flags_proxy() {
        let connector = MockPeerConnector::new();
        let result = discover_addresses(&connector, Duration::from_secs(3)).await;

        assert!(result.has_proxy);
        assert!(result.ips.is_empty());
        assert_eq!(result.details, "WebRTC IP detection");
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_resolves_benign() {
        let connector = MockPeerConnector::unsupported();
        let result = discover_addresses(&connector, Duration::from_secs(3)).await;

        assert!(!result.has_proxy);
        assert!(result.ips.is_empty());
        assert_eq!(result.details, "WebRTC not supported");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_gathering_waits_for_window() {
        let connector = MockPeerConnector::with_local_addresses().stalled();
        let start = tokio::time::Instant::now();

        let result = discover_addresses(&connector, Duration::from_secs(3)).await;

        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(result.ips.len(), 2);
        assert_eq!(connector.closed(), 1);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let value = serde_json::to_value(HandshakeResult::gathered(vec![])).unwrap();
        assert_eq!(value["hasProxy"], true);
    }
}
