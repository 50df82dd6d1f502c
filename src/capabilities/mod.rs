//! Injectable capabilities the probes depend on.
//!
//! Probes never touch the network or the host directly. Each outbound
//! dependency is a trait so it can be swapped for a fake in tests:
//!
//! - [`Reachability`] - best-effort "can I reach this URL" with latency
//! - [`HeaderEcho`] - a JSON endpoint that echoes request headers back
//! - [`PeerConnector`] / [`PeerSession`] - ICE-style candidate gathering
//! - [`HostEnvironment`] - navigator, global registry, security context
//!
//! ## Available Implementations
//!
//! - [`http`] - reqwest-backed `Reachability` + `HeaderEcho` (requires `http` feature)
//! - [`stun`] - UDP STUN-backed `PeerConnector` (requires `stun` feature)
//! - [`host`] - `HostSnapshot`, plain data gathered by the embedding layer
//! - [`mock`] - deterministic fakes for tests

use crate::core::ProbeError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

pub mod host;
pub mod mock;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stun")]
pub mod stun;

pub use host::{Builtin, BuiltinBinding, HostSnapshot, NavigatorInfo, SecurityContext};

#[cfg(feature = "http")]
pub use http::{HttpClient, HttpClientConfig};

#[cfg(feature = "stun")]
pub use stun::{StunConfig, StunConnector};

/// Best-effort cross-origin reachability.
///
/// Any answer from the remote side counts as reachable, whatever its
/// status code. Only transport-level failures are errors.
#[async_trait]
pub trait Reachability: Send + Sync + Debug {
    /// Contacts `url` once and returns the wall-clock latency.
    async fn reach(&self, url: &str) -> Result<Duration, ProbeError>;
}

/// A JSON endpoint that reports the request headers it received.
#[async_trait]
pub trait HeaderEcho: Send + Sync + Debug {
    /// Fetches `url` and returns the echoed header map.
    async fn echo_headers(&self, url: &str) -> Result<HashMap<String, String>, ProbeError>;
}

/// Callback invoked for every discovered candidate line.
///
/// `None` signals that gathering is complete.
pub type CandidateHandler = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// Factory for peer connections.
pub trait PeerConnector: Send + Sync + Debug {
    /// Opens a new peer connection.
    ///
    /// Fails with `CapabilityUnavailable` when peer connections are not
    /// supported by the host.
    fn open(&self) -> Result<Box<dyn PeerSession>, ProbeError>;
}

/// One open peer connection.
///
/// Candidate gathering starts once a local description is set and a data
/// channel exists. `close` must be idempotent.
#[async_trait]
pub trait PeerSession: Send {
    /// Registers the candidate callback. Replaces any previous one.
    fn on_candidate(&mut self, handler: CandidateHandler);

    /// Creates a data channel so the connection has something to negotiate.
    fn create_data_channel(&mut self, label: &str) -> Result<(), ProbeError>;

    /// Creates an SDP offer.
    async fn create_offer(&mut self) -> Result<String, ProbeError>;

    /// Applies `offer` as the local description, which starts gathering.
    async fn set_local_description(&mut self, offer: String) -> Result<(), ProbeError>;

    /// Closes the connection and stops gathering.
    fn close(&mut self);
}

/// Introspection of the hosting environment.
///
/// Every accessor is fallible: a surface the host does not expose is an
/// error, which probes report as a `warning`.
pub trait HostEnvironment: Send + Sync + Debug {
    /// Returns the navigator-like attributes.
    fn navigator(&self) -> Result<NavigatorInfo, ProbeError>;

    /// Returns `true` if `name` is defined in the host's global registry.
    fn is_global_defined(&self, name: &str) -> Result<bool, ProbeError>;

    /// Returns the transport and storage facts of the current context.
    fn security_context(&self) -> Result<SecurityContext, ProbeError>;

    /// Returns the recorded and current identity of a built-in binding.
    fn builtin_binding(&self, builtin: Builtin) -> Result<BuiltinBinding, ProbeError>;
}

/// Shared handle to a reachability capability.
pub type ArcReachability = Arc<dyn Reachability>;

/// Shared handle to a header-echo capability.
pub type ArcHeaderEcho = Arc<dyn HeaderEcho>;

/// Shared handle to a peer connector.
pub type ArcPeerConnector = Arc<dyn PeerConnector>;

/// Shared handle to the host environment.
pub type ArcHost = Arc<dyn HostEnvironment>;

/// The full set of capabilities the standard probes need.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Reachability primitive shared by the DNS and network probes.
    pub reachability: ArcReachability,
    /// Header echo endpoint client.
    pub header_echo: ArcHeaderEcho,
    /// Peer connection factory.
    pub peer_connector: ArcPeerConnector,
    /// Host environment.
    pub host: ArcHost,
}

impl Capabilities {
    /// Bundles the given capabilities.
    pub fn new(
        reachability: ArcReachability,
        header_echo: ArcHeaderEcho,
        peer_connector: ArcPeerConnector,
        host: ArcHost,
    ) -> Self {
        Self {
            reachability,
            header_echo,
            peer_connector,
            host,
        }
    }
}
