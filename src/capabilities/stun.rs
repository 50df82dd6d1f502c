//! STUN-backed peer connector.
//!
//! Native hosts have no browser peer-connection stack, so this connector
//! performs the part of ICE gathering the probes care about:
//!
//! 1. a **host** candidate from the interface the OS picks for the STUN server
//! 2. a **server-reflexive** candidate from a STUN Binding request
//!    (RFC 5389, `XOR-MAPPED-ADDRESS`, falling back to `MAPPED-ADDRESS`)
//!
//! Candidates are reported through the session's callback as standard
//! `candidate:` lines, followed by `None` once gathering is over.

use crate::capabilities::{CandidateHandler, PeerConnector, PeerSession};
use crate::core::ProbeError;

use async_trait::async_trait;
use rand::RngCore;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

const MAGIC_COOKIE: u32 = 0x2112_A442;
const BINDING_REQUEST: u16 = 0x0001;
const BINDING_SUCCESS: u16 = 0x0101;
const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;
const HEADER_LEN: usize = 20;

/// STUN connector configuration.
#[derive(Debug, Clone)]
pub struct StunConfig {
    /// STUN server as `host:port`.
    pub server: String,

    /// How long to wait for the Binding response.
    pub response_timeout: Duration,
}

impl Default for StunConfig {
    fn default() -> Self {
        Self {
            server: "stun.l.google.com:19302".to_string(),
            response_timeout: Duration::from_secs(2),
        }
    }
}

impl StunConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the STUN server.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Sets the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

/// Peer connector that gathers candidates with a single STUN exchange.
#[derive(Debug, Clone, Default)]
pub struct StunConnector {
    config: StunConfig,
}

impl StunConnector {
    /// Creates a connector with the given configuration.
    pub fn new(config: StunConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StunConfig {
        &self.config
    }
}

impl PeerConnector for StunConnector {
    fn open(&self) -> Result<Box<dyn PeerSession>, ProbeError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ProbeError::unavailable(
                "peer-connection",
                "STUN gathering requires a tokio runtime",
            ));
        }
        Ok(Box::new(StunSession {
            config: self.config.clone(),
            handler: None,
            channels: Vec::new(),
            gathering: None,
        }))
    }
}

struct StunSession {
    config: StunConfig,
    handler: Option<CandidateHandler>,
    channels: Vec<String>,
    gathering: Option<JoinHandle<()>>,
}

#[async_trait]
impl PeerSession for StunSession {
    fn on_candidate(&mut self, handler: CandidateHandler) {
        self.handler = Some(handler);
    }

    fn create_data_channel(&mut self, label: &str) -> Result<(), ProbeError> {
        self.channels.push(label.to_string());
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<String, ProbeError> {
        let session_id = rand::thread_rng().next_u32();
        Ok(format!(
            "v=0\r\no=- {session_id} 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
             m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n"
        ))
    }

    async fn set_local_description(&mut self, offer: String) -> Result<(), ProbeError> {
        if !offer.starts_with("v=0") {
            return Err(ProbeError::configuration("offer is not an SDP description"));
        }
        let Some(handler) = self.handler.clone() else {
            return Ok(());
        };
        if self.channels.is_empty() {
            // Nothing to negotiate, nothing to gather.
            handler(None);
            return Ok(());
        }

        let config = self.config.clone();
        self.gathering = Some(tokio::spawn(async move {
            gather(&config, &handler).await;
            handler(None);
        }));
        Ok(())
    }

    fn close(&mut self) {
        if let Some(task) = self.gathering.take() {
            task.abort();
        }
        self.handler = None;
    }
}

impl Drop for StunSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn gather(config: &StunConfig, handler: &CandidateHandler) {
    let server = match resolve_ipv4(&config.server).await {
        Ok(addr) => addr,
        Err(e) => {
            tracing::debug!(server = %config.server, error = %e, "STUN server did not resolve");
            return;
        }
    };

    let socket = match bind_towards(server).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::debug!(server = %server, error = %e, "Could not open UDP socket");
            return;
        }
    };

    let local = socket.local_addr().ok();
    if let Some(local) = local.filter(|a| !a.ip().is_unspecified()) {
        handler(Some(&host_candidate(local)));
    }

    match binding_exchange(&socket, config.response_timeout).await {
        Ok(mapped) => {
            if let Some(local) = local {
                handler(Some(&reflexive_candidate(mapped, local)));
            }
        }
        Err(e) => {
            tracing::debug!(server = %server, error = %e, "STUN binding failed");
        }
    }
}

async fn resolve_ipv4(server: &str) -> Result<SocketAddr, ProbeError> {
    tokio::net::lookup_host(server)
        .await?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ProbeError::request(server, "no IPv4 address"))
}

async fn bind_towards(server: SocketAddr) -> Result<UdpSocket, ProbeError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(server).await?;
    Ok(socket)
}

async fn binding_exchange(socket: &UdpSocket, wait: Duration) -> Result<SocketAddr, ProbeError> {
    let mut transaction_id = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut transaction_id);

    socket.send(&binding_request(&transaction_id)).await?;

    let mut buf = [0u8; 512];
    let target = socket
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    let len = tokio::time::timeout(wait, socket.recv(&mut buf))
        .await
        .map_err(|_| ProbeError::timeout(target.clone(), wait))??;

    parse_binding_response(&buf[..len], &transaction_id)
        .ok_or_else(|| ProbeError::malformed(target, "no mapped address in response"))
}

/// Encodes a Binding request with no attributes.
fn binding_request(transaction_id: &[u8; 12]) -> [u8; HEADER_LEN] {
    let mut msg = [0u8; HEADER_LEN];
    msg[0..2].copy_from_slice(&BINDING_REQUEST.to_be_bytes());
    // length 0
    msg[4..8].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    msg[8..20].copy_from_slice(transaction_id);
    msg
}

/// Decodes the mapped IPv4 address of a Binding success response.
fn parse_binding_response(msg: &[u8], transaction_id: &[u8; 12]) -> Option<SocketAddr> {
    if msg.len() < HEADER_LEN {
        return None;
    }
    let msg_type = u16::from_be_bytes([msg[0], msg[1]]);
    let body_len = u16::from_be_bytes([msg[2], msg[3]]) as usize;
    let cookie = u32::from_be_bytes([msg[4], msg[5], msg[6], msg[7]]);
    if msg_type != BINDING_SUCCESS || cookie != MAGIC_COOKIE || &msg[8..20] != transaction_id {
        return None;
    }

    let body = msg.get(HEADER_LEN..HEADER_LEN + body_len)?;
    let mut fallback = None;
    let mut offset = 0;
    while offset + 4 <= body.len() {
        let attr_type = u16::from_be_bytes([body[offset], body[offset + 1]]);
        let attr_len = u16::from_be_bytes([body[offset + 2], body[offset + 3]]) as usize;
        let value = body.get(offset + 4..offset + 4 + attr_len)?;

        match attr_type {
            ATTR_XOR_MAPPED_ADDRESS => {
                if let Some(addr) = decode_ipv4_address(value, true) {
                    return Some(addr);
                }
            }
            ATTR_MAPPED_ADDRESS => fallback = decode_ipv4_address(value, false),
            _ => {}
        }

        // attributes are padded to 4 bytes
        offset += 4 + attr_len.div_ceil(4) * 4;
    }
    fallback
}

fn decode_ipv4_address(value: &[u8], xored: bool) -> Option<SocketAddr> {
    // reserved, family, port(2), address(4)
    if value.len() < 8 || value[1] != 0x01 {
        return None;
    }
    let mut port = u16::from_be_bytes([value[2], value[3]]);
    let mut addr = u32::from_be_bytes([value[4], value[5], value[6], value[7]]);
    if xored {
        port ^= (MAGIC_COOKIE >> 16) as u16;
        addr ^= MAGIC_COOKIE;
    }
    Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(addr)), port))
}

fn host_candidate(local: SocketAddr) -> String {
    format!(
        "candidate:1 1 udp 2122260223 {} {} typ host",
        local.ip(),
        local.port()
    )
}

fn reflexive_candidate(mapped: SocketAddr, local: SocketAddr) -> String {
    format!(
        "candidate:2 1 udp 1686052607 {} {} typ srflx raddr {} rport {}",
        mapped.ip(),
        mapped.port(),
        local.ip(),
        local.port()
    )
}
