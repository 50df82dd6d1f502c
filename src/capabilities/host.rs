//! Host environment snapshot.
//!
//! `HostSnapshot` is plain data: the embedding layer (a webview shell, a
//! wasm bridge, a test) collects the navigator attributes, the names
//! defined in its global registry, the security context, and the identity
//! of a few built-in bindings, then hands the snapshot to the probes.
//!
//! A surface that was not collected is reported as unavailable, which the
//! probes turn into a `warning` verdict.

use crate::capabilities::HostEnvironment;
use crate::core::ProbeError;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Navigator-like attributes of the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorInfo {
    /// Agent string.
    pub user_agent: String,
    /// Primary locale.
    pub language: String,
    /// All preferred locales.
    pub languages: Vec<String>,
    /// Whether cookies can be stored.
    pub cookie_enabled: bool,
    /// Do-not-track flag as reported by the host (`"1"`, `"0"`, unset).
    pub do_not_track: Option<String>,
    /// Names of installed plugins.
    pub plugins: Vec<String>,
    /// Automation flag.
    pub webdriver: bool,
}

impl NavigatorInfo {
    /// Creates navigator info with the given agent string.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            cookie_enabled: true,
            ..Self::default()
        }
    }

    /// Sets the primary locale and adds it to the preferred list.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !self.languages.contains(&language) {
            self.languages.push(language.clone());
        }
        self.language = language;
        self
    }

    /// Adds an installed plugin.
    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.push(name.into());
        self
    }

    /// Sets the automation flag.
    pub fn with_webdriver(mut self, webdriver: bool) -> Self {
        self.webdriver = webdriver;
        self
    }

    /// Sets the do-not-track flag.
    pub fn with_do_not_track(mut self, value: impl Into<String>) -> Self {
        self.do_not_track = Some(value.into());
        self
    }

    /// Sets cookie capability.
    pub fn with_cookies(mut self, enabled: bool) -> Self {
        self.cookie_enabled = enabled;
        self
    }
}

/// Security-relevant facts about the execution context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    /// Origin scheme including the trailing colon, e.g. `https:`.
    pub protocol: String,
    /// Origin hostname.
    pub hostname: String,
    /// Whether the host considers the context secure.
    pub secure_context: bool,
    /// Basic cryptographic primitives available.
    pub crypto: bool,
    /// Advanced (subtle) cryptographic primitives available.
    pub subtle_crypto: bool,
    /// Simple key-value storage available.
    pub local_storage: bool,
    /// Session-scoped key-value storage available.
    pub session_storage: bool,
    /// Indexed structured store available.
    pub indexed_db: bool,
    /// A content-security-policy is declared.
    pub content_security_policy: bool,
}

impl SecurityContext {
    /// Creates a context for an origin, e.g. `("https:", "example.com")`.
    pub fn new(protocol: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Marks every capability of a modern hardened context as present.
    pub fn fully_capable(mut self) -> Self {
        self.secure_context = true;
        self.crypto = true;
        self.subtle_crypto = true;
        self.local_storage = true;
        self.session_storage = true;
        self.indexed_db = true;
        self.content_security_policy = true;
        self
    }

    /// Returns `true` if the origin is served over TLS.
    pub fn is_https(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("https:")
    }

    /// Returns `true` for loopback and development hostnames.
    pub fn is_loopback_host(&self) -> bool {
        let host = self
            .hostname
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();
        if host == "localhost" || host.ends_with(".localhost") {
            return true;
        }
        host.parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }

    /// Returns `true` if the context qualifies for strict-transport-security.
    pub fn qualifies_for_hsts(&self) -> bool {
        self.is_https() && !self.is_loopback_host()
    }
}

/// Built-in callables that monitoring software likes to wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Builtin {
    /// Console logging.
    Console,
    /// Low-level HTTP request primitive.
    HttpRequest,
    /// High-level fetch primitive.
    Fetch,
}

impl Builtin {
    /// Every tracked built-in.
    pub const ALL: [Builtin; 3] = [Builtin::Console, Builtin::HttpRequest, Builtin::Fetch];

    /// Name as it appears in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::HttpRequest => "XMLHttpRequest",
            Self::Fetch => "fetch",
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a built-in binding at startup and now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinBinding {
    /// Identity recorded before any third-party code ran.
    pub reference: u64,
    /// Identity observed now.
    pub current: u64,
}

impl BuiltinBinding {
    /// A binding that still points at the built-in implementation.
    pub fn pristine(identity: u64) -> Self {
        Self {
            reference: identity,
            current: identity,
        }
    }

    /// Returns `true` if the binding was replaced since it was recorded.
    pub fn is_modified(&self) -> bool {
        self.reference != self.current
    }
}

/// A point-in-time snapshot of the host environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSnapshot {
    #[serde(default)]
    navigator: Option<NavigatorInfo>,
    #[serde(default)]
    globals: BTreeSet<String>,
    #[serde(default)]
    security: Option<SecurityContext>,
    #[serde(default)]
    bindings: HashMap<Builtin, BuiltinBinding>,
    #[serde(default = "registry_available_default")]
    registry_available: bool,
}

fn registry_available_default() -> bool {
    true
}

impl HostSnapshot {
    /// Creates a snapshot with an empty global registry and pristine built-ins.
    ///
    /// Navigator and security context are absent until set.
    pub fn new() -> Self {
        let bindings = Builtin::ALL
            .iter()
            .enumerate()
            .map(|(i, b)| (*b, BuiltinBinding::pristine(i as u64 + 1)))
            .collect();
        Self {
            navigator: None,
            globals: BTreeSet::new(),
            security: None,
            bindings,
            registry_available: true,
        }
    }

    /// Sets the navigator attributes.
    pub fn with_navigator(mut self, navigator: NavigatorInfo) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets the security context.
    pub fn with_security_context(mut self, security: SecurityContext) -> Self {
        self.security = Some(security);
        self
    }

    /// Declares a name as defined in the global registry.
    pub fn with_global(mut self, name: impl Into<String>) -> Self {
        self.globals.insert(name.into());
        self
    }

    /// Records the identities of a built-in binding.
    pub fn with_binding(mut self, builtin: Builtin, binding: BuiltinBinding) -> Self {
        self.bindings.insert(builtin, binding);
        self
    }

    /// Marks a built-in as replaced since startup.
    pub fn with_patched_builtin(mut self, builtin: Builtin) -> Self {
        let entry = self
            .bindings
            .entry(builtin)
            .or_insert_with(|| BuiltinBinding::pristine(0));
        entry.current = entry.reference.wrapping_add(0x5eed);
        self
    }

    /// Removes a built-in entirely, as if the host did not provide it.
    pub fn without_builtin(mut self, builtin: Builtin) -> Self {
        self.bindings.remove(&builtin);
        self
    }

    /// Makes the global registry unreadable.
    pub fn without_global_registry(mut self) -> Self {
        self.registry_available = false;
        self
    }
}

impl Default for HostSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnvironment for HostSnapshot {
    fn navigator(&self) -> Result<NavigatorInfo, ProbeError> {
        self.navigator
            .clone()
            .ok_or_else(|| ProbeError::unavailable("navigator", "navigator is not exposed"))
    }

    fn is_global_defined(&self, name: &str) -> Result<bool, ProbeError> {
        if !self.registry_available {
            return Err(ProbeError::unavailable(
                "global-registry",
                "global registry is not readable",
            ));
        }
        Ok(self.globals.contains(name))
    }

    fn security_context(&self) -> Result<SecurityContext, ProbeError> {
        self.security.clone().ok_or_else(|| {
            ProbeError::unavailable("security-context", "location is not exposed")
        })
    }

    fn builtin_binding(&self, builtin: Builtin) -> Result<BuiltinBinding, ProbeError> {
        self.bindings.get(&builtin).copied().ok_or_else(|| {
            ProbeError::unavailable(builtin.name(), format!("{} is not defined", builtin))
        })
    }
}
