//! Transport and storage security probe.

use crate::capabilities::{ArcHost, SecurityContext};
use crate::core::{Probe, ProbeError, ProbeKind, ProbeResult, Status};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

/// The checklist scored by [`SecurityProbe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityChecklist {
    /// Origin is served over TLS.
    pub https: bool,
    /// Host considers the context secure.
    pub secure_context: bool,
    /// Basic crypto primitives available.
    pub crypto: bool,
    /// Subtle crypto available.
    pub web_crypto: bool,
    /// Local key-value storage available.
    pub local_storage: bool,
    /// Session key-value storage available.
    pub session_storage: bool,
    /// Indexed store available.
    #[serde(rename = "indexedDB")]
    pub indexed_db: bool,
    /// Content-security-policy declared.
    pub csp: bool,
    /// Qualifies for strict-transport-security.
    pub hsts: bool,
}

impl SecurityChecklist {
    /// Builds the checklist from a security context.
    pub fn from_context(ctx: &SecurityContext) -> Self {
        Self {
            https: ctx.is_https(),
            secure_context: ctx.secure_context,
            crypto: ctx.crypto,
            web_crypto: ctx.crypto && ctx.subtle_crypto,
            local_storage: ctx.local_storage,
            session_storage: ctx.session_storage,
            indexed_db: ctx.indexed_db,
            csp: ctx.content_security_policy,
            hsts: ctx.qualifies_for_hsts(),
        }
    }

    fn items(&self) -> [bool; 9] {
        [
            self.https,
            self.secure_context,
            self.crypto,
            self.web_crypto,
            self.local_storage,
            self.session_storage,
            self.indexed_db,
            self.csp,
            self.hsts,
        ]
    }

    /// Number of checks that passed.
    pub fn score(&self) -> usize {
        self.items().iter().filter(|passed| **passed).count()
    }

    /// Number of checks.
    pub fn total(&self) -> usize {
        self.items().len()
    }
}

/// Maps a checklist score to a verdict.
///
/// At least 80% passing is safe, at least 60% a warning, anything less
/// danger. Compared in integers so the boundaries are exact.
pub fn classify(score: usize, total: usize) -> Status {
    if score * 10 >= total * 8 {
        Status::Safe
    } else if score * 10 >= total * 6 {
        Status::Warning
    } else {
        Status::Danger
    }
}

/// Security checklist probe.
#[derive(Debug)]
pub struct SecurityProbe {
    host: ArcHost,
}

impl SecurityProbe {
    /// Creates the probe.
    pub fn new(host: ArcHost) -> Self {
        Self { host }
    }

    fn run(&self) -> Result<ProbeResult, ProbeError> {
        let ctx = self.host.security_context()?;
        let checklist = SecurityChecklist::from_context(&ctx);
        let (score, total) = (checklist.score(), checklist.total());
        let status = classify(score, total);

        tracing::info!(
            probe = "security",
            status = %status,
            score,
            total,
            "Security probe finished"
        );

        Ok(ProbeResult::verdict(
            ProbeKind::Security,
            status,
            json!({ "score": score, "total": total, "securityInfo": checklist }),
        ))
    }
}

#[async_trait]
impl Probe for SecurityProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Security
    }

    async fn check(&self) -> Result<ProbeResult, ProbeError> {
        Ok(self.run().unwrap_or_else(|e| {
            tracing::warn!(probe = "security", error = %e, "Security probe failed");
            ProbeResult::failed(ProbeKind::Security.failure_message(), &e)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::HostSnapshot;
    use std::sync::Arc;

    async fn check(ctx: SecurityContext) -> ProbeResult {
        let host = HostSnapshot::new().with_security_context(ctx);
        SecurityProbe::new(Arc::new(host)).check().await.unwrap()
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(8, 10), Status::Safe);
        assert_eq!(classify(7, 10), Status::Warning);
        assert_eq!(classify(6, 10), Status::Warning);
        assert_eq!(classify(5, 10), Status::Danger);
        assert_eq!(classify(0, 9), Status::Danger);
    }

    #[test]
    fn test_webcrypto_needs_crypto() {
        let mut ctx = SecurityContext::new("https:", "example.com");
        ctx.subtle_crypto = true;
        assert!(!SecurityChecklist::from_context(&ctx).web_crypto);
    }

    #[tokio::test]
    async fn test_hardened_context_is_safe() {
        let result = check(SecurityContext::new("https:", "example.com").fully_capable()).await;

        assert_eq!(result.status, Status::Safe);
        assert_eq!(result.details["score"], 9);
        assert_eq!(result.details["total"], 9);
        assert_eq!(result.details["securityInfo"]["indexedDB"], true);
        assert_eq!(result.details["securityInfo"]["webCrypto"], true);
    }

    #[tokio::test]
    async fn test_localhost_loses_hsts_only() {
        let result = check(SecurityContext::new("https:", "localhost").fully_capable()).await;

        // 8/9 still clears the safe threshold
        assert_eq!(result.status, Status::Safe);
        assert_eq!(result.details["securityInfo"]["hsts"], false);
    }

    #[tokio::test]
    async fn test_plain_http_is_warning() {
        let mut ctx = SecurityContext::new("http:", "example.com").fully_capable();
        ctx.secure_context = false;
        let result = check(ctx).await;

        // https, secureContext and hsts fail: 6/9
        assert_eq!(result.details["score"], 6);
        assert_eq!(result.status, Status::Warning);
    }

    #[tokio::test]
    async fn test_bare_context_is_danger() {
        let result = check(SecurityContext::new("http:", "10.0.0.5")).await;

        assert_eq!(result.status, Status::Danger);
        assert_eq!(result.details["score"], 0);
    }

    #[tokio::test]
    async fn test_missing_context_is_warning() {
        let probe = SecurityProbe::new(Arc::new(HostSnapshot::new()));
        let result = probe.check().await.unwrap();

        assert_eq!(result.status, Status::Warning);
        assert!(!result.error().unwrap().is_empty());
    }
}
