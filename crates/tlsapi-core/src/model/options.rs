//! Reference library options.
//!
//! Options can be read from the environment:
//! - `TLSAPI_CLIENT_TRUST`: `enforce` (default) requires trust material before
//!   a client session can be created; `permissive` allows client sessions on
//!   a context without any trust store, reproducing the historical behaviour.
//! - `TLSAPI_MAX_CONTEXTS`: optional cap on live contexts. Creation beyond the
//!   cap fails with an allocation failure and hands the method back.

/// Environment variable selecting the client trust policy.
pub const CLIENT_TRUST_ENV: &str = "TLSAPI_CLIENT_TRUST";
/// Environment variable capping live contexts.
pub const MAX_CONTEXTS_ENV: &str = "TLSAPI_MAX_CONTEXTS";

/// Whether a client session needs trust material.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientTrustPolicy {
    #[default]
    Enforce,
    Permissive,
}

impl ClientTrustPolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to `Enforce`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" | "lenient" | "legacy" | "off" => Self::Permissive,
            _ => Self::Enforce,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enforce => "enforce",
            Self::Permissive => "permissive",
        }
    }
}

/// Behaviour switches of the reference library.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
    pub client_trust: ClientTrustPolicy,
    pub max_contexts: Option<usize>,
}

impl ModelOptions {
    /// Read options from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let client_trust = lookup(CLIENT_TRUST_ENV)
            .map(|raw| ClientTrustPolicy::from_str_loose(&raw))
            .unwrap_or_default();
        let max_contexts = lookup(MAX_CONTEXTS_ENV).and_then(|raw| raw.trim().parse().ok());
        Self {
            client_trust,
            max_contexts,
        }
    }

    #[must_use]
    pub const fn with_client_trust(mut self, policy: ClientTrustPolicy) -> Self {
        self.client_trust = policy;
        self
    }

    #[must_use]
    pub const fn with_max_contexts(mut self, max: Option<usize>) -> Self {
        self.max_contexts = max;
        self
    }
}
