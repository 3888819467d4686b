//! Resource census snapshots and their differences.

use serde::{Deserialize, Serialize};

use crate::state::HandleKind;

/// Point-in-time count of live handles plus release anomalies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCensus {
    /// Live method descriptors (caller- or context-owned).
    pub methods: u64,
    /// Live contexts.
    pub contexts: u64,
    /// Live sessions.
    pub sessions: u64,
    /// Live trust blocks, including superseded ones never released.
    pub trust_blocks: u64,
    /// Releases of handles that were already released.
    pub double_releases: u64,
    /// Releases of handles the registry never issued.
    pub unknown_releases: u64,
}

impl ResourceCensus {
    pub(crate) fn bump(&mut self, kind: HandleKind) {
        match kind {
            HandleKind::Method => self.methods += 1,
            HandleKind::Context => self.contexts += 1,
            HandleKind::Session => self.sessions += 1,
            HandleKind::TrustBlock => self.trust_blocks += 1,
        }
    }

    /// Total live handles across all kinds.
    #[must_use]
    pub const fn live_total(&self) -> u64 {
        self.methods + self.contexts + self.sessions + self.trust_blocks
    }

    /// Signed change from `baseline` to `self`.
    #[must_use]
    pub fn delta_since(&self, baseline: &Self) -> CensusDelta {
        let diff = |now: u64, then: u64| now as i64 - then as i64;
        CensusDelta {
            methods: diff(self.methods, baseline.methods),
            contexts: diff(self.contexts, baseline.contexts),
            sessions: diff(self.sessions, baseline.sessions),
            trust_blocks: diff(self.trust_blocks, baseline.trust_blocks),
            double_releases: diff(self.double_releases, baseline.double_releases),
            unknown_releases: diff(self.unknown_releases, baseline.unknown_releases),
        }
    }
}

/// Signed difference between two censuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusDelta {
    pub methods: i64,
    pub contexts: i64,
    pub sessions: i64,
    pub trust_blocks: i64,
    pub double_releases: i64,
    pub unknown_releases: i64,
}

impl CensusDelta {
    /// Change in live handles of one kind.
    #[must_use]
    pub const fn live(&self, kind: HandleKind) -> i64 {
        match kind {
            HandleKind::Method => self.methods,
            HandleKind::Context => self.contexts,
            HandleKind::Session => self.sessions,
            HandleKind::TrustBlock => self.trust_blocks,
        }
    }

    /// True when nothing leaked and no release anomaly happened.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    /// Compact `kind=+n` rendering of the non-zero fields, or `clean`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for kind in HandleKind::ALL {
            let n = self.live(kind);
            if n != 0 {
                parts.push(format!("{}={n:+}", kind.as_str()));
            }
        }
        if self.double_releases != 0 {
            parts.push(format!("double_releases={:+}", self.double_releases));
        }
        if self.unknown_releases != 0 {
            parts.push(format!("unknown_releases={:+}", self.unknown_releases));
        }
        if parts.is_empty() {
            String::from("clean")
        } else {
            parts.join(" ")
        }
    }
}
