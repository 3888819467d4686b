//! Core handle state types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a registered handle. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Temporal state of a tracked handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalState {
    /// Handle has no known metadata.
    Unknown,
    /// Handle is currently live.
    Live,
    /// Handle has been released.
    Released,
}

/// Kind of library object a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    /// Protocol-version method descriptor.
    Method,
    /// Configuration object.
    Context,
    /// Per-connection session object.
    Session,
    /// One successful trust-store load.
    TrustBlock,
}

impl HandleKind {
    /// Every kind, in census order.
    pub const ALL: [Self; 4] = [Self::Method, Self::Context, Self::Session, Self::TrustBlock];

    /// Stable label used in census descriptions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Method => "methods",
            Self::Context => "contexts",
            Self::Session => "sessions",
            Self::TrustBlock => "trust_blocks",
        }
    }
}

/// Entity that currently owns a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Owned by whoever called the allocating function.
    Caller,
    /// Owned by another registered handle (a method or trust block owned by a context).
    Handle(HandleId),
}

/// Outcome of a release request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseOutcome {
    /// Handle was live and is now released.
    Released,
    /// Handle was already released; nothing changed except the double-release counter.
    AlreadyReleased,
    /// Handle was never issued by this registry.
    Unknown,
}
