//! Opaque object handles crossing the library boundary.
//!
//! Handles are deliberately neither `Clone` nor `Copy`: a [`MethodHandle`]
//! moved into `context_new` cannot be used again unless the library hands it
//! back, and `free_method`/`session_free` consume theirs.

use tlsapi_registry::HandleId;

use crate::types::{Protocol, Role};

/// Protocol-version method descriptor.
#[derive(Debug, PartialEq, Eq)]
pub struct MethodHandle {
    id: HandleId,
    protocol: Protocol,
    role: Role,
}

impl MethodHandle {
    /// Wrap an id issued by a library implementation.
    #[must_use]
    pub const fn new(id: HandleId, protocol: Protocol, role: Role) -> Self {
        Self { id, protocol, role }
    }

    #[must_use]
    pub const fn id(&self) -> HandleId {
        self.id
    }

    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }
}

/// Configuration object handle.
///
/// Destruction goes through `context_free(&ContextHandle)` so the handle can
/// outlive it; operations on a destroyed context must fail, not misbehave.
#[derive(Debug, PartialEq, Eq)]
pub struct ContextHandle {
    id: HandleId,
}

impl ContextHandle {
    #[must_use]
    pub const fn new(id: HandleId) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(&self) -> HandleId {
        self.id
    }
}

/// Session handle bound to exactly one context.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionHandle {
    id: HandleId,
    context: HandleId,
}

impl SessionHandle {
    #[must_use]
    pub const fn new(id: HandleId, context: HandleId) -> Self {
        Self { id, context }
    }

    #[must_use]
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Context the session was created from.
    #[must_use]
    pub const fn context(&self) -> HandleId {
        self.context
    }
}
