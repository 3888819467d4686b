//! The library boundary consumed by the conformance harness.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tlsapi_registry::ResourceCensus;

use crate::error::{ApiError, ApiResult};
use crate::handle::{ContextHandle, MethodHandle, SessionHandle};
use crate::types::{EncodingTag, LifecycleState, Protocol, Role};

/// Result of `context_new`.
///
/// The method is consumed only on success. On failure it travels back to the
/// caller inside `Failed`, who must release it.
#[must_use]
#[derive(Debug)]
pub enum ContextCreation {
    /// Context created; it now owns the method.
    Owning(ContextHandle),
    /// Creation failed; `method` is whatever the caller passed in.
    Failed {
        method: Option<MethodHandle>,
        error: ApiError,
    },
}

impl ContextCreation {
    /// Split into the created context or the returned method plus error.
    pub fn into_result(self) -> Result<ContextHandle, (Option<MethodHandle>, ApiError)> {
        match self {
            Self::Owning(ctx) => Ok(ctx),
            Self::Failed { method, error } => Err((method, error)),
        }
    }
}

/// Outcome of `context_free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Release {
    /// The context and everything it owned were released.
    Released,
    /// The context was already destroyed; nothing happened.
    AlreadyReleased,
}

/// Read-only view of a context, used to prove a failed call changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub protocol: Protocol,
    pub role: Role,
    pub state: LifecycleState,
    /// SHA-256 fingerprint of the loaded certificate chain.
    pub certificate: Option<String>,
    /// SHA-256 fingerprint of the loaded private key.
    pub private_key: Option<String>,
    /// SHA-256 fingerprint of the current trust material.
    pub trust: Option<String>,
    /// Number of successful trust-store loads.
    pub trust_loads: u32,
    /// Whether the owned method is still live.
    pub method_live: bool,
}

/// Lifecycle API of a TLS library's configuration and session objects.
///
/// `None` arguments model null pointers. Implementations must report invalid
/// input as an error and never panic on it.
pub trait TlsApi {
    /// Human-readable library name for reports.
    fn name(&self) -> &str;

    fn library_init(&self) -> ApiResult<()>;

    fn library_cleanup(&self) -> ApiResult<()>;

    /// Protocols compiled into this build; everything else must fail to allocate.
    fn compiled_protocols(&self) -> Vec<Protocol>;

    fn method(&self, protocol: Protocol, role: Role) -> ApiResult<MethodHandle>;

    /// Release a caller-owned method.
    fn free_method(&self, method: MethodHandle);

    fn context_new(&self, method: Option<MethodHandle>) -> ContextCreation;

    /// Destroy a context. Idempotent.
    fn context_free(&self, ctx: &ContextHandle) -> Release;

    fn use_certificate_file(
        &self,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()>;

    fn use_private_key_file(
        &self,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()>;

    /// Load trust material from a CA file, a CA directory, or both.
    fn load_verify_locations(
        &self,
        ctx: Option<&ContextHandle>,
        file: Option<&Path>,
        dir: Option<&Path>,
    ) -> ApiResult<()>;

    fn session_new(&self, ctx: Option<&ContextHandle>) -> ApiResult<SessionHandle>;

    fn session_free(&self, session: SessionHandle);

    fn context_snapshot(&self, ctx: &ContextHandle) -> Option<ContextSnapshot>;

    /// Live object counts and release anomalies.
    fn census(&self) -> ResourceCensus;
}
