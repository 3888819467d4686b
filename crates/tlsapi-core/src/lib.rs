//! TLS configuration/session lifecycle API.
//!
//! This crate defines the boundary a conformance harness drives ([`TlsApi`]):
//! method allocation, context creation and destruction, certificate, key and
//! trust-store loading, and session creation. It also ships
//! [`ModelLibrary`], the in-tree reference implementation used as the
//! library under test.
//!
//! Handshakes, record protection and transport are outside this boundary.

pub mod api;
pub mod error;
pub mod handle;
pub mod material;
pub mod model;
pub mod types;

pub use api::{ContextCreation, ContextSnapshot, Release, TlsApi};
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use handle::{ContextHandle, MethodHandle, SessionHandle};
pub use model::{ClientTrustPolicy, ModelLibrary, ModelOptions};
pub use tlsapi_registry::{CensusDelta, HandleId, HandleKind, ResourceCensus};
pub use types::{Encoding, EncodingTag, LifecycleState, Protocol, Role};
