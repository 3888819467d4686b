//! Reference implementation of the lifecycle API.
//!
//! `ModelLibrary` is the in-tree library under test. It keeps every object in
//! a [`HandleRegistry`] so misuse is observable instead of undefined, and it
//! deliberately keeps two historical behaviours the harness documents:
//! a second trust-store load supersedes the first without releasing it, and
//! (under [`ClientTrustPolicy::Permissive`]) client sessions do not require
//! trust material.

mod options;
mod record;

pub use options::{CLIENT_TRUST_ENV, ClientTrustPolicy, MAX_CONTEXTS_ENV, ModelOptions};

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tlsapi_registry::{HandleId, HandleKind, HandleRegistry, Owner, ResourceCensus};

use crate::api::{ContextCreation, ContextSnapshot, Release, TlsApi};
use crate::error::{ApiError, ApiResult};
use crate::handle::{ContextHandle, MethodHandle, SessionHandle};
use crate::material::{Material, load_certificates, load_private_key, load_trust_sources};
use crate::types::{Encoding, EncodingTag, Protocol, Role};
use record::{ContextRecord, TrustSlot};

/// Whether this build of the reference library includes `protocol`.
#[must_use]
pub const fn compiled_in(protocol: Protocol) -> bool {
    match protocol {
        Protocol::Sslv2 => false,
        Protocol::Sslv3 => cfg!(feature = "sslv3"),
        Protocol::Dtls10 => cfg!(feature = "dtls"),
        Protocol::Tls10 | Protocol::Tls11 | Protocol::Tls12 | Protocol::Negotiate => true,
    }
}

#[derive(Debug, Clone, Copy)]
enum CredentialSlot {
    Certificate,
    PrivateKey,
}

/// In-tree library under test.
#[derive(Debug, Default)]
pub struct ModelLibrary {
    options: ModelOptions,
    registry: HandleRegistry,
    contexts: RwLock<HashMap<HandleId, ContextRecord>>,
    initialized: AtomicBool,
}

impl ModelLibrary {
    /// Create a library with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library with explicit options.
    #[must_use]
    pub fn with_options(options: ModelOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn options(&self) -> ModelOptions {
        self.options
    }

    /// Registry backing this library, for white-box inspection.
    #[must_use]
    pub const fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    fn live_context(&self, ctx: Option<&ContextHandle>) -> ApiResult<HandleId> {
        let ctx = ctx.ok_or(ApiError::InvalidArgument("null context"))?;
        if self.registry.classify(ctx.id()).is_live(HandleKind::Context) {
            Ok(ctx.id())
        } else {
            Err(ApiError::InvalidArgument("context is destroyed or unknown"))
        }
    }

    fn use_credential_file(
        &self,
        slot: CredentialSlot,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()> {
        let id = self.live_context(ctx)?;
        let path = path.ok_or(ApiError::InvalidArgument("null path"))?;
        let encoding: Encoding = encoding
            .recognize()
            .ok_or(ApiError::UnsupportedEncoding(encoding.0))?;
        let material: Material = match slot {
            CredentialSlot::Certificate => load_certificates(path, encoding)?,
            CredentialSlot::PrivateKey => load_private_key(path, encoding)?,
        };

        let mut contexts = self.contexts.write();
        let record = contexts
            .get_mut(&id)
            .filter(|record| !record.destroyed)
            .ok_or(ApiError::InvalidArgument("context is destroyed or unknown"))?;
        match slot {
            CredentialSlot::Certificate => record.certificate = Some(material),
            CredentialSlot::PrivateKey => record.private_key = Some(material),
        }
        Ok(())
    }
}

impl TlsApi for ModelLibrary {
    fn name(&self) -> &str {
        "tlsapi reference model"
    }

    fn library_init(&self) -> ApiResult<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn library_cleanup(&self) -> ApiResult<()> {
        if self.initialized.swap(false, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ApiError::PreconditionUnmet("library was not initialized"))
        }
    }

    fn compiled_protocols(&self) -> Vec<Protocol> {
        Protocol::ALL
            .into_iter()
            .filter(|protocol| compiled_in(*protocol))
            .collect()
    }

    fn method(&self, protocol: Protocol, role: Role) -> ApiResult<MethodHandle> {
        if !compiled_in(protocol) {
            return Err(ApiError::AllocationFailure(format!(
                "{protocol} {role} method is not compiled in"
            )));
        }
        let id = self.registry.register(HandleKind::Method, Owner::Caller);
        Ok(MethodHandle::new(id, protocol, role))
    }

    fn free_method(&self, method: MethodHandle) {
        self.registry.release(method.id());
    }

    fn context_new(&self, method: Option<MethodHandle>) -> ContextCreation {
        let Some(method) = method else {
            return ContextCreation::Failed {
                method: None,
                error: ApiError::InvalidArgument("null method"),
            };
        };

        let facts = self.registry.classify(method.id());
        if !facts.is_live(HandleKind::Method) || facts.owner != Some(Owner::Caller) {
            return ContextCreation::Failed {
                method: Some(method),
                error: ApiError::InvalidArgument("method is not a live caller-owned handle"),
            };
        }

        if let Some(max) = self.options.max_contexts {
            let live = self.registry.census().contexts;
            if live >= max as u64 {
                return ContextCreation::Failed {
                    method: Some(method),
                    error: ApiError::AllocationFailure(format!("context limit {max} reached")),
                };
            }
        }

        let ctx = self.registry.register(HandleKind::Context, Owner::Caller);
        self.registry.transfer(method.id(), Owner::Handle(ctx));
        self.contexts.write().insert(
            ctx,
            ContextRecord::new(method.id(), method.protocol(), method.role()),
        );
        ContextCreation::Owning(ContextHandle::new(ctx))
    }

    fn context_free(&self, ctx: &ContextHandle) -> Release {
        let facts = self.registry.classify(ctx.id());
        match facts.kind {
            None => {
                // Counted as an unknown release.
                self.registry.release(ctx.id());
                return Release::AlreadyReleased;
            }
            Some(HandleKind::Context) if facts.is_live(HandleKind::Context) => {}
            Some(_) => return Release::AlreadyReleased,
        }

        let mut contexts = self.contexts.write();
        if let Some(record) = contexts.get_mut(&ctx.id()) {
            self.registry.release(record.method);
            if let Some(trust) = record.trust.take() {
                self.registry.release(trust.block);
            }
            record.certificate = None;
            record.private_key = None;
            record.destroyed = true;
        }
        self.registry.release(ctx.id());
        Release::Released
    }

    fn use_certificate_file(
        &self,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()> {
        self.use_credential_file(CredentialSlot::Certificate, ctx, path, encoding)
    }

    fn use_private_key_file(
        &self,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()> {
        self.use_credential_file(CredentialSlot::PrivateKey, ctx, path, encoding)
    }

    fn load_verify_locations(
        &self,
        ctx: Option<&ContextHandle>,
        file: Option<&Path>,
        dir: Option<&Path>,
    ) -> ApiResult<()> {
        let id = self.live_context(ctx)?;
        if file.is_none() && dir.is_none() {
            return Err(ApiError::InvalidArgument("no trust source given"));
        }
        let material = load_trust_sources(file, dir)?;

        let mut contexts = self.contexts.write();
        let Some(record) = contexts.get_mut(&id).filter(|record| !record.destroyed) else {
            return Err(ApiError::InvalidArgument("context is destroyed or unknown"));
        };
        let block = self
            .registry
            .register(HandleKind::TrustBlock, Owner::Handle(id));
        // The superseded block is dropped from the slot but never released.
        record.trust = Some(TrustSlot { block, material });
        record.trust_loads += 1;
        Ok(())
    }

    fn session_new(&self, ctx: Option<&ContextHandle>) -> ApiResult<SessionHandle> {
        let id = self.live_context(ctx)?;
        let contexts = self.contexts.read();
        let record = contexts
            .get(&id)
            .filter(|record| !record.destroyed)
            .ok_or(ApiError::InvalidArgument("context is destroyed or unknown"))?;

        if !self
            .registry
            .classify(record.method)
            .is_live(HandleKind::Method)
        {
            return Err(ApiError::PreconditionUnmet("context holds no live method"));
        }
        match record.role {
            Role::Server if !record.has_credentials() => {
                return Err(ApiError::PreconditionUnmet(
                    "server context lacks certificate and private key",
                ));
            }
            Role::Client
                if record.trust.is_none()
                    && self.options.client_trust == ClientTrustPolicy::Enforce =>
            {
                return Err(ApiError::PreconditionUnmet(
                    "client context lacks trust material",
                ));
            }
            Role::Server | Role::Client => {}
        }

        let session = self.registry.register(HandleKind::Session, Owner::Caller);
        Ok(SessionHandle::new(session, id))
    }

    fn session_free(&self, session: SessionHandle) {
        self.registry.release(session.id());
    }

    fn context_snapshot(&self, ctx: &ContextHandle) -> Option<ContextSnapshot> {
        let contexts = self.contexts.read();
        let record = contexts.get(&ctx.id())?;
        let method_live = self
            .registry
            .classify(record.method)
            .is_live(HandleKind::Method);
        Some(record.snapshot(method_live))
    }

    fn census(&self) -> ResourceCensus {
        self.registry.census()
    }
}
