//! Fault injection around a library under test.

use std::path::Path;

use tlsapi_core::{
    ApiError, ApiResult, ContextCreation, ContextHandle, ContextSnapshot, EncodingTag,
    MethodHandle, Protocol, Release, ResourceCensus, Role, SessionHandle, TlsApi,
};

/// Delegates every call except `context_new`, which always fails and hands
/// the method back. Drives the path where a caller must release a method
/// that a context refused to take.
pub struct RejectingContexts<'a> {
    inner: &'a dyn TlsApi,
}

impl<'a> RejectingContexts<'a> {
    #[must_use]
    pub fn new(inner: &'a dyn TlsApi) -> Self {
        Self { inner }
    }
}

impl TlsApi for RejectingContexts<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn library_init(&self) -> ApiResult<()> {
        self.inner.library_init()
    }

    fn library_cleanup(&self) -> ApiResult<()> {
        self.inner.library_cleanup()
    }

    fn compiled_protocols(&self) -> Vec<Protocol> {
        self.inner.compiled_protocols()
    }

    fn method(&self, protocol: Protocol, role: Role) -> ApiResult<MethodHandle> {
        self.inner.method(protocol, role)
    }

    fn free_method(&self, method: MethodHandle) {
        self.inner.free_method(method);
    }

    fn context_new(&self, method: Option<MethodHandle>) -> ContextCreation {
        ContextCreation::Failed {
            method,
            error: ApiError::AllocationFailure(String::from("context allocation refused")),
        }
    }

    fn context_free(&self, ctx: &ContextHandle) -> Release {
        self.inner.context_free(ctx)
    }

    fn use_certificate_file(
        &self,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()> {
        self.inner.use_certificate_file(ctx, path, encoding)
    }

    fn use_private_key_file(
        &self,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()> {
        self.inner.use_private_key_file(ctx, path, encoding)
    }

    fn load_verify_locations(
        &self,
        ctx: Option<&ContextHandle>,
        file: Option<&Path>,
        dir: Option<&Path>,
    ) -> ApiResult<()> {
        self.inner.load_verify_locations(ctx, file, dir)
    }

    fn session_new(&self, ctx: Option<&ContextHandle>) -> ApiResult<SessionHandle> {
        self.inner.session_new(ctx)
    }

    fn session_free(&self, session: SessionHandle) {
        self.inner.session_free(session);
    }

    fn context_snapshot(&self, ctx: &ContextHandle) -> Option<ContextSnapshot> {
        self.inner.context_snapshot(ctx)
    }

    fn census(&self) -> ResourceCensus {
        self.inner.census()
    }
}
