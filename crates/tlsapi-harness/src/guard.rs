//! RAII guards that release library objects on every exit path.
//!
//! Release calls made from `Drop` are trapped, so a crashing library cannot
//! turn an early return into an abort.

use tlsapi_core::{
    ApiError, ContextCreation, ContextHandle, MethodHandle, Release, SessionHandle, TlsApi,
};

use crate::recorder::trap;

/// Caller-owned method.
pub struct OwnedMethod<'a> {
    api: &'a dyn TlsApi,
    method: Option<MethodHandle>,
}

/// Result of handing an [`OwnedMethod`] to `context_new`.
pub enum ContextAttempt<'a> {
    /// The context now owns the method.
    Created(OwnedContext<'a>),
    /// Creation failed; any method the library handed back is guarded again.
    Rejected {
        method: Option<OwnedMethod<'a>>,
        error: ApiError,
    },
    /// The library panicked. The method is unaccounted for.
    Crashed(String),
}

impl<'a> OwnedMethod<'a> {
    #[must_use]
    pub fn new(api: &'a dyn TlsApi, method: MethodHandle) -> Self {
        Self {
            api,
            method: Some(method),
        }
    }

    /// Borrow the guarded handle.
    #[must_use]
    pub fn handle(&self) -> Option<&MethodHandle> {
        self.method.as_ref()
    }

    /// Move the method into `context_new`.
    pub fn into_context(mut self) -> ContextAttempt<'a> {
        let api = self.api;
        let method = self.method.take();
        match trap(|| api.context_new(method)) {
            Ok(ContextCreation::Owning(ctx)) => ContextAttempt::Created(OwnedContext::new(api, ctx)),
            Ok(ContextCreation::Failed { method, error }) => ContextAttempt::Rejected {
                method: method.map(|m| Self::new(api, m)),
                error,
            },
            Err(message) => ContextAttempt::Crashed(message),
        }
    }

    /// Release now. Returns the panic message if the library crashed.
    pub fn release(mut self) -> Result<(), String> {
        match self.method.take() {
            Some(method) => trap(|| self.api.free_method(method)),
            None => Ok(()),
        }
    }
}

impl Drop for OwnedMethod<'_> {
    fn drop(&mut self) {
        if let Some(method) = self.method.take() {
            let api = self.api;
            let _ = trap(|| api.free_method(method));
        }
    }
}

/// Caller-owned context.
pub struct OwnedContext<'a> {
    api: &'a dyn TlsApi,
    ctx: ContextHandle,
    destroyed: bool,
}

impl<'a> OwnedContext<'a> {
    #[must_use]
    pub fn new(api: &'a dyn TlsApi, ctx: ContextHandle) -> Self {
        Self {
            api,
            ctx,
            destroyed: false,
        }
    }

    #[must_use]
    pub const fn handle(&self) -> &ContextHandle {
        &self.ctx
    }

    /// Call `context_free` while keeping the handle for post-destroy probes.
    pub fn destroy(&mut self) -> Result<Release, String> {
        self.destroyed = true;
        let (api, ctx) = (self.api, &self.ctx);
        trap(|| api.context_free(ctx))
    }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for OwnedContext<'_> {
    fn drop(&mut self) {
        if !self.destroyed {
            let _ = self.destroy();
        }
    }
}

/// Caller-owned session.
pub struct OwnedSession<'a> {
    api: &'a dyn TlsApi,
    session: Option<SessionHandle>,
}

impl<'a> OwnedSession<'a> {
    #[must_use]
    pub fn new(api: &'a dyn TlsApi, session: SessionHandle) -> Self {
        Self {
            api,
            session: Some(session),
        }
    }

    #[must_use]
    pub fn handle(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Release now. Returns the panic message if the library crashed.
    pub fn release(mut self) -> Result<(), String> {
        match self.session.take() {
            Some(session) => trap(|| self.api.session_free(session)),
            None => Ok(()),
        }
    }
}

impl Drop for OwnedSession<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let api = self.api;
            let _ = trap(|| api.session_free(session));
        }
    }
}
