//! Checkers. Each one drives a slice of the API and records named sub-tests.

mod context;
mod credentials;
mod methods;
mod session;
mod trust_store;

pub use context::ContextLifecycleChecker;
pub use credentials::CredentialLoaderChecker;
pub use methods::MethodAllocationChecker;
pub use session::SessionInstantiationChecker;
pub use trust_store::TrustStoreLoaderChecker;

use tlsapi_core::{ContextSnapshot, Protocol, Role, TlsApi};

use crate::guard::{ContextAttempt, OwnedContext, OwnedMethod};
use crate::recorder::{Observation, Recorder, trap};

/// One group of sub-tests.
pub trait Checker {
    /// Checker name, used as the `checker` field of its results.
    fn name(&self) -> &'static str;

    /// Record every sub-test. Must not panic on library misbehaviour.
    fn run(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>);
}

/// Protocol used for checkers that only need some working method.
pub(crate) fn working_protocol(api: &dyn TlsApi) -> Protocol {
    let compiled = trap(|| api.compiled_protocols()).unwrap_or_default();
    if compiled.contains(&Protocol::Tls12) {
        Protocol::Tls12
    } else {
        compiled.first().copied().unwrap_or(Protocol::Negotiate)
    }
}

/// Allocate a method and wrap it in a context.
pub(crate) fn fresh_context<'a>(api: &'a dyn TlsApi, role: Role) -> Result<OwnedContext<'a>, String> {
    let protocol = working_protocol(api);
    let method = match Observation::of(|| api.method(protocol, role)) {
        Observation::Success(method) => OwnedMethod::new(api, method),
        other => {
            return Err(format!(
                "method({protocol}, {role}) gave {}",
                other.summary().describe()
            ));
        }
    };
    match method.into_context() {
        ContextAttempt::Created(ctx) => Ok(ctx),
        ContextAttempt::Rejected { error, .. } => Err(format!("ctx_new(method) failed: {error}")),
        ContextAttempt::Crashed(message) => Err(format!("ctx_new(method) crashed: {message}")),
    }
}

/// Trapped snapshot query.
pub(crate) fn snapshot(api: &dyn TlsApi, ctx: &OwnedContext<'_>) -> Option<ContextSnapshot> {
    trap(|| api.context_snapshot(ctx.handle())).ok().flatten()
}

/// `Ok` if the context looks exactly as it did before a failed call.
pub(crate) fn unchanged(
    before: Option<&ContextSnapshot>,
    after: Option<&ContextSnapshot>,
) -> Result<(), String> {
    if before == after {
        Ok(())
    } else {
        Err(format!(
            "failed call changed the context: before={before:?} after={after:?}"
        ))
    }
}
