use tlsapi_core::{
    ContextCreation, EncodingTag, LifecycleState, Release, ResourceCensus, Role, TlsApi,
};

use super::{Checker, snapshot, working_protocol};
use crate::audit::take_census;
use crate::config::FixturePaths;
use crate::fault::RejectingContexts;
use crate::guard::{ContextAttempt, OwnedContext, OwnedMethod};
use crate::recorder::{Expect, Observation, Observed, Recorder, trap};

const TRANSFER: &str = "ctx_new(method) transfers method ownership";
const FREE: &str = "ctx_free(ctx) releases owned method";
const FREE_TWICE: &str = "ctx_free(ctx) twice is idempotent";
const DESTROYED: &str = "operations on destroyed ctx fail";
const REJECTED: &str = "ctx_new(method) rejected hands method back";
const RETURNED: &str = "returned method releases cleanly";

/// Context creation, destruction and method ownership.
#[derive(Debug)]
pub struct ContextLifecycleChecker {
    fixtures: FixturePaths,
}

impl ContextLifecycleChecker {
    pub const NAME: &'static str = "context lifecycle";

    #[must_use]
    pub fn new(fixtures: FixturePaths) -> Self {
        Self { fixtures }
    }

    fn null_method(api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        let before = take_census(api);
        let (observed, mut condition) = match trap(|| api.context_new(None)) {
            Ok(ContextCreation::Failed {
                method: None,
                error,
            }) => (Observed::Failure(error.kind()), Ok(())),
            Ok(ContextCreation::Failed {
                method: Some(method),
                error,
            }) => {
                drop(OwnedMethod::new(api, method));
                (
                    Observed::Failure(error.kind()),
                    Err(String::from("a method was handed back for a null argument")),
                )
            }
            Ok(ContextCreation::Owning(ctx)) => {
                drop(OwnedContext::new(api, ctx));
                (Observed::Success, Ok(()))
            }
            Err(message) => (Observed::Crash(message), Ok(())),
        };
        if condition.is_ok() {
            condition = census_restored(api, &before);
        }
        rec.expect_with("ctx_new(NULL)", Expect::Failure, &observed, condition);
    }

    fn create<'a>(
        api: &'a dyn TlsApi,
        rec: &mut Recorder<'_>,
    ) -> Option<OwnedContext<'a>> {
        let protocol = working_protocol(api);
        let Some(method) = Observation::of(|| api.method(protocol, Role::Server)).success() else {
            rec.blocked("ctx_new(method)", "success", "method allocation");
            return None;
        };
        match OwnedMethod::new(api, method).into_context() {
            ContextAttempt::Created(ctx) => {
                rec.expect("ctx_new(method)", Expect::Success, &Observed::Success);
                Some(ctx)
            }
            ContextAttempt::Rejected { method, error } => {
                let condition = match method {
                    Some(_) => Ok(()),
                    None => Err(String::from("method was swallowed by a failed ctx_new")),
                };
                rec.expect_with(
                    "ctx_new(method)",
                    Expect::Success,
                    &Observed::Failure(error.kind()),
                    condition,
                );
                None
            }
            ContextAttempt::Crashed(message) => {
                rec.expect("ctx_new(method)", Expect::Success, &Observed::Crash(message));
                None
            }
        }
    }

    fn ownership_transferred(
        api: &dyn TlsApi,
        ctx: &OwnedContext<'_>,
        baseline: &ResourceCensus,
    ) -> Result<String, String> {
        let snapshot = snapshot(api, ctx).ok_or("context has no snapshot")?;
        if !snapshot.method_live {
            return Err(String::from("context does not hold a live method"));
        }
        let delta = take_census(api)?.delta_since(baseline);
        if delta.methods == 1 && delta.contexts == 1 {
            Ok(String::from("one method, owned by one context"))
        } else {
            Err(format!("unexpected census change {}", delta.describe()))
        }
    }

    fn free_releases_method(
        api: &dyn TlsApi,
        ctx: &mut OwnedContext<'_>,
        baseline: &ResourceCensus,
    ) -> Result<String, String> {
        match ctx.destroy() {
            Ok(Release::Released) => {}
            Ok(Release::AlreadyReleased) => {
                return Err(String::from("first ctx_free reported AlreadyReleased"));
            }
            Err(message) => return Err(format!("ctx_free crashed: {message}")),
        }
        let delta = take_census(api)?.delta_since(baseline);
        if delta.is_clean() {
            Ok(String::from("context and method released"))
        } else {
            Err(format!("objects survived ctx_free: {}", delta.describe()))
        }
    }

    fn free_twice(
        api: &dyn TlsApi,
        ctx: &mut OwnedContext<'_>,
        baseline: &ResourceCensus,
    ) -> Result<String, String> {
        match ctx.destroy() {
            Ok(Release::AlreadyReleased) => {}
            Ok(Release::Released) => {
                return Err(String::from("second ctx_free released something"));
            }
            Err(message) => return Err(format!("second ctx_free crashed: {message}")),
        }
        let delta = take_census(api)?.delta_since(baseline);
        if delta.is_clean() {
            Ok(String::from("AlreadyReleased, nothing freed twice"))
        } else {
            Err(format!("second ctx_free changed the census: {}", delta.describe()))
        }
    }

    fn destroyed_rejects(&self, api: &dyn TlsApi, ctx: &OwnedContext<'_>) -> Result<String, String> {
        let handle = ctx.handle();
        let calls = [
            (
                "use_certificate_file",
                Observation::of(|| {
                    api.use_certificate_file(
                        Some(handle),
                        Some(self.fixtures.cert_path.as_path()),
                        EncodingTag::PEM,
                    )
                })
                .summary(),
            ),
            (
                "use_private_key_file",
                Observation::of(|| {
                    api.use_private_key_file(
                        Some(handle),
                        Some(self.fixtures.key_path.as_path()),
                        EncodingTag::PEM,
                    )
                })
                .summary(),
            ),
            (
                "load_verify_locations",
                Observation::of(|| {
                    api.load_verify_locations(Some(handle), Some(self.fixtures.ca_path.as_path()), None)
                })
                .summary(),
            ),
            (
                "session_new",
                match Observation::of(|| api.session_new(Some(handle))) {
                    Observation::Success(session) => {
                        drop(crate::guard::OwnedSession::new(api, session));
                        Observed::Success
                    }
                    other => other.summary(),
                },
            ),
        ];
        let accepted: Vec<String> = calls
            .iter()
            .filter(|(_, observed)| !Expect::Failure.is_met_by(observed))
            .map(|(call, observed)| format!("{call}: {}", observed.describe()))
            .collect();
        if !accepted.is_empty() {
            return Err(format!("destroyed context accepted {}", accepted.join(", ")));
        }
        match snapshot(api, ctx) {
            Some(snapshot) if snapshot.state != LifecycleState::Destroyed => Err(format!(
                "destroyed context reports state {:?}",
                snapshot.state
            )),
            _ => Ok(String::from("every call failed")),
        }
    }

    /// Hand a method to `ctx_new` and require it back on refusal.
    ///
    /// The library's own refusal is used when it gives one. A library that
    /// accepts gets its context freed and the refusal injected on a second
    /// method through [`RejectingContexts`].
    fn rejected_creation(api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        let rejecting = RejectingContexts::new(api);
        let protocol = working_protocol(api);
        let allocate = || Observation::of(|| api.method(protocol, Role::Client)).success();
        let Some(method) = allocate() else {
            rec.blocked(REJECTED, "failure with method returned", "method allocation");
            rec.blocked(RETURNED, "clean release", "method allocation");
            return;
        };

        let mut sent = method.id();
        let mut before = take_census(api);
        let mut source = "library refusal";
        let attempt = match OwnedMethod::new(api, method).into_context() {
            ContextAttempt::Created(mut ctx) => {
                if let Err(message) = ctx.destroy() {
                    rec.check(
                        REJECTED,
                        "failure with method returned",
                        Err(format!("ctx_free crashed: {message}")),
                    );
                    rec.blocked(RETURNED, "clean release", "ctx_free");
                    return;
                }
                let Some(method) = allocate() else {
                    rec.blocked(REJECTED, "failure with method returned", "method allocation");
                    rec.blocked(RETURNED, "clean release", "method allocation");
                    return;
                };
                sent = method.id();
                before = take_census(api);
                source = "injected refusal";
                OwnedMethod::new(&rejecting, method).into_context()
            }
            other => other,
        };

        let returned = match attempt {
            ContextAttempt::Rejected {
                method: Some(returned),
                ..
            } => {
                let same = returned.handle().map(|m| m.id()) == Some(sent);
                rec.check(
                    REJECTED,
                    "failure with method returned",
                    if same {
                        Ok(format!("{source}, same method returned"))
                    } else {
                        Err(format!("{source} returned a different method"))
                    },
                );
                returned
            }
            ContextAttempt::Rejected { method: None, .. } => {
                rec.check(
                    REJECTED,
                    "failure with method returned",
                    Err(format!("method was swallowed by a failed ctx_new ({source})")),
                );
                rec.blocked(RETURNED, "clean release", "returned method");
                return;
            }
            ContextAttempt::Created(_ctx) => {
                rec.check(
                    REJECTED,
                    "failure with method returned",
                    Err(String::from("fault injection did not reject creation")),
                );
                rec.blocked(RETURNED, "clean release", "returned method");
                return;
            }
            ContextAttempt::Crashed(message) => {
                rec.check(
                    REJECTED,
                    "failure with method returned",
                    Err(format!("ctx_new crashed: {message}")),
                );
                rec.blocked(RETURNED, "clean release", "returned method");
                return;
            }
        };

        let outcome = returned
            .release()
            .map_err(|message| format!("free_method crashed: {message}"))
            .and_then(|()| {
                let before = before?;
                let delta = take_census(api)?.delta_since(&before);
                if delta.methods == -1
                    && delta.contexts == 0
                    && delta.double_releases == 0
                    && delta.unknown_releases == 0
                {
                    Ok(String::from("released once, nothing else touched"))
                } else {
                    Err(format!("release changed the census by {}", delta.describe()))
                }
            });
        rec.check(RETURNED, "clean release", outcome);
    }
}

fn census_restored(api: &dyn TlsApi, before: &Result<ResourceCensus, String>) -> Result<(), String> {
    let before = before.clone()?;
    let delta = take_census(api)?.delta_since(&before);
    if delta.is_clean() {
        Ok(())
    } else {
        Err(format!("census changed: {}", delta.describe()))
    }
}

impl Checker for ContextLifecycleChecker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        Self::null_method(api, rec);

        let baseline = take_census(api);
        let created = Self::create(api, rec);
        match (created, baseline) {
            (Some(mut ctx), Ok(baseline)) => {
                rec.check(
                    TRANSFER,
                    "context owns the method",
                    Self::ownership_transferred(api, &ctx, &baseline),
                );
                rec.check(
                    FREE,
                    "context and method released",
                    Self::free_releases_method(api, &mut ctx, &baseline),
                );
                rec.check(
                    FREE_TWICE,
                    "AlreadyReleased",
                    Self::free_twice(api, &mut ctx, &baseline),
                );
                rec.check(
                    DESTROYED,
                    "every call fails",
                    self.destroyed_rejects(api, &ctx),
                );
            }
            (created, baseline) => {
                drop(created);
                let reason = match baseline {
                    Err(problem) => problem,
                    Ok(_) => String::from("ctx_new(method)"),
                };
                for name in [TRANSFER, FREE, FREE_TWICE, DESTROYED] {
                    rec.blocked(name, "prerequisite context", &reason);
                }
            }
        }

        Self::rejected_creation(api, rec);
    }
}
