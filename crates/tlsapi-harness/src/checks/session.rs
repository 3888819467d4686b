use tlsapi_core::{EncodingTag, Release, Role, TlsApi};

use super::{Checker, fresh_context, snapshot, unchanged};
use crate::config::{Expectations, FixturePaths};
use crate::guard::{OwnedContext, OwnedSession};
use crate::recorder::{Expect, Observation, Observed, Recorder, trap};

const CLIENT_QUIRK: &str = "client session without trust material";

/// Session creation preconditions for one role.
#[derive(Debug)]
pub struct SessionInstantiationChecker {
    fixtures: FixturePaths,
    role: Role,
    client_requires_trust: bool,
}

impl SessionInstantiationChecker {
    pub const SERVER: &'static str = "server sessions";
    pub const CLIENT: &'static str = "client sessions";

    #[must_use]
    pub fn server(fixtures: FixturePaths) -> Self {
        Self {
            fixtures,
            role: Role::Server,
            client_requires_trust: true,
        }
    }

    #[must_use]
    pub fn client(fixtures: FixturePaths, expectations: Expectations) -> Self {
        Self {
            fixtures,
            role: Role::Client,
            client_requires_trust: expectations.client_requires_trust,
        }
    }

    fn label(&self, call: &str) -> String {
        format!("{call} [{}]", self.role)
    }

    /// Create a session, release it at once, and return what happened.
    fn probe(api: &dyn TlsApi, ctx: Option<&OwnedContext<'_>>) -> (Observed, Result<(), String>) {
        let observation = Observation::of(|| api.session_new(ctx.map(OwnedContext::handle)));
        let observed = observation.summary();
        let released = match observation.success() {
            Some(session) => OwnedSession::new(api, session)
                .release()
                .map_err(|message| format!("session_free crashed: {message}")),
            None => Ok(()),
        };
        (observed, released)
    }

    /// Context carrying the material its role needs.
    fn configured<'a>(&self, api: &'a dyn TlsApi) -> Result<OwnedContext<'a>, String> {
        let ctx = fresh_context(api, self.role)?;
        let handle = Some(ctx.handle());
        let loaded = trap(|| match self.role {
            Role::Server => api
                .use_certificate_file(handle, Some(self.fixtures.cert_path.as_path()), EncodingTag::PEM)
                .and_then(|()| {
                    api.use_private_key_file(
                        handle,
                        Some(self.fixtures.key_path.as_path()),
                        EncodingTag::PEM,
                    )
                }),
            Role::Client => {
                api.load_verify_locations(handle, Some(self.fixtures.ca_path.as_path()), None)
            }
        })
        .map_err(|message| format!("configuring {} context crashed: {message}", self.role))?;
        loaded.map_err(|err| format!("configuring {} context failed: {err}", self.role))?;
        Ok(ctx)
    }

    fn unconfigured(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>, ctx: &OwnedContext<'_>) {
        let name = self.label("session_new(ctx_nocert)");
        let (observed, released) = Self::probe(api, Some(ctx));
        match self.role {
            Role::Client if !self.client_requires_trust => {
                rec.expect_with(&name, Expect::Success, &observed, released);
            }
            Role::Client => {
                let passed = rec.expect_with(&name, Expect::Failure, &observed, released);
                if !passed && observed == Observed::Success {
                    rec.quirk(
                        CLIENT_QUIRK,
                        String::from(
                            "suspected defect: session_new succeeded on a client context \
                             with no trust store loaded",
                        ),
                    );
                }
            }
            Role::Server => {
                rec.expect_with(&name, Expect::Failure, &observed, released);
            }
        }
    }

    fn free_keeps_context(api: &dyn TlsApi, ctx: &OwnedContext<'_>) -> Result<String, String> {
        let session = Observation::of(|| api.session_new(Some(ctx.handle())))
            .success()
            .ok_or("session_new(ctx) failed")?;
        let before = snapshot(api, ctx);
        OwnedSession::new(api, session)
            .release()
            .map_err(|message| format!("session_free crashed: {message}"))?;
        let after = snapshot(api, ctx);
        unchanged(before.as_ref(), after.as_ref())?;
        match Self::probe(api, Some(ctx)) {
            (Observed::Success, Ok(())) => Ok(String::from("context unchanged and reusable")),
            (Observed::Success, Err(problem)) => Err(problem),
            (observed, _) => Err(format!(
                "context unusable after session_free: {}",
                observed.describe()
            )),
        }
    }
}

impl Checker for SessionInstantiationChecker {
    fn name(&self) -> &'static str {
        match self.role {
            Role::Server => Self::SERVER,
            Role::Client => Self::CLIENT,
        }
    }

    fn run(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        let (observed, released) = Self::probe(api, None);
        rec.expect_with(&self.label("session_new(NULL)"), Expect::Failure, &observed, released);

        let nocert = fresh_context(api, self.role);
        match &nocert {
            Ok(ctx) => self.unconfigured(api, rec, ctx),
            Err(problem) => {
                rec.blocked(&self.label("session_new(ctx_nocert)"), "failure", problem);
            }
        }

        let session_name = self.label("session_new(ctx)");
        match self.configured(api) {
            Ok(ctx) => {
                let (observed, released) = Self::probe(api, Some(&ctx));
                rec.expect_with(&session_name, Expect::Success, &observed, released);
                if self.role == Role::Server {
                    rec.check(
                        &self.label("session_free leaves ctx intact"),
                        "context unchanged and reusable",
                        Self::free_keeps_context(api, &ctx),
                    );
                }
            }
            Err(problem) => {
                rec.blocked(&session_name, "success", &problem);
                if self.role == Role::Server {
                    rec.blocked(
                        &self.label("session_free leaves ctx intact"),
                        "context unchanged and reusable",
                        &problem,
                    );
                }
            }
        }

        if self.role == Role::Server {
            let name = self.label("session_new(destroyed ctx)");
            match nocert {
                Ok(mut ctx) => {
                    let destroyed = match ctx.destroy() {
                        Ok(Release::Released) => Ok(()),
                        Ok(Release::AlreadyReleased) => Err(String::from(
                            "ctx_free reported AlreadyReleased for a live context",
                        )),
                        Err(message) => Err(format!("ctx_free crashed: {message}")),
                    };
                    let (observed, released) = Self::probe(api, Some(&ctx));
                    rec.expect_with(&name, Expect::Failure, &observed, destroyed.and(released));
                }
                Err(problem) => rec.blocked(&name, "failure", &problem),
            }
        }
    }
}
