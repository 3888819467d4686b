use std::path::Path;

use tlsapi_core::{ApiResult, ContextHandle, ContextSnapshot, EncodingTag, Role, TlsApi};

use super::{Checker, fresh_context, snapshot, unchanged};
use crate::config::FixturePaths;
use crate::guard::{OwnedContext, OwnedSession};
use crate::recorder::{Expect, Observation, Recorder};

const INVALID_TAG: EncodingTag = EncodingTag(9999);
const SESSION_AFTER: &str = "session_new(ctx) server after rejected credential loads";

#[derive(Debug, Clone, Copy)]
enum Slot {
    Certificate,
    PrivateKey,
}

impl Slot {
    const fn call(self) -> &'static str {
        match self {
            Self::Certificate => "use_certificate_file",
            Self::PrivateKey => "use_private_key_file",
        }
    }

    fn load(
        self,
        api: &dyn TlsApi,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        tag: EncodingTag,
    ) -> ApiResult<()> {
        match self {
            Self::Certificate => api.use_certificate_file(ctx, path, tag),
            Self::PrivateKey => api.use_private_key_file(ctx, path, tag),
        }
    }

    fn pem(self, fixtures: &FixturePaths) -> &Path {
        match self {
            Self::Certificate => &fixtures.cert_path,
            Self::PrivateKey => &fixtures.key_path,
        }
    }

    fn der(self, fixtures: &FixturePaths) -> &Path {
        match self {
            Self::Certificate => &fixtures.cert_der_path,
            Self::PrivateKey => &fixtures.key_der_path,
        }
    }

    fn loaded(self, snapshot: Option<&ContextSnapshot>) -> bool {
        snapshot.is_some_and(|s| match self {
            Self::Certificate => s.certificate.is_some(),
            Self::PrivateKey => s.private_key.is_some(),
        })
    }
}

/// Certificate and private-key loading, including the negative matrix.
///
/// Every rejected load must leave the context snapshot untouched, and the
/// context must still produce a server session at the end.
#[derive(Debug)]
pub struct CredentialLoaderChecker {
    fixtures: FixturePaths,
}

impl CredentialLoaderChecker {
    pub const NAME: &'static str = "credential loader";

    #[must_use]
    pub fn new(fixtures: FixturePaths) -> Self {
        Self { fixtures }
    }

    fn null_context(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>, slot: Slot) {
        let call = slot.call();
        let observed = Observation::of(|| slot.load(api, None, None, INVALID_TAG)).summary();
        rec.expect(&format!("{call}(NULL, NULL, 9999)"), Expect::Failure, &observed);

        let valid = slot.pem(&self.fixtures);
        let observed =
            Observation::of(|| slot.load(api, None, Some(valid), EncodingTag::PEM)).summary();
        rec.expect(&format!("{call}(NULL, valid, PEM)"), Expect::Failure, &observed);
    }

    /// Attempt a load on `ctx`; rejected loads must not change it.
    #[allow(clippy::too_many_arguments)]
    fn attempt(
        api: &dyn TlsApi,
        rec: &mut Recorder<'_>,
        ctx: &OwnedContext<'_>,
        slot: Slot,
        name: &str,
        path: &Path,
        tag: EncodingTag,
        expect: Expect,
    ) {
        let before = snapshot(api, ctx);
        let observed =
            Observation::of(|| slot.load(api, Some(ctx.handle()), Some(path), tag)).summary();
        let after = snapshot(api, ctx);
        let condition = match expect {
            Expect::Failure => unchanged(before.as_ref(), after.as_ref()),
            Expect::Success if slot.loaded(after.as_ref()) => Ok(()),
            Expect::Success => Err(format!("{} slot still empty after success", slot.call())),
        };
        rec.expect_with(name, expect, &observed, condition);
    }

    fn on_context(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>, ctx: &OwnedContext<'_>, slot: Slot) {
        let call = slot.call();
        let fx = &self.fixtures;
        let pem = slot.pem(fx);
        let cases: [(String, &Path, EncodingTag, Expect); 7] = [
            (format!("{call}(ctx, bogus, PEM)"), fx.bogus_path.as_path(), EncodingTag::PEM, Expect::Failure),
            (format!("{call}(ctx, missing, PEM)"), fx.missing_path.as_path(), EncodingTag::PEM, Expect::Failure),
            (format!("{call}(ctx, valid, 9999)"), pem, INVALID_TAG, Expect::Failure),
            (format!("{call}(ctx, valid, PEM)"), pem, EncodingTag::PEM, Expect::Success),
            (format!("{call}(ctx, valid-pem, DER)"), pem, EncodingTag::DER, Expect::Failure),
            (format!("{call}(ctx, valid-der, DER)"), slot.der(fx), EncodingTag::DER, Expect::Success),
            (
                format!("{call}(ctx, bogus, PEM) after load keeps slot"),
                fx.bogus_path.as_path(),
                EncodingTag::PEM,
                Expect::Failure,
            ),
        ];
        for (name, path, tag, expect) in cases {
            Self::attempt(api, rec, ctx, slot, &name, path, tag, expect);
        }
    }

    fn names_after_context(slot: Slot) -> impl Iterator<Item = String> {
        let call = slot.call();
        [
            "(ctx, bogus, PEM)",
            "(ctx, missing, PEM)",
            "(ctx, valid, 9999)",
            "(ctx, valid, PEM)",
            "(ctx, valid-pem, DER)",
            "(ctx, valid-der, DER)",
            "(ctx, bogus, PEM) after load keeps slot",
        ]
        .into_iter()
        .map(move |args| format!("{call}{args}"))
    }
}

impl Checker for CredentialLoaderChecker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        let ctx = fresh_context(api, Role::Server);
        for slot in [Slot::Certificate, Slot::PrivateKey] {
            self.null_context(api, rec, slot);
            match &ctx {
                Ok(ctx) => self.on_context(api, rec, ctx, slot),
                Err(problem) => {
                    for name in Self::names_after_context(slot) {
                        rec.blocked(&name, "server context", problem);
                    }
                }
            }
        }

        let ctx = match ctx {
            Ok(ctx) => ctx,
            Err(problem) => {
                rec.blocked(SESSION_AFTER, "success", &problem);
                return;
            }
        };
        let observation = Observation::of(|| api.session_new(Some(ctx.handle())));
        let observed = observation.summary();
        let released = match observation.success() {
            Some(session) => OwnedSession::new(api, session)
                .release()
                .map_err(|message| format!("session_free crashed: {message}")),
            None => Ok(()),
        };
        rec.expect_with(SESSION_AFTER, Expect::Success, &observed, released);
    }
}
