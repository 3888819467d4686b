use std::path::Path;

use tlsapi_core::{Role, TlsApi};

use super::{Checker, fresh_context, snapshot, unchanged};
use crate::audit::take_census;
use crate::config::FixturePaths;
use crate::guard::OwnedContext;
use crate::recorder::{Expect, Observation, Recorder};

const RELOAD: &str = "load_verify_locations(ctx, ca, NULL) reload";
const RELOAD_QUIRK: &str = "trust-store reload supersedes without release";

/// Trust-store loading from a CA file, a CA directory, or both.
#[derive(Debug)]
pub struct TrustStoreLoaderChecker {
    fixtures: FixturePaths,
}

impl TrustStoreLoaderChecker {
    pub const NAME: &'static str = "trust store loader";

    #[must_use]
    pub fn new(fixtures: FixturePaths) -> Self {
        Self { fixtures }
    }

    fn attempt(
        api: &dyn TlsApi,
        rec: &mut Recorder<'_>,
        ctx: &OwnedContext<'_>,
        name: &str,
        sources: (Option<&Path>, Option<&Path>),
        expect: Expect,
    ) -> bool {
        let (file, dir) = sources;
        let before = snapshot(api, ctx);
        let observed =
            Observation::of(|| api.load_verify_locations(Some(ctx.handle()), file, dir)).summary();
        let after = snapshot(api, ctx);
        let condition = match expect {
            Expect::Failure => unchanged(before.as_ref(), after.as_ref()),
            Expect::Success if after.as_ref().is_some_and(|s| s.trust.is_some()) => Ok(()),
            Expect::Success => Err(String::from("no trust material after success")),
        };
        rec.expect_with(name, expect, &observed, condition)
    }

    fn reload(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>, ctx: &OwnedContext<'_>) {
        let before = take_census(api);
        let ok = Self::attempt(
            api,
            rec,
            ctx,
            RELOAD,
            (Some(self.fixtures.ca_path.as_path()), None),
            Expect::Success,
        );
        if !ok {
            return;
        }
        if let (Ok(before), Ok(after)) = (before, take_census(api))
            && after.trust_blocks > before.trust_blocks
        {
            let superseded = after.trust_blocks - before.trust_blocks;
            rec.allow_trust_leaks(superseded);
            let loads = snapshot(api, ctx).map_or(0, |s| s.trust_loads);
            rec.quirk(
                RELOAD_QUIRK,
                format!(
                    "load {loads} on one context succeeded; \
                     {superseded} superseded trust block(s) stay live"
                ),
            );
        }
    }
}

impl Checker for TrustStoreLoaderChecker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        let fx = &self.fixtures;
        let observed = Observation::of(|| api.load_verify_locations(None, None, None)).summary();
        rec.expect("load_verify_locations(NULL, NULL, NULL)", Expect::Failure, &observed);

        let ctx = match fresh_context(api, Role::Client) {
            Ok(ctx) => ctx,
            Err(problem) => {
                for name in [
                    "load_verify_locations(ctx, NULL, NULL)",
                    "load_verify_locations(NULL, ca, NULL)",
                    "load_verify_locations(ctx, ca, bogus)",
                    RELOAD,
                    "load_verify_locations(ctx, NULL, ca_dir)",
                    "load_verify_locations(ctx, bogus, NULL)",
                    "load_verify_locations(ctx, missing, NULL)",
                ] {
                    rec.blocked(name, "client context", &problem);
                }
                return;
            }
        };

        Self::attempt(
            api,
            rec,
            &ctx,
            "load_verify_locations(ctx, NULL, NULL)",
            (None, None),
            Expect::Failure,
        );

        let observed =
            Observation::of(|| api.load_verify_locations(None, Some(fx.ca_path.as_path()), None)).summary();
        rec.expect("load_verify_locations(NULL, ca, NULL)", Expect::Failure, &observed);

        // An unusable directory next to a good file is ignored.
        Self::attempt(
            api,
            rec,
            &ctx,
            "load_verify_locations(ctx, ca, bogus)",
            (Some(fx.ca_path.as_path()), Some(fx.bogus_path.as_path())),
            Expect::Success,
        );
        self.reload(api, rec, &ctx);

        match fresh_context(api, Role::Client) {
            Ok(dir_ctx) => {
                Self::attempt(
                    api,
                    rec,
                    &dir_ctx,
                    "load_verify_locations(ctx, NULL, ca_dir)",
                    (None, Some(fx.ca_dir.as_path())),
                    Expect::Success,
                );
            }
            Err(problem) => {
                rec.blocked("load_verify_locations(ctx, NULL, ca_dir)", "success", &problem);
            }
        }

        Self::attempt(
            api,
            rec,
            &ctx,
            "load_verify_locations(ctx, bogus, NULL)",
            (Some(fx.bogus_path.as_path()), None),
            Expect::Failure,
        );
        Self::attempt(
            api,
            rec,
            &ctx,
            "load_verify_locations(ctx, missing, NULL)",
            (Some(fx.missing_path.as_path()), None),
            Expect::Failure,
        );
    }
}
