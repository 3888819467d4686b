use tlsapi_core::{Protocol, Role, TlsApi};

use super::{Checker, working_protocol};
use crate::audit::take_census;
use crate::guard::{ContextAttempt, OwnedMethod};
use crate::recorder::{Expect, Observation, Recorder, trap};

/// Method allocation for every protocol and role.
///
/// Compiled-in protocols must allocate and release without side effects;
/// everything else must fail to allocate.
#[derive(Debug, Default)]
pub struct MethodAllocationChecker;

impl MethodAllocationChecker {
    pub const NAME: &'static str = "method allocation";

    fn allocate_and_release(
        api: &dyn TlsApi,
        rec: &mut Recorder<'_>,
        protocol: Protocol,
        role: Role,
        compiled: bool,
    ) {
        let name = format!("method({protocol}, {role})");
        let expect = if compiled { Expect::Success } else { Expect::Failure };
        let before = take_census(api);
        let observation = Observation::of(|| api.method(protocol, role));
        let observed = observation.summary();

        let released = match observation.success() {
            Some(method) => OwnedMethod::new(api, method)
                .release()
                .map_err(|message| format!("free_method crashed: {message}")),
            None => Ok(()),
        };
        let condition = released.and_then(|()| {
            let after = take_census(api)?;
            match before {
                Ok(before) if before == after => Ok(()),
                Ok(before) => Err(format!(
                    "census not restored after release: {}",
                    after.delta_since(&before).describe()
                )),
                Err(problem) => Err(problem),
            }
        });
        rec.expect_with(&name, expect, &observed, condition);
    }

    fn release_is_independent(api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        const NAME: &str = "method release leaves other objects intact";
        let protocol = working_protocol(api);
        let guard = |role| {
            Observation::of(|| api.method(protocol, role))
                .success()
                .map(|method| OwnedMethod::new(api, method))
        };
        let first = guard(Role::Server);
        let second = guard(Role::Client);
        let (Some(first), Some(second)) = (first, second) else {
            rec.blocked(NAME, "other method still usable", "two live methods");
            return;
        };
        let outcome = Self::independent_release(api, first, second);
        rec.check(NAME, "other method still usable", outcome);
    }

    fn independent_release(
        api: &dyn TlsApi,
        first: OwnedMethod<'_>,
        second: OwnedMethod<'_>,
    ) -> Result<String, String> {
        let before = take_census(api)?;
        first
            .release()
            .map_err(|message| format!("free_method crashed: {message}"))?;
        let after = take_census(api)?;
        let delta = after.delta_since(&before);
        if delta.methods != -1 || delta.double_releases != 0 {
            return Err(format!("release affected the census by {}", delta.describe()));
        }
        match second.into_context() {
            ContextAttempt::Created(_ctx) => Ok(String::from("remaining method still usable")),
            ContextAttempt::Rejected { error, .. } => {
                Err(format!("remaining method rejected by ctx_new: {error}"))
            }
            ContextAttempt::Crashed(message) => {
                Err(format!("ctx_new on remaining method crashed: {message}"))
            }
        }
    }
}

impl Checker for MethodAllocationChecker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, api: &dyn TlsApi, rec: &mut Recorder<'_>) {
        let compiled = match trap(|| api.compiled_protocols()) {
            Ok(compiled) => compiled,
            Err(message) => {
                rec.check(
                    "compiled_protocols()",
                    "protocol list",
                    Err(format!("library crashed: {message}")),
                );
                Vec::new()
            }
        };
        for protocol in Protocol::ALL {
            for role in Role::ALL {
                let enabled = protocol != Protocol::Sslv2 && compiled.contains(&protocol);
                Self::allocate_and_release(api, rec, protocol, role, enabled);
            }
        }
        Self::release_is_independent(api, rec);
    }
}
