//! Census-based leak audit around each checker.

use tlsapi_core::{ResourceCensus, TlsApi};

use crate::recorder::{Recorder, trap};

/// Trapped census query.
pub fn take_census(api: &dyn TlsApi) -> Result<ResourceCensus, String> {
    trap(|| api.census()).map_err(|message| format!("census crashed: {message}"))
}

/// Compare two censuses.
///
/// Clean means no live object was added, nothing was released twice and no
/// unknown handle was released. Up to `allowed_trust_leaks` extra trust blocks
/// are tolerated.
pub fn audit(
    before: &ResourceCensus,
    after: &ResourceCensus,
    allowed_trust_leaks: u64,
) -> Result<String, String> {
    let delta = after.delta_since(before);
    let allowed = i64::try_from(allowed_trust_leaks).unwrap_or(i64::MAX);
    let leaked = delta.methods != 0
        || delta.contexts != 0
        || delta.sessions != 0
        || delta.trust_blocks < 0
        || delta.trust_blocks > allowed
        || delta.double_releases != 0
        || delta.unknown_releases != 0;
    if leaked {
        Err(format!("census changed: {}", delta.describe()))
    } else if delta.trust_blocks > 0 {
        Ok(format!("clean apart from {} superseded trust block(s)", delta.trust_blocks))
    } else {
        Ok(String::from("clean"))
    }
}

/// Record `<checker> resource audit` against a baseline taken on entry.
pub fn record_audit(
    api: &dyn TlsApi,
    rec: &mut Recorder<'_>,
    baseline: &Result<ResourceCensus, String>,
) {
    let name = format!("{} resource audit", rec.checker());
    let outcome = match (baseline, take_census(api)) {
        (Ok(before), Ok(after)) => audit(before, &after, rec.allowed_trust_leaks()),
        (Err(problem), _) => Err(problem.clone()),
        (Ok(_), Err(problem)) => Err(problem),
    };
    rec.check(&name, "no leaked or doubly released objects", outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_census_is_clean() {
        let census = ResourceCensus::default();
        assert_eq!(audit(&census, &census, 0), Ok(String::from("clean")));
    }

    #[test]
    fn allowed_trust_leak_passes_but_extra_fails() {
        let before = ResourceCensus::default();
        let after = ResourceCensus {
            trust_blocks: 2,
            ..ResourceCensus::default()
        };
        assert!(audit(&before, &after, 2).is_ok());
        let err = audit(&before, &after, 1).unwrap_err();
        assert!(err.contains("trust_blocks=+2"), "{err}");
    }

    #[test]
    fn double_release_fails_audit() {
        let before = ResourceCensus::default();
        let after = ResourceCensus {
            double_releases: 1,
            ..ResourceCensus::default()
        };
        assert!(audit(&before, &after, 0).is_err());
    }
}
