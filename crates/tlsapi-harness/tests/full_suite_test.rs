//! Integration test: full API run against the reference library.
//!
//! Run: cargo test -p tlsapi-harness --test full_suite_test

use std::path::{Path, PathBuf};

use tlsapi_core::{ClientTrustPolicy, ModelLibrary, ModelOptions};
use tlsapi_harness::checks::{SessionInstantiationChecker, TrustStoreLoaderChecker};
use tlsapi_harness::structured_log::{LogEmitter, validate_log_text};
use tlsapi_harness::{ApiTestRunner, HarnessConfig, Verdict};

fn workspace_root() -> PathBuf {
    let manifest = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn config() -> HarnessConfig {
    HarnessConfig::for_root(&workspace_root().join("tests/fixtures"))
}

#[test]
fn fixtures_are_in_place() {
    assert_eq!(config().missing_fixtures(), Vec::<PathBuf>::new());
}

#[test]
fn reference_library_passes_every_sub_test() {
    let report = ApiTestRunner::new(config()).run(&ModelLibrary::new());
    let failures: Vec<_> = report.summary.failures().collect();
    assert!(failures.is_empty(), "unexpected failures: {failures:#?}");
    assert!(report.run_completed);
    assert_eq!(report.summary.total, 67);
    assert_eq!(report.summary.undefined, 1);
    assert_eq!(report.summary.passed, 66);
}

#[test]
fn run_order_is_fixed() {
    let report = ApiTestRunner::new(config()).run(&ModelLibrary::new());
    let results = &report.summary.results;
    assert_eq!(results.first().unwrap().name, "library_init()");
    assert_eq!(results.last().unwrap().name, "library_cleanup()");
    assert_eq!(results[results.len() - 2].name, "read and write");
    assert_eq!(results[results.len() - 2].verdict, Verdict::Undefined);

    let checkers: Vec<&str> = results.iter().map(|r| r.checker.as_str()).collect();
    let mut order: Vec<&str> = Vec::new();
    for checker in checkers {
        if order.last() != Some(&checker) {
            order.push(checker);
        }
    }
    assert_eq!(
        order,
        [
            "runner",
            "method allocation",
            "context lifecycle",
            "credential loader",
            "trust store loader",
            "server sessions",
            "client sessions",
            "runner",
        ]
    );
}

#[test]
fn matrix_names_match_report_lines() {
    let report = ApiTestRunner::new(config()).run(&ModelLibrary::new());
    let summary = &report.summary;
    for (checker, name) in [
        ("method allocation", "method(tls1.2, server)"),
        ("method allocation", "method(sslv2, client)"),
        ("method allocation", "method release leaves other objects intact"),
        ("context lifecycle", "ctx_new(NULL)"),
        ("context lifecycle", "ctx_new(method) rejected hands method back"),
        ("context lifecycle", "returned method releases cleanly"),
        ("credential loader", "use_certificate_file(NULL, NULL, 9999)"),
        ("credential loader", "use_private_key_file(ctx, valid-der, DER)"),
        ("credential loader", "use_certificate_file(ctx, bogus, PEM) after load keeps slot"),
        (
            "credential loader",
            "session_new(ctx) server after rejected credential loads",
        ),
        ("trust store loader", "load_verify_locations(ctx, NULL, ca_dir)"),
        ("server sessions", "session_new(destroyed ctx) [server]"),
        ("client sessions", "session_new(ctx_nocert) [client]"),
        ("client sessions", "client sessions resource audit"),
    ] {
        let result = summary
            .find(checker, name)
            .unwrap_or_else(|| panic!("missing {checker}: {name}"));
        assert_eq!(result.verdict, Verdict::Passed, "{result:?}");
    }

    let text = report.render_plain();
    assert!(text.starts_with(" Begin API Tests\n"));
    assert!(text.contains("\n   method(sslv2, server): passed\n"));
    assert!(text.ends_with(" End API Tests: total=67 passed=66 failed=0 undefined=1\n"));
}

#[test]
fn trust_reload_is_documented_not_fixed() {
    let report = ApiTestRunner::new(config()).run(&ModelLibrary::new());
    assert_eq!(report.quirks.len(), 1);
    let quirk = &report.quirks[0];
    assert_eq!(quirk.checker, TrustStoreLoaderChecker::NAME);
    assert!(quirk.observation.contains("1 superseded trust block"));
    let audit = report
        .summary
        .find(TrustStoreLoaderChecker::NAME, "trust store loader resource audit")
        .unwrap();
    assert_eq!(audit.verdict, Verdict::Passed);
    assert!(audit.actual.contains("superseded"));
}

#[test]
fn permissive_client_sessions_are_surfaced() {
    let library = ModelLibrary::with_options(
        ModelOptions::default().with_client_trust(ClientTrustPolicy::Permissive),
    );
    let report = ApiTestRunner::new(config()).run(&library);
    assert!(report.run_completed);
    assert_eq!(report.summary.failed, 1);
    let failed = report.summary.failures().next().unwrap();
    assert_eq!(failed.checker, SessionInstantiationChecker::CLIENT);
    assert_eq!(failed.name, "session_new(ctx_nocert) [client]");
    assert_eq!(failed.actual, "success");
    assert!(
        report
            .quirks
            .iter()
            .any(|q| q.observation.starts_with("suspected defect"))
    );
}

#[test]
fn relaxed_expectations_accept_permissive_clients() {
    let mut config = config();
    config.expectations.client_requires_trust = false;
    let library = ModelLibrary::with_options(
        ModelOptions::default().with_client_trust(ClientTrustPolicy::Permissive),
    );
    let report = ApiTestRunner::new(config).run(&library);
    assert!(report.summary.all_passed());
    assert_eq!(report.quirks.len(), 1);
}

#[test]
fn context_cap_blocks_dependent_sub_tests_without_aborting() {
    let library = ModelLibrary::with_options(ModelOptions::default().with_max_contexts(Some(0)));
    let report = ApiTestRunner::new(config()).run(&library);
    assert!(report.run_completed);
    let ctx_new = report
        .summary
        .find("context lifecycle", "ctx_new(method)")
        .unwrap();
    assert_eq!(ctx_new.actual, "failure(allocation_failure)");
    let blocked = report
        .summary
        .find("context lifecycle", "ctx_free(ctx) releases owned method")
        .unwrap();
    assert_eq!(blocked.verdict, Verdict::Failed);
    assert_eq!(blocked.actual, "not run");
    // The cap itself supplies the refusal; nothing is injected.
    let rejected = report
        .summary
        .find("context lifecycle", "ctx_new(method) rejected hands method back")
        .unwrap();
    assert_eq!(rejected.verdict, Verdict::Passed);
    assert_eq!(rejected.actual, "library refusal, same method returned");
    // Methods handed back by refused creations are still released.
    for checker in ["context lifecycle", "credential loader", "server sessions"] {
        let audit = report
            .summary
            .find(checker, &format!("{checker} resource audit"))
            .unwrap();
        assert_eq!(audit.verdict, Verdict::Passed, "{audit:?}");
    }
}

#[test]
fn accepting_library_gets_an_injected_refusal() {
    let report = ApiTestRunner::new(config()).run(&ModelLibrary::new());
    let rejected = report
        .summary
        .find("context lifecycle", "ctx_new(method) rejected hands method back")
        .unwrap();
    assert_eq!(rejected.verdict, Verdict::Passed);
    assert_eq!(rejected.actual, "injected refusal, same method returned");
}

#[test]
fn logged_run_writes_one_entry_per_sub_test() {
    let mut log = LogEmitter::to_buffer("tlsapi", "it");
    let report = ApiTestRunner::new(config())
        .run_logged(&ModelLibrary::new(), &mut log)
        .unwrap();
    let text = log.buffered().unwrap();
    let (lines, errors) = validate_log_text(text);
    assert!(errors.is_empty(), "{errors:?}");
    let subtests = text.lines().filter(|l| l.contains("\"event\":\"subtest\"")).count();
    assert_eq!(subtests, report.summary.total);
    // run_start, run_end, 6 checker start/end pairs and one quirk.
    assert_eq!(lines, report.summary.total + 2 + 12 + 1);
    assert!(text.lines().next().unwrap().contains("\"event\":\"run_start\""));
    assert!(text.lines().last().unwrap().contains("\"event\":\"run_end\""));
}

#[test]
fn json_report_round_trips_through_serde() {
    let report = ApiTestRunner::new(config()).run(&ModelLibrary::new());
    let parsed: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(parsed["summary"]["total"], 67);
    assert_eq!(parsed["summary"]["results"][0]["verdict"], "passed");
    assert!(report.to_markdown().contains("## Quirks"));
}
