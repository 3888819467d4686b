//! Integration test: the harness against misbehaving libraries.
//!
//! Run: cargo test -p tlsapi-harness --test fault_injection_test

use std::path::{Path, PathBuf};

use tlsapi_core::{
    ApiError, ApiResult, ContextCreation, ContextHandle, ContextSnapshot, EncodingTag, MethodHandle,
    ModelLibrary, Protocol, Release, ResourceCensus, Role, SessionHandle, TlsApi,
};
use tlsapi_harness::fault::RejectingContexts;
use tlsapi_harness::{ApiReport, ApiTestRunner, HarnessConfig, Verdict};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn run(api: &dyn TlsApi) -> ApiReport {
    let config = HarnessConfig::for_root(&workspace_root().join("tests/fixtures"));
    ApiTestRunner::new(config).run(api)
}

fn audit_verdict(report: &ApiReport, checker: &str) -> Verdict {
    report
        .summary
        .find(checker, &format!("{checker} resource audit"))
        .map(|r| r.verdict)
        .unwrap()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fault {
    PanicOnCertificate,
    LeakSessions,
    /// Unknown encodings still load the certificate as PEM, then fail.
    PartialWrite,
    /// `context_new` keeps the method and reports failure without it.
    SwallowMethod,
    PanicOnContextFree,
}

struct Faulty {
    inner: ModelLibrary,
    fault: Fault,
}

impl Faulty {
    fn new(fault: Fault) -> Self {
        Self {
            inner: ModelLibrary::new(),
            fault,
        }
    }
}

impl TlsApi for Faulty {
    fn name(&self) -> &str {
        "faulty"
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
        match method {
            Some(_swallowed) if self.fault == Fault::SwallowMethod => ContextCreation::Failed {
                method: None,
                error: ApiError::AllocationFailure(String::from("out of contexts")),
            },
            method => self.inner.context_new(method),
        }
    }

    fn context_free(&self, ctx: &ContextHandle) -> Release {
        if self.fault == Fault::PanicOnContextFree {
            panic!("context teardown exploded");
        }
        self.inner.context_free(ctx)
    }

    fn use_certificate_file(
        &self,
        ctx: Option<&ContextHandle>,
        path: Option<&Path>,
        encoding: EncodingTag,
    ) -> ApiResult<()> {
        if self.fault == Fault::PanicOnCertificate {
            panic!("certificate loader exploded");
        }
        if self.fault == Fault::PartialWrite && encoding.recognize().is_none() {
            self.inner.use_certificate_file(ctx, path, EncodingTag::PEM)?;
            return Err(ApiError::UnsupportedEncoding(encoding.0));
        }
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
        if self.fault != Fault::LeakSessions {
            self.inner.session_free(session);
        }
    }

    fn context_snapshot(&self, ctx: &ContextHandle) -> Option<ContextSnapshot> {
        self.inner.context_snapshot(ctx)
    }

    fn census(&self) -> ResourceCensus {
        self.inner.census()
    }
}

#[test]
fn crashes_become_failed_sub_tests() {
    let library = Faulty::new(Fault::PanicOnCertificate);
    let report = run(&library);
    assert!(report.run_completed);

    let crashed = report
        .summary
        .find("credential loader", "use_certificate_file(ctx, valid, PEM)")
        .unwrap();
    assert_eq!(crashed.verdict, Verdict::Failed);
    assert!(crashed.actual.starts_with("crash: certificate loader exploded"));
    assert!(crashed.note.as_deref().unwrap().starts_with("library crashed"));

    // Key loading is unaffected.
    let key = report
        .summary
        .find("credential loader", "use_private_key_file(ctx, valid, PEM)")
        .unwrap();
    assert_eq!(key.verdict, Verdict::Passed);

    // Server setup needs a certificate, so the dependent sub-test is blocked.
    let blocked = report
        .summary
        .find("server sessions", "session_new(ctx) [server]")
        .unwrap();
    assert_eq!(blocked.actual, "not run");

    // Later checkers still ran and nothing leaked.
    for checker in [
        "credential loader",
        "trust store loader",
        "server sessions",
        "client sessions",
    ] {
        assert_eq!(audit_verdict(&report, checker), Verdict::Passed, "{checker}");
    }
    assert_eq!(
        report.summary.results.last().unwrap().name,
        "library_cleanup()"
    );
}

#[test]
fn leaked_sessions_fail_the_audit() {
    let library = Faulty::new(Fault::LeakSessions);
    let report = run(&library);
    assert!(report.run_completed);
    assert_eq!(audit_verdict(&report, "server sessions"), Verdict::Failed);
    assert_eq!(audit_verdict(&report, "client sessions"), Verdict::Failed);
    assert_eq!(audit_verdict(&report, "context lifecycle"), Verdict::Passed);

    let audit = report
        .summary
        .find("server sessions", "server sessions resource audit")
        .unwrap();
    assert!(audit.note.as_deref().unwrap().contains("sessions"));
}

#[test]
fn refused_contexts_hand_every_method_back() {
    let model = ModelLibrary::new();
    let rejecting = RejectingContexts::new(&model);
    let report = run(&rejecting);
    assert!(report.run_completed);

    let ctx_new = report
        .summary
        .find("context lifecycle", "ctx_new(method)")
        .unwrap();
    assert_eq!(ctx_new.actual, "failure(allocation_failure)");
    assert_eq!(
        report
            .summary
            .find("context lifecycle", "returned method releases cleanly")
            .unwrap()
            .verdict,
        Verdict::Passed
    );
    for checker in [
        "method allocation",
        "context lifecycle",
        "credential loader",
        "trust store loader",
        "server sessions",
        "client sessions",
    ] {
        assert_eq!(audit_verdict(&report, checker), Verdict::Passed, "{checker}");
    }
    assert_eq!(model.census().methods, 0);
}

#[test]
fn state_changed_by_a_failed_load_is_caught() {
    let library = Faulty::new(Fault::PartialWrite);
    let report = run(&library);
    assert!(report.run_completed);

    let partial = report
        .summary
        .find("credential loader", "use_certificate_file(ctx, valid, 9999)")
        .unwrap();
    assert_eq!(partial.verdict, Verdict::Failed);
    assert_eq!(partial.actual, "failure(unsupported_encoding)");
    let note = partial.note.as_deref().unwrap();
    assert!(note.starts_with("failed call changed the context"), "{note}");
    assert!(note.contains("certificate: Some("), "{note}");

    // Key loads and the NULL-context case are untouched.
    for name in [
        "use_certificate_file(NULL, NULL, 9999)",
        "use_private_key_file(ctx, valid, 9999)",
    ] {
        let result = report.summary.find("credential loader", name).unwrap();
        assert_eq!(result.verdict, Verdict::Passed, "{name}");
    }
    assert_eq!(audit_verdict(&report, "credential loader"), Verdict::Passed);
}

#[test]
fn swallowed_methods_fail_creation_and_the_audit() {
    let library = Faulty::new(Fault::SwallowMethod);
    let report = run(&library);
    assert!(report.run_completed);

    let created = report
        .summary
        .find("context lifecycle", "ctx_new(method)")
        .unwrap();
    assert_eq!(created.verdict, Verdict::Failed);
    assert_eq!(created.actual, "failure(allocation_failure)");
    assert!(created.note.as_deref().unwrap().contains("swallowed"));

    let rejected = report
        .summary
        .find("context lifecycle", "ctx_new(method) rejected hands method back")
        .unwrap();
    assert_eq!(rejected.verdict, Verdict::Failed);
    let note = rejected.note.as_deref().unwrap();
    assert!(note.contains("swallowed") && note.contains("library refusal"), "{note}");
    assert_eq!(
        report
            .summary
            .find("context lifecycle", "returned method releases cleanly")
            .unwrap()
            .actual,
        "not run"
    );

    // One method lost in ctx_new(method), one in the refusal sub-test.
    let audit = report
        .summary
        .find("context lifecycle", "context lifecycle resource audit")
        .unwrap();
    assert_eq!(audit.verdict, Verdict::Failed);
    assert_eq!(audit.note.as_deref(), Some("census changed: methods=+2"));
    assert_eq!(audit_verdict(&report, "method allocation"), Verdict::Passed);
}

#[test]
fn crashing_context_free_is_reported_where_it_happens() {
    let library = Faulty::new(Fault::PanicOnContextFree);
    let report = run(&library);
    assert!(report.run_completed);

    let destroyed = report
        .summary
        .find("server sessions", "session_new(destroyed ctx) [server]")
        .unwrap();
    assert_eq!(destroyed.verdict, Verdict::Failed);
    let note = destroyed.note.as_deref().unwrap();
    assert!(note.starts_with("ctx_free crashed: context teardown exploded"), "{note}");

    let freed = report
        .summary
        .find("context lifecycle", "ctx_free(ctx) releases owned method")
        .unwrap();
    assert_eq!(freed.verdict, Verdict::Failed);
    assert!(freed.note.as_deref().unwrap().contains("ctx_free crashed"));
}
