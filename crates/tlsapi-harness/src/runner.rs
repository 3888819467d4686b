//! Test execution engine.

use tlsapi_core::TlsApi;

use crate::audit::{record_audit, take_census};
use crate::checks::{
    Checker, ContextLifecycleChecker, CredentialLoaderChecker, MethodAllocationChecker,
    SessionInstantiationChecker, TrustStoreLoaderChecker,
};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::recorder::{Expect, Observation, Recorder, trap};
use crate::report::ApiReport;
use crate::structured_log::{LogEmitter, LogLevel, now_utc};
use crate::verify::RunSummary;

/// Name of the read/write stub line.
pub const READ_WRITE_STUB: &str = "read and write";

/// Runs every checker against one library and builds the report.
#[derive(Debug, Clone)]
pub struct ApiTestRunner {
    config: HarnessConfig,
}

impl ApiTestRunner {
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Checkers in dependency order.
    #[must_use]
    pub fn checkers(&self) -> Vec<Box<dyn Checker>> {
        let fixtures = &self.config.fixtures;
        vec![
            Box::new(MethodAllocationChecker),
            Box::new(ContextLifecycleChecker::new(fixtures.clone())),
            Box::new(CredentialLoaderChecker::new(fixtures.clone())),
            Box::new(TrustStoreLoaderChecker::new(fixtures.clone())),
            Box::new(SessionInstantiationChecker::server(fixtures.clone())),
            Box::new(SessionInstantiationChecker::client(
                fixtures.clone(),
                self.config.expectations,
            )),
        ]
    }

    /// Run all API tests.
    #[must_use]
    pub fn run(&self, api: &dyn TlsApi) -> ApiReport {
        self.execute(api, None).0
    }

    /// Run all API tests, writing one JSONL entry per sub-test to `log`.
    pub fn run_logged(
        &self,
        api: &dyn TlsApi,
        log: &mut LogEmitter,
    ) -> Result<ApiReport, HarnessError> {
        let (report, log_error) = self.execute(api, Some(&mut *log));
        if let Some(err) = log_error {
            return Err(HarnessError::Log(err));
        }
        log.flush().map_err(HarnessError::Log)?;
        Ok(report)
    }

    fn execute(
        &self,
        api: &dyn TlsApi,
        log: Option<&mut LogEmitter>,
    ) -> (ApiReport, Option<std::io::Error>) {
        let mut rec = Recorder::new(log);
        rec.event(
            LogLevel::Info,
            "run_start",
            serde_json::json!({
                "library": api.name(),
                "suite": self.config.suite,
                "client_requires_trust": self.config.expectations.client_requires_trust,
            }),
        );

        let observed = Observation::of(|| api.library_init()).summary();
        rec.expect("library_init()", Expect::Success, &observed);

        for checker in self.checkers() {
            rec.begin(checker.name());
            let baseline = take_census(api);
            if let Err(message) = trap(|| checker.run(api, &mut rec)) {
                rec.check(
                    &format!("{} completed", checker.name()),
                    "checker ran to the end",
                    Err(format!("checker aborted: {message}")),
                );
            }
            record_audit(api, &mut rec, &baseline);
            rec.end();
        }

        rec.undefined(READ_WRITE_STUB, "encrypted read/write is not exercised");

        let observed = Observation::of(|| api.library_cleanup()).summary();
        rec.expect("library_cleanup()", Expect::Success, &observed);

        let summary = RunSummary::from_results(rec.results().to_vec());
        rec.event(
            LogLevel::Info,
            "run_end",
            serde_json::json!({
                "total": summary.total,
                "passed": summary.passed,
                "failed": summary.failed,
                "undefined": summary.undefined,
            }),
        );
        let (_, quirks, log_error) = rec.finish();

        let report = ApiReport {
            title: format!("TLS API lifecycle report: {}", api.name()),
            library: api.name().to_string(),
            timestamp: now_utc(),
            run_completed: true,
            summary,
            quirks,
        };
        (report, log_error)
    }
}
