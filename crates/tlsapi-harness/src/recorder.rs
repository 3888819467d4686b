//! Crash trapping, observations and the per-run result recorder.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use tlsapi_core::{ApiErrorKind, ApiResult};

use crate::report::QuirkNote;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, StreamKind};
use crate::verify::{SubTestResult, Verdict};

/// Run `f`, turning a panic into `Err(message)`.
pub fn trap<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("non-string panic payload"))
    })
}

/// What a trapped library call did.
#[derive(Debug)]
pub enum Observation<T> {
    Success(T),
    Failure(ApiErrorKind),
    Crash(String),
}

impl<T> Observation<T> {
    /// Trap a fallible library call.
    pub fn of(f: impl FnOnce() -> ApiResult<T>) -> Self {
        match trap(f) {
            Ok(Ok(value)) => Self::Success(value),
            Ok(Err(err)) => Self::Failure(err.kind()),
            Err(message) => Self::Crash(message),
        }
    }

    /// Drop the payload, keeping only the shape.
    #[must_use]
    pub fn summary(&self) -> Observed {
        match self {
            Self::Success(_) => Observed::Success,
            Self::Failure(kind) => Observed::Failure(*kind),
            Self::Crash(message) => Observed::Crash(message.clone()),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) | Self::Crash(_) => None,
        }
    }
}

/// Payload-free observation, as recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Success,
    Failure(ApiErrorKind),
    Crash(String),
}

impl Observed {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Success => String::from("success"),
            Self::Failure(kind) => format!("failure({})", kind.as_str()),
            Self::Crash(message) => format!("crash: {message}"),
        }
    }

    fn error_kind(&self) -> Option<&'static str> {
        match self {
            Self::Success => None,
            Self::Failure(kind) => Some(kind.as_str()),
            Self::Crash(_) => Some("crash"),
        }
    }
}

impl<T> From<&Observation<T>> for Observed {
    fn from(observation: &Observation<T>) -> Self {
        observation.summary()
    }
}

/// Required outcome of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Success,
    Failure,
}

impl Expect {
    /// A crash never satisfies an expectation.
    #[must_use]
    pub fn is_met_by(self, observed: &Observed) -> bool {
        matches!(
            (self, observed),
            (Self::Success, Observed::Success) | (Self::Failure, Observed::Failure(_))
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Appends sub-test results and quirk notes for one run.
pub struct Recorder<'log> {
    checker: String,
    started: Instant,
    results: Vec<SubTestResult>,
    quirks: Vec<QuirkNote>,
    allowed_trust_leaks: u64,
    log: Option<&'log mut LogEmitter>,
    log_error: Option<std::io::Error>,
}

impl<'log> Recorder<'log> {
    #[must_use]
    pub fn new(log: Option<&'log mut LogEmitter>) -> Self {
        Self {
            checker: String::from("runner"),
            started: Instant::now(),
            results: Vec::new(),
            quirks: Vec::new(),
            allowed_trust_leaks: 0,
            log,
            log_error: None,
        }
    }

    /// Start attributing results to `checker`.
    pub fn begin(&mut self, checker: &str) {
        self.checker = checker.to_string();
        self.started = Instant::now();
        self.allowed_trust_leaks = 0;
        self.log_with(|entry| entry.with_checker(checker), LogLevel::Info, "checker_start");
    }

    /// Close the current checker and return to runner attribution.
    pub fn end(&mut self) {
        let elapsed = duration_us(self.started);
        let checker = std::mem::replace(&mut self.checker, String::from("runner"));
        self.log_with(
            |entry| entry.with_checker(checker).with_duration_us(elapsed),
            LogLevel::Info,
            "checker_end",
        );
    }

    #[must_use]
    pub fn checker(&self) -> &str {
        &self.checker
    }

    /// Record a call result against its expectation.
    pub fn expect(&mut self, name: &str, expect: Expect, observed: &Observed) -> bool {
        let passed = expect.is_met_by(observed);
        let note = match observed {
            Observed::Crash(message) => Some(format!("library crashed: {message}")),
            _ => None,
        };
        self.push(
            name,
            Verdict::from_passed(passed),
            expect.as_str(),
            observed.describe(),
            note,
            observed.error_kind(),
        );
        passed
    }

    /// Record a call result that must also satisfy an extra condition.
    pub fn expect_with(
        &mut self,
        name: &str,
        expect: Expect,
        observed: &Observed,
        condition: Result<(), String>,
    ) -> bool {
        let call_ok = expect.is_met_by(observed);
        let passed = call_ok && condition.is_ok();
        let note = match (observed, condition) {
            (Observed::Crash(message), _) => Some(format!("library crashed: {message}")),
            (_, Err(problem)) => Some(problem),
            (_, Ok(())) => None,
        };
        self.push(
            name,
            Verdict::from_passed(passed),
            expect.as_str(),
            observed.describe(),
            note,
            observed.error_kind(),
        );
        passed
    }

    /// Record a property check that is not a single call.
    pub fn check(&mut self, name: &str, expected: &str, outcome: Result<String, String>) -> bool {
        let passed = outcome.is_ok();
        let (actual, note) = match outcome {
            Ok(actual) => (actual, None),
            Err(problem) => (String::from("violated"), Some(problem)),
        };
        self.push(
            name,
            Verdict::from_passed(passed),
            expected,
            actual,
            note,
            None,
        );
        passed
    }

    /// Record a sub-test that could not run because a prerequisite failed.
    pub fn blocked(&mut self, name: &str, expected: &str, prerequisite: &str) {
        self.push(
            name,
            Verdict::Failed,
            expected,
            String::from("not run"),
            Some(format!("prerequisite unavailable: {prerequisite}")),
            None,
        );
    }

    /// Record a line that has nothing to evaluate.
    pub fn undefined(&mut self, name: &str, note: &str) {
        self.push(
            name,
            Verdict::Undefined,
            "not evaluated",
            String::from("not evaluated"),
            Some(note.to_string()),
            None,
        );
    }

    /// Note a documented library quirk.
    pub fn quirk(&mut self, title: &str, observation: String) {
        let details = serde_json::json!({
            "title": title,
            "observation": observation,
        });
        let checker = self.checker.clone();
        self.log_with(
            |entry| entry.with_checker(checker).with_details(details),
            LogLevel::Warn,
            "quirk",
        );
        self.quirks.push(QuirkNote {
            checker: self.checker.clone(),
            title: title.to_string(),
            observation,
        });
    }

    /// Let the current checker's audit tolerate `count` more unreleased trust blocks.
    pub fn allow_trust_leaks(&mut self, count: u64) {
        self.allowed_trust_leaks += count;
    }

    #[must_use]
    pub const fn allowed_trust_leaks(&self) -> u64 {
        self.allowed_trust_leaks
    }

    /// Free-form progress event.
    pub fn event(&mut self, level: LogLevel, event: &str, details: serde_json::Value) {
        self.log_with(|entry| entry.with_details(details), level, event);
    }

    #[must_use]
    pub fn results(&self) -> &[SubTestResult] {
        &self.results
    }

    /// Consume the recorder. The error is the first log write failure, if any.
    pub fn finish(self) -> (Vec<SubTestResult>, Vec<QuirkNote>, Option<std::io::Error>) {
        (self.results, self.quirks, self.log_error)
    }

    fn push(
        &mut self,
        name: &str,
        verdict: Verdict,
        expected: &str,
        actual: String,
        note: Option<String>,
        error_kind: Option<&'static str>,
    ) {
        let result = SubTestResult {
            checker: self.checker.clone(),
            name: name.to_string(),
            verdict,
            expected: expected.to_string(),
            actual,
            note,
        };
        let (level, outcome) = match verdict {
            Verdict::Passed => (LogLevel::Info, Outcome::Pass),
            Verdict::Failed => (LogLevel::Warn, Outcome::Fail),
            Verdict::Undefined => (LogLevel::Info, Outcome::Undefined),
        };
        let details = serde_json::json!({
            "expected": result.expected,
            "actual": result.actual,
            "note": result.note,
        });
        let checker = result.checker.clone();
        self.log_with(
            |entry| {
                let entry = entry
                    .with_subtest(checker, name)
                    .with_outcome(outcome)
                    .with_details(details);
                match error_kind {
                    Some(kind) => entry.with_error_kind(kind),
                    None => entry,
                }
            },
            level,
            "subtest",
        );
        self.results.push(result);
    }

    fn log_with(&mut self, build: impl FnOnce(LogEntry) -> LogEntry, level: LogLevel, event: &str) {
        let Some(log) = self.log.as_deref_mut() else {
            return;
        };
        if self.log_error.is_some() {
            return;
        }
        let entry = build(LogEntry::new("", level, event).with_stream(StreamKind::Conformance));
        if let Err(err) = log.emit_entry(entry) {
            self.log_error = Some(err);
        }
    }
}

fn duration_us(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}
