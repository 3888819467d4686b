//! JSONL run logs.
//!
//! Every line is one [`LogEntry`]. `timestamp`, `trace_id`, `level` and
//! `event` are always present; `subtest` events also carry `checker`,
//! `symbol` (the sub-test name) and `outcome`. Trace ids have the form
//! `<suite>::<run>::<seq>`. [`ArtifactIndex`] ties a log to the reports of
//! the same run by SHA-256.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Sub-test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Undefined,
}

/// Workflow that produced the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Unit,
    Conformance,
    Bench,
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const OUTCOMES: [&str; 3] = ["pass", "fail", "undefined"];
const STREAMS: [&str; 3] = ["unit", "conformance", "bench"];
const ERROR_KINDS: [&str; 7] = [
    "allocation_failure",
    "invalid_argument",
    "not_found",
    "unsupported_encoding",
    "malformed_material",
    "precondition_unmet",
    "crash",
];

/// One log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checker: Option<String>,
    /// Sub-test name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Failure kind observed from the library, or `crash`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl LogEntry {
    /// Entry stamped with the current time. An empty `trace_id` is filled in
    /// by [`LogEmitter::emit_entry`].
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            suite: None,
            stream: None,
            checker: None,
            symbol: None,
            outcome: None,
            error_kind: None,
            duration_us: None,
            artifact_refs: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: StreamKind) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Set the checker and sub-test name.
    #[must_use]
    pub fn with_subtest(mut self, checker: impl Into<String>, symbol: impl Into<String>) -> Self {
        self.checker = Some(checker.into());
        self.symbol = Some(symbol.into());
        self
    }

    #[must_use]
    pub fn with_checker(mut self, checker: impl Into<String>) -> Self {
        self.checker = Some(checker.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_error_kind(mut self, kind: impl Into<String>) -> Self {
        self.error_kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_duration_us(mut self, us: u64) -> Self {
        self.duration_us = Some(us);
        self
    }

    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Files written by one run, with digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub suite: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>, suite: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            suite: suite.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Hash `path` and append it under `kind` (`log`, `report`, ...).
    pub fn add_file(&mut self, path: &Path, kind: impl Into<String>) -> io::Result<&mut Self> {
        let bytes = std::fs::read(path)?;
        self.artifacts.push(ArtifactEntry {
            path: path.display().to_string(),
            kind: kind.into(),
            sha256: sha256_hex(&bytes),
            size_bytes: Some(bytes.len() as u64),
        });
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

enum Sink {
    File(BufWriter<File>),
    Buffer(Vec<u8>),
}

/// Writes one JSON object per line, numbering trace ids per run.
pub struct LogEmitter {
    sink: Sink,
    seq: u64,
    suite: String,
    run_id: String,
}

impl LogEmitter {
    fn with_sink(sink: Sink, suite: &str, run_id: &str) -> Self {
        Self {
            sink,
            seq: 0,
            suite: suite.to_owned(),
            run_id: run_id.to_owned(),
        }
    }

    /// Truncate or create `path` and log into it.
    pub fn to_file(path: &Path, suite: &str, run_id: &str) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_sink(Sink::File(BufWriter::new(file)), suite, run_id))
    }

    /// Log into memory; read back with [`LogEmitter::buffered`].
    #[must_use]
    pub fn to_buffer(suite: &str, run_id: &str) -> Self {
        Self::with_sink(Sink::Buffer(Vec::new()), suite, run_id)
    }

    #[must_use]
    pub fn buffered(&self) -> Option<&str> {
        match &self.sink {
            Sink::Buffer(buf) => std::str::from_utf8(buf).ok(),
            Sink::File(_) => None,
        }
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.suite, self.run_id, self.seq)
    }

    fn write_line(&mut self, entry: &LogEntry) -> io::Result<()> {
        let mut line = serde_json::to_vec(entry).map_err(io::Error::other)?;
        line.push(b'\n');
        match &mut self.sink {
            Sink::File(out) => out.write_all(&line),
            Sink::Buffer(buf) => {
                buf.extend_from_slice(&line);
                Ok(())
            }
        }
    }

    /// Log a bare event and return the entry that was written.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> io::Result<LogEntry> {
        let entry = LogEntry::new(self.next_trace_id(), level, event).with_suite(&self.suite);
        self.write_line(&entry)?;
        Ok(entry)
    }

    /// Log a prepared entry. A blank trace id and a missing suite are filled in.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        entry.suite.get_or_insert_with(|| self.suite.clone());
        self.write_line(&entry)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::File(out) => out.flush(),
            Sink::Buffer(_) => Ok(()),
        }
    }
}

/// One schema violation.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} [{}]: {}", self.line_number, self.field, self.message)
    }
}

struct Violations {
    line_number: usize,
    found: Vec<LogValidationError>,
}

impl Violations {
    fn flag(&mut self, field: &str, message: impl Into<String>) {
        self.found.push(LogValidationError {
            line_number: self.line_number,
            field: field.to_owned(),
            message: message.into(),
        });
    }

    fn require(&mut self, obj: &Map<String, Value>, fields: &[&str], message: &str) {
        for field in fields {
            if !obj.contains_key(*field) {
                self.flag(field, message);
            }
        }
    }

    fn one_of(&mut self, obj: &Map<String, Value>, field: &str, allowed: &[&str]) {
        if let Some(value) = obj.get(field).and_then(Value::as_str)
            && !allowed.contains(&value)
        {
            self.flag(field, format!("'{value}' is not one of {allowed:?}"));
        }
    }
}

/// Check one JSONL line and decode it.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut v = Violations {
        line_number,
        found: Vec::new(),
    };
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            v.flag("<json>", format!("not JSON: {err}"));
            return Err(v.found);
        }
    };
    let Some(obj) = value.as_object() else {
        v.flag("<root>", "not a JSON object");
        return Err(v.found);
    };

    v.require(obj, &["timestamp", "trace_id", "level", "event"], "missing");
    v.one_of(obj, "level", &LEVELS);
    v.one_of(obj, "outcome", &OUTCOMES);
    v.one_of(obj, "stream", &STREAMS);
    v.one_of(obj, "error_kind", &ERROR_KINDS);
    if obj.get("event").and_then(Value::as_str) == Some("subtest") {
        v.require(obj, &["checker", "symbol", "outcome"], "missing on a subtest event");
    }
    if let Some(trace_id) = obj.get("trace_id").and_then(Value::as_str)
        && trace_id.split("::").count() != 3
    {
        v.flag("trace_id", format!("'{trace_id}' is not <suite>::<run>::<seq>"));
    }

    if !v.found.is_empty() {
        return Err(v.found);
    }
    serde_json::from_value(value).map_err(|err| {
        v.flag("<entry>", format!("does not decode: {err}"));
        v.found
    })
}

/// Check every line of a JSONL file. Returns the non-blank line count and all violations.
pub fn validate_log_file(path: &Path) -> io::Result<(usize, Vec<LogValidationError>)> {
    Ok(validate_log_text(&std::fs::read_to_string(path)?))
}

/// Same as [`validate_log_file`] for text already in memory.
#[must_use]
pub fn validate_log_text(content: &str) -> (usize, Vec<LogValidationError>) {
    let mut lines = 0;
    let mut errors = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        lines += 1;
        if let Err(found) = validate_log_line(line, idx + 1) {
            errors.extend(found);
        }
    }
    (lines, errors)
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
#[must_use]
pub fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let (year, month, day) = civil_from_days(secs / 86_400);
    let rem = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("tlsapi::run-1::001", LogLevel::Info, "run_start");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["trace_id"], "tlsapi::run-1::001");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "run_start");
        assert!(parsed.get("suite").is_none());
        assert!(parsed.get("checker").is_none());
    }

    #[test]
    fn subtest_entry_carries_context() {
        let entry = LogEntry::new("tlsapi::run-1::002", LogLevel::Warn, "subtest")
            .with_stream(StreamKind::Conformance)
            .with_subtest("credential loader", "use_certificate_file(ctx, bogus, PEM)")
            .with_outcome(Outcome::Fail)
            .with_error_kind("crash")
            .with_duration_us(15)
            .with_details(serde_json::json!({"expected": "failure"}));
        let json = entry.to_jsonl().unwrap();
        assert!(validate_log_line(&json, 1).is_ok());
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["stream"], "conformance");
        assert_eq!(parsed["outcome"], "fail");
        assert_eq!(parsed["duration_us"], 15);
    }

    #[test]
    fn subtest_without_outcome_is_rejected() {
        let json = r#"{"timestamp":"t","trace_id":"a::b::001","level":"info","event":"subtest","checker":"c","symbol":"s"}"#;
        let errors = validate_log_line(json, 4).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "outcome" && e.line_number == 4));
    }

    #[test]
    fn validate_missing_required_field() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","level":"info","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
    }

    #[test]
    fn validate_rejects_unknown_enums() {
        let json = r#"{"timestamp":"t","trace_id":"a::b::001","level":"critical","event":"x","error_kind":"oops"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "level"));
        assert!(errors.iter().any(|e| e.field == "error_kind"));
    }

    #[test]
    fn validate_bad_trace_id_format() {
        let json = r#"{"timestamp":"t","trace_id":"no-separator","level":"info","event":"x"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
        assert!(validate_log_line("not json at all", 1).is_err());
    }

    #[test]
    fn emitter_generates_sequential_trace_ids() {
        let mut emitter = LogEmitter::to_buffer("tlsapi", "run-42");
        let e1 = emitter.emit(LogLevel::Info, "run_start").unwrap();
        let e2 = emitter.emit(LogLevel::Info, "run_end").unwrap();
        assert_eq!(e1.trace_id, "tlsapi::run-42::001");
        assert_eq!(e2.trace_id, "tlsapi::run-42::002");
        let (lines, errors) = validate_log_text(emitter.buffered().unwrap());
        assert_eq!(lines, 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn artifact_index_hashes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, b"abc").unwrap();
        let mut idx = ArtifactIndex::new("run-001", "tlsapi");
        idx.add_file(&path, "report").unwrap();
        assert_eq!(idx.artifacts[0].size_bytes, Some(3));
        assert_eq!(
            idx.artifacts[0].sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let parsed: serde_json::Value = serde_json::from_str(&idx.to_json().unwrap()).unwrap();
        assert_eq!(parsed["index_version"], 1);
    }

    #[test]
    fn utc_formatting_is_calendar_exact() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_utc(1_700_000_000, 7), "2023-11-14T22:13:20.007Z");
        assert_eq!(format_utc(951_782_400, 0), "2000-02-29T00:00:00.000Z");
    }
}
