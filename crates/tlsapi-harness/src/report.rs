//! Report object and its renderers.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::verify::RunSummary;

/// Documented library behaviour observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuirkNote {
    pub checker: String,
    pub title: String,
    pub observation: String,
}

/// Result of one full API test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiReport {
    /// Report title.
    pub title: String,
    /// Library under test.
    pub library: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// The run reached its end. Says nothing about individual verdicts.
    pub run_completed: bool,
    pub summary: RunSummary,
    pub quirks: Vec<QuirkNote>,
}

impl ApiReport {
    /// Line-oriented console rendering.
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut out = String::from(" Begin API Tests\n");
        for r in &self.summary.results {
            let _ = writeln!(out, "   {}: {}", r.name, r.verdict);
        }
        for quirk in &self.quirks {
            let _ = writeln!(out, "   quirk [{}] {}: {}", quirk.checker, quirk.title, quirk.observation);
        }
        let _ = writeln!(
            out,
            " End API Tests: total={} passed={} failed={} undefined={}",
            self.summary.total, self.summary.passed, self.summary.failed, self.summary.undefined
        );
        out
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.title);
        let _ = writeln!(out, "- Library: {}", self.library);
        let _ = writeln!(out, "- Timestamp: {}", self.timestamp);
        let _ = writeln!(out, "- Run completed: {}", self.run_completed);
        let _ = writeln!(out, "- Total: {}", self.summary.total);
        let _ = writeln!(out, "- Passed: {}", self.summary.passed);
        let _ = writeln!(out, "- Failed: {}", self.summary.failed);
        let _ = writeln!(out, "- Undefined: {}\n", self.summary.undefined);

        out.push_str("| Checker | Sub-test | Status | Expected | Actual |\n");
        out.push_str("|---------|----------|--------|----------|--------|\n");
        for r in &self.summary.results {
            let status = match r.verdict {
                crate::verify::Verdict::Passed => "PASS",
                crate::verify::Verdict::Failed => "FAIL",
                crate::verify::Verdict::Undefined => "UNDEFINED",
            };
            let _ = writeln!(
                out,
                "| {} | `{}` | {} | {} | {} |",
                r.checker, r.name, status, r.expected, r.actual
            );
        }

        let notes: Vec<_> = self
            .summary
            .results
            .iter()
            .filter_map(|r| r.note.as_ref().map(|note| (r, note)))
            .collect();
        if !notes.is_empty() {
            out.push_str("\n## Notes\n\n");
            for (r, note) in notes {
                let _ = writeln!(out, "- `{}`: {}", r.name, note);
            }
        }

        if !self.quirks.is_empty() {
            out.push_str("\n## Quirks\n\n");
            for quirk in &self.quirks {
                let _ = writeln!(
                    out,
                    "- **{}** ({}): {}",
                    quirk.title, quirk.checker, quirk.observation
                );
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
