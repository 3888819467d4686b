//! Sub-test results and their aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one sub-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Failed,
    /// Not evaluated; reserved for stub lines that have no behaviour to check.
    Undefined,
}

impl Verdict {
    #[must_use]
    pub const fn from_passed(passed: bool) -> Self {
        if passed { Self::Passed } else { Self::Failed }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Undefined => "undefined",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single named sub-test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTestResult {
    /// Checker that produced the result.
    pub checker: String,
    /// Sub-test name as printed in the report.
    pub name: String,
    pub verdict: Verdict,
    /// What the sub-test required.
    pub expected: String,
    /// What the library actually did.
    pub actual: String,
    /// Extra context on failure or prerequisite trouble.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SubTestResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

/// Aggregate over every recorded sub-test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub undefined: usize,
    pub results: Vec<SubTestResult>,
}

impl RunSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<SubTestResult>) -> Self {
        let count = |verdict| results.iter().filter(|r| r.verdict == verdict).count();
        let passed = count(Verdict::Passed);
        let failed = count(Verdict::Failed);
        let undefined = count(Verdict::Undefined);
        Self {
            total: results.len(),
            passed,
            failed,
            undefined,
            results,
        }
    }

    /// Returns true if no sub-test failed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Look up a result by checker and name.
    #[must_use]
    pub fn find(&self, checker: &str, name: &str) -> Option<&SubTestResult> {
        self.results
            .iter()
            .find(|r| r.checker == checker && r.name == name)
    }

    /// Failed results, in run order.
    pub fn failures(&self) -> impl Iterator<Item = &SubTestResult> {
        self.results.iter().filter(|r| r.verdict == Verdict::Failed)
    }
}
