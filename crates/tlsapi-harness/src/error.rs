//! Harness-level errors (configuration, fixtures, log output).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure outside the library under test.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid harness config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("missing fixture files: {}", join_paths(.0))]
    MissingFixtures(Vec<PathBuf>),
    #[error("structured log write failed: {0}")]
    Log(#[source] io::Error),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
