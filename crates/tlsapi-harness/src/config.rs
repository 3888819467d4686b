//! Injected fixture configuration.
//!
//! Every file the checkers touch comes from a [`HarnessConfig`], so a run can
//! be pointed at different certificate material without touching checker
//! logic.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Default suite name, used as the trace-id prefix in structured logs.
pub const DEFAULT_SUITE: &str = "tlsapi";

/// Paths of every fixture file a run reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixturePaths {
    /// PEM server certificate.
    pub cert_path: PathBuf,
    /// PEM (PKCS#8) server private key.
    pub key_path: PathBuf,
    /// DER server certificate.
    pub cert_der_path: PathBuf,
    /// DER (PKCS#8) server private key.
    pub key_der_path: PathBuf,
    /// PEM CA certificate used as trust anchor.
    pub ca_path: PathBuf,
    /// Directory holding PEM CA certificates.
    pub ca_dir: PathBuf,
    /// Readable file containing no usable material.
    pub bogus_path: PathBuf,
    /// Path that must not exist.
    pub missing_path: PathBuf,
}

impl FixturePaths {
    /// Default fixture layout below `root`.
    #[must_use]
    pub fn for_root(root: &Path) -> Self {
        let certs = root.join("certs");
        Self {
            cert_path: certs.join("server-cert.pem"),
            key_path: certs.join("server-key.pem"),
            cert_der_path: certs.join("server-cert.der"),
            key_der_path: certs.join("server-key.der"),
            ca_path: certs.join("ca-cert.pem"),
            ca_dir: root.join("ca-dir"),
            bogus_path: root.join("bogus.pem"),
            missing_path: root.join("missing").join("absent.pem"),
        }
    }

    fn required(&self) -> [&Path; 7] {
        [
            &self.cert_path,
            &self.key_path,
            &self.cert_der_path,
            &self.key_der_path,
            &self.ca_path,
            &self.ca_dir,
            &self.bogus_path,
        ]
    }
}

/// What the run should demand of the library beyond the fixed matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectations {
    /// Client sessions must fail on a context without trust material.
    pub client_requires_trust: bool,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            client_requires_trust: true,
        }
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub suite: String,
    pub fixtures: FixturePaths,
    #[serde(default)]
    pub expectations: Expectations,
}

impl HarnessConfig {
    /// Default configuration for the fixture tree at `root`.
    #[must_use]
    pub fn for_root(root: &Path) -> Self {
        Self {
            suite: DEFAULT_SUITE.to_string(),
            fixtures: FixturePaths::for_root(root),
            expectations: Expectations::default(),
        }
    }

    /// Required fixture files that do not exist, plus `missing_path` if it does.
    #[must_use]
    pub fn missing_fixtures(&self) -> Vec<PathBuf> {
        let mut missing: Vec<PathBuf> = self
            .fixtures
            .required()
            .into_iter()
            .filter(|path| !path.exists())
            .map(Path::to_path_buf)
            .collect();
        if self.fixtures.missing_path.exists() {
            missing.push(self.fixtures.missing_path.clone());
        }
        missing
    }

    /// Fail with [`HarnessError::MissingFixtures`] unless every fixture is in place.
    pub fn ensure_fixtures(&self) -> Result<(), HarnessError> {
        let missing = self.missing_fixtures();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::MissingFixtures(missing))
        }
    }

    /// Load configuration from JSON string.
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize configuration to JSON string.
    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content =
            std::fs::read_to_string(path).map_err(|err| HarnessError::io(path, err))?;
        Self::from_json(&content)
    }
}
