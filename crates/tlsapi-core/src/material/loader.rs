//! File loaders for certificates, private keys and trust sources.
//!
//! Loaders only read and parse; they never touch a context. Callers write a
//! context slot after a loader returns `Ok`, which keeps every load
//! all-or-nothing.

use std::io;
use std::path::{Path, PathBuf};

use rustls_pki_types::pem::{self, PemObject};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use super::Material;
use super::der::check_sequence_framing;
use crate::error::{ApiError, ApiResult};
use crate::types::Encoding;

/// Load a certificate chain (one or more certificates).
pub fn load_certificates(path: &Path, encoding: Encoding) -> ApiResult<Material> {
    let blocks = match encoding {
        Encoding::Pem => read_pem_certificates(path)?,
        Encoding::Der => vec![read_der(path)?],
    };
    Ok(Material::new(blocks))
}

/// Load a single private key.
pub fn load_private_key(path: &Path, encoding: Encoding) -> ApiResult<Material> {
    let block = match encoding {
        Encoding::Pem => {
            let key = PrivateKeyDer::from_pem_file(path).map_err(|err| pem_error(path, err))?;
            key.secret_der().to_vec()
        }
        Encoding::Der => read_der(path)?,
    };
    Ok(Material::new(vec![block]))
}

/// Gather PEM trust anchors from a CA file and/or a CA directory.
///
/// A given file must yield at least one certificate or the whole call fails.
/// A directory contributes every file that parses and is otherwise ignored,
/// so an unusable directory next to a good file is not an error.
pub fn load_trust_sources(file: Option<&Path>, dir: Option<&Path>) -> ApiResult<Material> {
    let mut blocks = match file {
        Some(path) => read_pem_certificates(path)?,
        None => Vec::new(),
    };
    if let Some(dir) = dir {
        blocks.extend(read_directory_certificates(dir));
    }

    if blocks.is_empty() {
        return Err(match dir {
            Some(dir) if !dir.exists() => ApiError::NotFound {
                path: dir.to_path_buf(),
            },
            Some(dir) => ApiError::MalformedMaterial {
                path: dir.to_path_buf(),
                reason: String::from("no usable CA certificates in directory"),
            },
            None => ApiError::InvalidArgument("no trust source given"),
        });
    }
    Ok(Material::new(blocks))
}

fn read_pem_certificates(path: &Path) -> ApiResult<Vec<Vec<u8>>> {
    let mut blocks = Vec::new();
    for cert in CertificateDer::pem_file_iter(path).map_err(|err| pem_error(path, err))? {
        let cert = cert.map_err(|err| pem_error(path, err))?;
        check_sequence_framing(cert.as_ref()).map_err(|err| malformed(path, err.to_string()))?;
        blocks.push(cert.as_ref().to_vec());
    }
    if blocks.is_empty() {
        return Err(malformed(path, "no CERTIFICATE sections"));
    }
    Ok(blocks)
}

fn read_der(path: &Path) -> ApiResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|err| io_error(path, &err))?;
    check_sequence_framing(&bytes).map_err(|err| malformed(path, err.to_string()))?;
    Ok(bytes)
}

fn read_directory_certificates(dir: &Path) -> Vec<Vec<u8>> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    paths
        .iter()
        .filter_map(|path| read_pem_certificates(path).ok())
        .flatten()
        .collect()
}

fn pem_error(path: &Path, err: pem::Error) -> ApiError {
    match err {
        pem::Error::Io(io_err) => io_error(path, &io_err),
        pem::Error::NoItemsFound => malformed(path, "no PEM sections"),
        other => malformed(path, format!("{other:?}")),
    }
}

fn io_error(path: &Path, err: &io::Error) -> ApiError {
    if err.kind() == io::ErrorKind::NotFound {
        ApiError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        malformed(path, err.to_string())
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> ApiError {
    ApiError::MalformedMaterial {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
