//! Credential and trust material loaded from disk.

mod der;
mod loader;

pub use der::{DerFramingError, check_sequence_framing};
pub use loader::{load_certificates, load_private_key, load_trust_sources};

use sha2::{Digest, Sha256};

/// Parsed material: one or more DER blocks plus a content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    blocks: Vec<Vec<u8>>,
    fingerprint: String,
}

impl Material {
    /// Build material from decoded DER blocks.
    #[must_use]
    pub fn new(blocks: Vec<Vec<u8>>) -> Self {
        let fingerprint = fingerprint(&blocks);
        Self {
            blocks,
            fingerprint,
        }
    }

    /// Number of DER blocks (certificates in a chain or bundle).
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Lowercase hex SHA-256 over the length-prefixed blocks.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(blocks: &[Vec<u8>]) -> String {
    let mut hasher = Sha256::new();
    for block in blocks {
        hasher.update((block.len() as u64).to_be_bytes());
        hasher.update(block);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_depends_on_block_boundaries() {
        let joined = Material::new(vec![vec![1, 2, 3, 4]]);
        let split = Material::new(vec![vec![1, 2], vec![3, 4]]);
        assert_ne!(joined.fingerprint(), split.fingerprint());
        assert_eq!(joined.fingerprint().len(), 64);
        assert_eq!(split.block_count(), 2);
    }
}
