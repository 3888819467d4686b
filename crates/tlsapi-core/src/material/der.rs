//! Minimal DER framing check.
//!
//! Only the outer ASN.1 SEQUENCE is inspected: tag, definite length, and that
//! the encoded length covers the input exactly. Certificate contents are not
//! validated here.

use std::fmt;

const SEQUENCE: u8 = 0x30;

/// Why a buffer is not a single DER SEQUENCE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerFramingError {
    UnexpectedEof,
    InvalidTag { got: u8 },
    InvalidLength,
    TrailingBytes { extra: usize },
}

impl fmt::Display for DerFramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of DER data"),
            Self::InvalidTag { got } => {
                write!(f, "expected SEQUENCE tag 0x{SEQUENCE:02x}, got 0x{got:02x}")
            }
            Self::InvalidLength => write!(f, "invalid DER length encoding"),
            Self::TrailingBytes { extra } => write!(f, "{extra} trailing bytes after SEQUENCE"),
        }
    }
}

impl std::error::Error for DerFramingError {}

/// Verify that `data` is exactly one definite-length DER SEQUENCE.
pub fn check_sequence_framing(data: &[u8]) -> Result<(), DerFramingError> {
    let (&tag, rest) = data.split_first().ok_or(DerFramingError::UnexpectedEof)?;
    if tag != SEQUENCE {
        return Err(DerFramingError::InvalidTag { got: tag });
    }
    let (&first, rest) = rest.split_first().ok_or(DerFramingError::UnexpectedEof)?;

    let (content_len, rest) = if first & 0x80 == 0 {
        (usize::from(first), rest)
    } else {
        let octets = usize::from(first & 0x7f);
        // 0x80 is the indefinite form, which DER forbids.
        if octets == 0 || octets > 4 {
            return Err(DerFramingError::InvalidLength);
        }
        if rest.len() < octets {
            return Err(DerFramingError::UnexpectedEof);
        }
        let (len_bytes, rest) = rest.split_at(octets);
        if len_bytes[0] == 0 {
            return Err(DerFramingError::InvalidLength);
        }
        let len = len_bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        if len < 0x80 {
            return Err(DerFramingError::InvalidLength);
        }
        (len, rest)
    };

    match rest.len().cmp(&content_len) {
        std::cmp::Ordering::Less => Err(DerFramingError::UnexpectedEof),
        std::cmp::Ordering::Greater => Err(DerFramingError::TrailingBytes {
            extra: rest.len() - content_len,
        }),
        std::cmp::Ordering::Equal => Ok(()),
    }
}
