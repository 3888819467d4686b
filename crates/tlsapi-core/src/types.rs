//! Protocol, role, encoding and lifecycle vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol version selected by a method allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// SSL 2.0. Removed; no build enables it.
    Sslv2,
    /// SSL 3.0.
    Sslv3,
    /// TLS 1.0.
    Tls10,
    /// TLS 1.1.
    Tls11,
    /// TLS 1.2.
    Tls12,
    /// DTLS 1.0.
    Dtls10,
    /// Highest version both peers support.
    Negotiate,
}

impl Protocol {
    /// Every protocol, in allocation-check order.
    pub const ALL: [Self; 7] = [
        Self::Sslv3,
        Self::Tls10,
        Self::Tls11,
        Self::Tls12,
        Self::Negotiate,
        Self::Dtls10,
        Self::Sslv2,
    ];

    /// Stable label used in sub-test names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sslv2 => "sslv2",
            Self::Sslv3 => "sslv3",
            Self::Tls10 => "tls1.0",
            Self::Tls11 => "tls1.1",
            Self::Tls12 => "tls1.2",
            Self::Dtls10 => "dtls1.0",
            Self::Negotiate => "negotiate",
        }
    }

    /// Parse a label with loose casing (`tls1.2`, `TLS12`, `tlsv1_2` ...).
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        let norm: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match norm.as_str() {
            "sslv2" | "ssl2" => Some(Self::Sslv2),
            "sslv3" | "ssl3" => Some(Self::Sslv3),
            "tls10" | "tlsv10" | "tls1" | "tlsv1" => Some(Self::Tls10),
            "tls11" | "tlsv11" => Some(Self::Tls11),
            "tls12" | "tlsv12" => Some(Self::Tls12),
            "dtls10" | "dtlsv10" | "dtls1" | "dtlsv1" => Some(Self::Dtls10),
            "negotiate" | "sslv23" | "any" => Some(Self::Negotiate),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Connection role a method is allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub const ALL: [Self; 2] = [Self::Server, Self::Client];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw encoding tag as a caller passes it; may be unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodingTag(pub i32);

impl EncodingTag {
    pub const PEM: Self = Self(1);
    pub const DER: Self = Self(2);

    /// Map the tag to a recognized encoding.
    #[must_use]
    pub const fn recognize(self) -> Option<Encoding> {
        match self.0 {
            1 => Some(Encoding::Pem),
            2 => Some(Encoding::Der),
            _ => None,
        }
    }

    /// Label used in sub-test names: `PEM`, `DER`, or the raw number.
    #[must_use]
    pub fn label(self) -> String {
        match self.recognize() {
            Some(Encoding::Pem) => String::from("PEM"),
            Some(Encoding::Der) => String::from("DER"),
            None => self.0.to_string(),
        }
    }
}

/// Recognized credential encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Pem,
    Der,
}

impl From<Encoding> for EncodingTag {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Pem => Self::PEM,
            Encoding::Der => Self::DER,
        }
    }
}

/// Lifecycle state of a context.
///
/// `create` yields `Unconfigured`; a certificate plus key yields
/// `CredentialedServer`; trust material yields `TrustedClient`; `destroy`
/// from any state yields the terminal `Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Unconfigured,
    CredentialedServer,
    TrustedClient,
    Destroyed,
}
