//! Per-context bookkeeping of the reference library.

use tlsapi_registry::HandleId;

use crate::api::ContextSnapshot;
use crate::material::Material;
use crate::types::{LifecycleState, Protocol, Role};

#[derive(Debug)]
pub(crate) struct TrustSlot {
    pub(crate) block: HandleId,
    pub(crate) material: Material,
}

#[derive(Debug)]
pub(crate) struct ContextRecord {
    pub(crate) method: HandleId,
    pub(crate) protocol: Protocol,
    pub(crate) role: Role,
    pub(crate) certificate: Option<Material>,
    pub(crate) private_key: Option<Material>,
    pub(crate) trust: Option<TrustSlot>,
    pub(crate) trust_loads: u32,
    pub(crate) destroyed: bool,
}

impl ContextRecord {
    pub(crate) fn new(method: HandleId, protocol: Protocol, role: Role) -> Self {
        Self {
            method,
            protocol,
            role,
            certificate: None,
            private_key: None,
            trust: None,
            trust_loads: 0,
            destroyed: false,
        }
    }

    pub(crate) fn has_credentials(&self) -> bool {
        self.certificate.is_some() && self.private_key.is_some()
    }

    pub(crate) fn state(&self) -> LifecycleState {
        if self.destroyed {
            LifecycleState::Destroyed
        } else if self.has_credentials() {
            LifecycleState::CredentialedServer
        } else if self.trust.is_some() {
            LifecycleState::TrustedClient
        } else {
            LifecycleState::Unconfigured
        }
    }

    pub(crate) fn snapshot(&self, method_live: bool) -> ContextSnapshot {
        ContextSnapshot {
            protocol: self.protocol,
            role: self.role,
            state: self.state(),
            certificate: self.certificate.as_ref().map(|m| m.fingerprint().to_owned()),
            private_key: self.private_key.as_ref().map(|m| m.fingerprint().to_owned()),
            trust: self.trust.as_ref().map(|t| t.material.fingerprint().to_owned()),
            trust_loads: self.trust_loads,
            method_live,
        }
    }
}
