//! Handle metadata registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::census::ResourceCensus;
use crate::state::{HandleId, HandleKind, Owner, ReleaseOutcome, TemporalState};

/// Metadata for a tracked handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleMeta {
    /// Handle identifier.
    pub id: HandleId,
    /// Kind of object behind the handle.
    pub kind: HandleKind,
    /// Current owner.
    pub owner: Owner,
    /// Bumped on every state transition.
    pub generation: u64,
    /// Current temporal state.
    pub state: TemporalState,
}

/// Derived facts about an arbitrary handle id according to registry metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleFacts {
    /// Handle identifier that was classified.
    pub id: HandleId,
    /// Kind, if the handle was ever issued.
    pub kind: Option<HandleKind>,
    /// Temporal state classification.
    pub temporal: TemporalState,
    /// Owner, if the handle was ever issued.
    pub owner: Option<Owner>,
}

impl HandleFacts {
    /// Facts for a handle the registry never issued.
    #[must_use]
    pub fn unknown(id: HandleId) -> Self {
        Self {
            id,
            kind: None,
            temporal: TemporalState::Unknown,
            owner: None,
        }
    }

    /// Returns true if the handle is live and of the given kind.
    #[must_use]
    pub fn is_live(&self, kind: HandleKind) -> bool {
        self.kind == Some(kind) && self.temporal == TemporalState::Live
    }
}

/// Concurrent handle registry.
///
/// Released handles stay in the table as tombstones so that late use and
/// double release can be classified.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    entries: RwLock<HashMap<HandleId, HandleMeta>>,
    double_releases: AtomicU64,
    unknown_releases: AtomicU64,
}

impl HandleRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh live handle.
    pub fn register(&self, kind: HandleKind, owner: Owner) -> HandleId {
        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let meta = HandleMeta {
            id,
            kind,
            owner,
            generation: 1,
            state: TemporalState::Live,
        };
        self.entries.write().insert(id, meta);
        id
    }

    /// Release a handle.
    pub fn release(&self, id: HandleId) -> ReleaseOutcome {
        let mut entries = self.entries.write();
        match entries.get_mut(&id) {
            Some(meta) if meta.state == TemporalState::Live => {
                meta.state = TemporalState::Released;
                meta.generation = meta.generation.saturating_add(1);
                ReleaseOutcome::Released
            }
            Some(_) => {
                self.double_releases.fetch_add(1, Ordering::Relaxed);
                ReleaseOutcome::AlreadyReleased
            }
            None => {
                self.unknown_releases.fetch_add(1, Ordering::Relaxed);
                ReleaseOutcome::Unknown
            }
        }
    }

    /// Move a live handle to a new owner. Returns false if the handle is not live.
    pub fn transfer(&self, id: HandleId, owner: Owner) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(&id) {
            Some(meta) if meta.state == TemporalState::Live => {
                meta.owner = owner;
                meta.generation = meta.generation.saturating_add(1);
                true
            }
            _ => false,
        }
    }

    /// Look up metadata for `id` if it was ever issued.
    #[must_use]
    pub fn lookup(&self, id: HandleId) -> Option<HandleMeta> {
        self.entries.read().get(&id).copied()
    }

    /// Classify a handle id under registry facts.
    #[must_use]
    pub fn classify(&self, id: HandleId) -> HandleFacts {
        match self.lookup(id) {
            Some(meta) => HandleFacts {
                id,
                kind: Some(meta.kind),
                temporal: meta.state,
                owner: Some(meta.owner),
            },
            None => HandleFacts::unknown(id),
        }
    }

    /// Live handles currently owned by `owner`, in id order.
    #[must_use]
    pub fn live_owned_by(&self, owner: Owner) -> Vec<HandleId> {
        let mut ids: Vec<HandleId> = self
            .entries
            .read()
            .values()
            .filter(|meta| meta.state == TemporalState::Live && meta.owner == owner)
            .map(|meta| meta.id)
            .collect();
        ids.sort();
        ids
    }

    /// Count live handles per kind plus the release anomaly counters.
    #[must_use]
    pub fn census(&self) -> ResourceCensus {
        let mut census = ResourceCensus::default();
        for meta in self.entries.read().values() {
            if meta.state == TemporalState::Live {
                census.bump(meta.kind);
            }
        }
        census.double_releases = self.double_releases.load(Ordering::Relaxed);
        census.unknown_releases = self.unknown_releases.load(Ordering::Relaxed);
        census
    }
}
