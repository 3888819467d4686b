//! Handle registry for the tlsapi reference library.
//!
//! Every Method, Context, Session and trust block handed out by the library
//! is registered here with its kind, its owner and its temporal state. The
//! registry never forgets a handle: releasing marks it `Released`, so a second
//! release is observable as a double release instead of undefined behaviour.
//! [`ResourceCensus`] snapshots let callers prove that a sequence of calls
//! released exactly what it allocated.

#![forbid(unsafe_code)]

mod census;
mod registry;
mod state;

pub use census::{CensusDelta, ResourceCensus};
pub use registry::{HandleFacts, HandleMeta, HandleRegistry};
pub use state::{HandleId, HandleKind, Owner, ReleaseOutcome, TemporalState};
