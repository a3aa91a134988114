//! Core domain types and traits for the Debile build master.
//!
//! This crate contains:
//! - Resource identifiers and the error taxonomy
//! - Wire snapshots for jobs, builders, sources and binaries
//! - Lifecycle events and the event sink trait
//! - Caller identity and authentication tiers
//! - Credential helpers and the key importer trait

pub mod credential;
pub mod error;
pub mod event;
pub mod id;
pub mod identity;
pub mod keyring;
pub mod snapshot;

pub use error::{Error, Result};
pub use event::{Event, EventAction, EventCategory, EventSink};
pub use id::ResourceId;
pub use identity::{AuthTier, Caller, RequestContext};
pub use keyring::{KeyId, KeyImporter};
