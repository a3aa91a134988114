//! Job scheduling and builder registry for the Debile build master.
//!
//! Hands out jobs to polling builders. Claims are conditional updates in
//! the entity store, so concurrent builders never share a job.

pub mod accessors;
pub mod emitter;
pub mod interface;
pub mod keyring;
pub mod registry;
pub mod scheduler;

pub use accessors::{Accessors, MasterInfo};
pub use emitter::{BroadcastEmitter, FanoutEmitter, LogEmitter};
pub use interface::MasterInterface;
pub use keyring::FingerprintKeyring;
pub use registry::BuilderRegistry;
pub use scheduler::{JobRequest, JobScheduler};

#[cfg(test)]
pub(crate) mod testing;
