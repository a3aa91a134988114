//! KDL configuration parsing for the Debile build master.
//!
//! This crate handles:
//! - Master configuration (repository, database, server, events, arches)
//! - Archive location templating

pub mod error;
pub mod master;
pub mod template;

pub use error::{ConfigError, ConfigResult};
pub use master::{
    CheckConfig, DatabaseConfig, EventsConfig, MasterConfig, RepoConfig, ServerConfig,
};
pub use template::ArchiveTemplate;
