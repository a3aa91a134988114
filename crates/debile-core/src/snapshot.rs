//! Public wire snapshots of master entities.
//!
//! Snapshots are the only shape in which entities leave the master, both as
//! RPC results and as event payloads. Each carries a `version` field so
//! consumers can detect layout changes; secrets never appear in them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Public view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    pub id: ResourceId,
    pub name: String,
    /// Name of the check this job runs, if any.
    pub check: Option<String>,
    /// Architecture the job must run on.
    pub arch: String,
    /// Preferred architecture class, if any.
    pub affinity: Option<String>,
    pub source: ResourceId,
    pub binary: Option<ResourceId>,
    /// Name of the builder currently owning the job.
    pub builder: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub fn is_assigned(&self) -> bool {
        self.assigned_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Public view of a builder. The password digest is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    pub id: ResourceId,
    pub name: String,
    /// Key id returned by the key importer.
    pub key: String,
    /// Name of the owning user.
    pub maintainer: String,
    pub last_ping: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    pub id: ResourceId,
    pub name: String,
    #[serde(rename = "source_version")]
    pub package_version: String,
    pub group: String,
    pub suite: String,
    pub component: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    pub id: ResourceId,
    pub name: String,
    #[serde(rename = "binary_version")]
    pub package_version: String,
    pub source: ResourceId,
    pub arch: String,
    pub build_job: Option<ResourceId>,
    pub uploaded_at: DateTime<Utc>,
}
