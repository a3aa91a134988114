//! Read-only lookups for builders and operators.

use debile_config::{ArchiveTemplate, RepoConfig};
use debile_core::snapshot::{BinarySnapshot, SourceSnapshot};
use debile_core::{ResourceId, Result};
use debile_db::{JobRepo, PackageRepo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Static description of the master, as returned by `get_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterInfo {
    pub repo: RepoInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub base: String,
}

pub struct Accessors {
    jobs: Arc<dyn JobRepo>,
    packages: Arc<dyn PackageRepo>,
    repo_url: String,
    archive: ArchiveTemplate,
}

impl Accessors {
    pub fn new(
        jobs: Arc<dyn JobRepo>,
        packages: Arc<dyn PackageRepo>,
        repo: &RepoConfig,
    ) -> Self {
        Self {
            jobs,
            packages,
            repo_url: repo.url.clone(),
            archive: repo.archive_template(),
        }
    }

    pub async fn get_source(&self, id: ResourceId) -> Result<SourceSnapshot> {
        Ok(self.packages.get_source(id).await?.snapshot())
    }

    pub async fn get_binary(&self, id: ResourceId) -> Result<BinarySnapshot> {
        Ok(self.packages.get_binary(id).await?.snapshot())
    }

    pub fn get_archive_location(&self, group: &str) -> String {
        self.archive.render(&self.repo_url, group)
    }

    pub fn get_info(&self) -> MasterInfo {
        MasterInfo {
            repo: RepoInfo {
                base: self.repo_url.clone(),
            },
        }
    }

    pub async fn job_count(&self) -> Result<i64> {
        Ok(self.jobs.count().await?)
    }
}
