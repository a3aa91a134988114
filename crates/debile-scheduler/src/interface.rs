//! The master interface: every operation builders and operators can call.

use debile_config::RepoConfig;
use debile_core::snapshot::{BinarySnapshot, BuilderSnapshot, JobSnapshot, SourceSnapshot};
use debile_core::{Error, EventSink, KeyImporter, RequestContext, ResourceId, Result};
use debile_db::Store;
use std::sync::Arc;

use crate::{Accessors, BuilderRegistry, JobRequest, JobScheduler, MasterInfo};

/// Facade over the scheduler, builder registry and accessors.
pub struct MasterInterface {
    scheduler: JobScheduler,
    registry: BuilderRegistry,
    accessors: Accessors,
}

impl MasterInterface {
    pub fn new(
        store: &Store,
        repo: &RepoConfig,
        events: Arc<dyn EventSink>,
        keyring: Arc<dyn KeyImporter>,
    ) -> Self {
        Self {
            scheduler: JobScheduler::new(store.jobs.clone(), store.arches.clone(), events.clone()),
            registry: BuilderRegistry::new(store.builders.clone(), keyring, events),
            accessors: Accessors::new(store.jobs.clone(), store.packages.clone(), repo),
        }
    }

    pub fn builder_whoami(&self, ctx: &RequestContext) -> Result<String> {
        let (_, name) = ctx.require_builder()?;
        Ok(name.to_string())
    }

    pub fn user_whoami(&self, ctx: &RequestContext) -> Result<String> {
        let (_, name) = ctx.require_user()?;
        Ok(name.to_string())
    }

    pub async fn get_next_job(
        &self,
        ctx: &RequestContext,
        request: &JobRequest,
    ) -> Result<Option<JobSnapshot>> {
        self.scheduler.get_next_job(ctx, request).await
    }

    pub async fn close_job(
        &self,
        ctx: &RequestContext,
        job_id: ResourceId,
        failed: bool,
    ) -> Result<bool> {
        self.scheduler.close_job(ctx, job_id, failed).await
    }

    pub async fn forfeit_job(&self, ctx: &RequestContext, job_id: ResourceId) -> Result<bool> {
        self.scheduler.forfeit_job(ctx, job_id).await
    }

    pub async fn create_builder(
        &self,
        ctx: &RequestContext,
        name: &str,
        password: &str,
        key: &str,
    ) -> Result<BuilderSnapshot> {
        self.registry.create_builder(ctx, name, password, key).await
    }

    pub async fn get_source(&self, id: ResourceId) -> Result<SourceSnapshot> {
        self.accessors.get_source(id).await
    }

    pub async fn get_binary(&self, id: ResourceId) -> Result<BinarySnapshot> {
        self.accessors.get_binary(id).await
    }

    pub fn get_archive_location(&self, group: &str) -> Result<String> {
        if group.is_empty() {
            return Err(Error::Validation("group name must not be empty".to_string()));
        }
        Ok(self.accessors.get_archive_location(group))
    }

    pub fn get_info(&self) -> MasterInfo {
        self.accessors.get_info()
    }

    pub async fn job_count(&self) -> Result<i64> {
        self.accessors.job_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FingerprintKeyring;
    use crate::testing::Farm;

    fn master(farm: &Farm) -> MasterInterface {
        let repo = RepoConfig {
            url: "http://localhost".to_string(),
            archive_location: "{url}/{group}".to_string(),
        };
        MasterInterface::new(
            &farm.store,
            &repo,
            farm.sink.clone(),
            Arc::new(FingerprintKeyring),
        )
    }

    #[tokio::test]
    async fn test_whoami_per_tier() {
        let farm = Farm::new().await;
        let master = master(&farm);
        let builder = farm.builder("leliel").await;

        assert_eq!(master.builder_whoami(&builder).unwrap(), "leliel");
        assert_eq!(master.user_whoami(&farm.user).unwrap(), "paultag");
        assert!(matches!(
            master.builder_whoami(&farm.user),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            master.user_whoami(&RequestContext::anonymous()),
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_full_job_lifecycle() {
        let farm = Farm::new().await;
        let master = master(&farm);
        let builder = farm.builder("leliel").await;
        let job_id = farm.job("lintian", "amd64", None).await;
        let request = JobRequest::for_arches(["amd64"]);

        let job = master.get_next_job(&builder, &request).await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert!(master.forfeit_job(&builder, job_id).await.unwrap());
        let job = master.get_next_job(&builder, &request).await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert!(master.close_job(&builder, job_id, false).await.unwrap());
        assert!(master.get_next_job(&builder, &request).await.unwrap().is_none());
        assert_eq!(master.job_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_group_is_rejected() {
        let farm = Farm::new().await;
        let master = master(&farm);
        assert!(matches!(
            master.get_archive_location(""),
            Err(Error::Validation(_))
        ));
        assert_eq!(
            master.get_archive_location("default").unwrap(),
            "http://localhost/default"
        );
    }
}
