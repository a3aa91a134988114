//! Job scheduler - hands out, completes and takes back jobs.

use debile_core::snapshot::JobSnapshot;
use debile_core::{
    Error, Event, EventAction, EventCategory, EventSink, RequestContext, ResourceId, Result,
};
use debile_db::{ArchRepo, JobRecord, JobRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// How many candidates to fetch per selection round.
const CANDIDATE_BATCH: i64 = 16;

/// What a polling builder is able to take.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    /// Suites the builder accepts. Not used for eligibility yet.
    #[serde(default)]
    pub suites: Vec<String>,
    /// Architecture names the builder can run.
    #[serde(default)]
    pub arches: Vec<String>,
    /// Builder capabilities. Not used for eligibility yet.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl JobRequest {
    pub fn for_arches<I, S>(arches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arches: arches.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        let lists = [
            ("arch", &self.arches),
            ("suite", &self.suites),
            ("capability", &self.capabilities),
        ];
        for (what, values) in lists {
            if let Some(bad) = values
                .iter()
                .find(|v| v.trim().is_empty() || v.chars().any(char::is_whitespace))
            {
                return Err(Error::Validation(format!("malformed {} name: {:?}", what, bad)));
            }
        }
        Ok(())
    }
}

/// Assigns jobs to builders and tracks their lifecycle.
pub struct JobScheduler {
    jobs: Arc<dyn JobRepo>,
    arches: Arc<dyn ArchRepo>,
    events: Arc<dyn EventSink>,
}

impl JobScheduler {
    pub fn new(
        jobs: Arc<dyn JobRepo>,
        arches: Arc<dyn ArchRepo>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            jobs,
            arches,
            events,
        }
    }

    /// Claim the oldest eligible job for the calling builder.
    ///
    /// Returns `None` when nothing is eligible. Losing a claim race to
    /// another builder is retried against the remaining candidates.
    pub async fn get_next_job(
        &self,
        ctx: &RequestContext,
        request: &JobRequest,
    ) -> Result<Option<JobSnapshot>> {
        let (builder_id, builder) = ctx.require_builder()?;
        request.validate()?;

        let arch_ids: Vec<ResourceId> = self
            .arches
            .resolve(&request.arches)
            .await?
            .into_iter()
            .map(|a| a.id.into())
            .collect();

        if arch_ids.is_empty() {
            debug!(%builder, arches = ?request.arches, "No known arches requested");
            return Ok(None);
        }

        loop {
            let candidates = self.jobs.find_eligible(&arch_ids, CANDIDATE_BATCH).await?;
            if candidates.is_empty() {
                debug!(%builder, arches = ?request.arches, "No eligible jobs");
                return Ok(None);
            }

            for candidate in candidates {
                let job_id = ResourceId::from(candidate.id);
                if !self.jobs.try_claim(job_id, builder_id).await? {
                    debug!(%job_id, %builder, "Lost claim race, trying next candidate");
                    continue;
                }

                let job = self.jobs.get_by_id(job_id).await?;
                let snapshot = job.snapshot();
                info!(%job_id, job = %job.name, arch = %job.arch, %builder, "Assigned job");
                self.events
                    .emit(Event::new(EventAction::Start, EventCategory::Job, &snapshot));
                return Ok(Some(snapshot));
            }
        }
    }

    /// Record that the calling builder finished a job.
    ///
    /// Closing an already-finished job succeeds without changing it.
    pub async fn close_job(
        &self,
        ctx: &RequestContext,
        job_id: ResourceId,
        failed: bool,
    ) -> Result<bool> {
        let (builder_id, builder) = ctx.require_builder()?;
        let job = self.jobs.get_by_id(job_id).await?;

        if job.is_finished() {
            debug!(%job_id, %builder, "Job already finished");
            return Ok(true);
        }
        ensure_owner(&job, builder_id)?;

        if !self.jobs.mark_finished(job_id, builder_id).await? {
            // Changed between read and update.
            let job = self.jobs.get_by_id(job_id).await?;
            if job.is_finished() {
                return Ok(true);
            }
            ensure_owner(&job, builder_id)?;
            return Err(Error::InvalidState(format!("job {} could not be finished", job_id)));
        }

        let job = self.jobs.get_by_id(job_id).await?;
        info!(%job_id, job = %job.name, %builder, failed, "Job finished");
        self.events.emit(
            Event::new(EventAction::Complete, EventCategory::Job, &job.snapshot())
                .with_field("failed", json!(failed)),
        );
        Ok(true)
    }

    /// Give a job back to the pool.
    ///
    /// Forfeiting an unassigned job succeeds without changing it; finished
    /// jobs cannot be forfeited.
    pub async fn forfeit_job(&self, ctx: &RequestContext, job_id: ResourceId) -> Result<bool> {
        let (builder_id, builder) = ctx.require_builder()?;
        let job = self.jobs.get_by_id(job_id).await?;

        if job.is_finished() {
            return Err(Error::InvalidState(format!("job {} is already finished", job_id)));
        }
        if !job.is_assigned() {
            debug!(%job_id, %builder, "Job not assigned, nothing to forfeit");
            return Ok(true);
        }
        ensure_owner(&job, builder_id)?;

        if !self.jobs.release(job_id, builder_id).await? {
            let job = self.jobs.get_by_id(job_id).await?;
            if job.is_finished() {
                return Err(Error::InvalidState(format!("job {} is already finished", job_id)));
            }
            if !job.is_assigned() {
                return Ok(true);
            }
            ensure_owner(&job, builder_id)?;
            return Err(Error::InvalidState(format!("job {} could not be released", job_id)));
        }

        let job = self.jobs.get_by_id(job_id).await?;
        info!(%job_id, job = %job.name, %builder, "Job forfeited");
        self.events.emit(
            Event::new(EventAction::Abort, EventCategory::Job, &job.snapshot())
                .with_field("forfeited_by", json!(builder)),
        );
        Ok(true)
    }
}

fn ensure_owner(job: &JobRecord, builder_id: ResourceId) -> Result<()> {
    match job.builder_id {
        None => Err(Error::InvalidState(format!("job {} is not assigned", job.id))),
        Some(owner) if owner == *builder_id.as_uuid() => Ok(()),
        Some(_) => Err(Error::Forbidden(format!(
            "job {} is assigned to another builder",
            job.id
        ))),
    }
}
