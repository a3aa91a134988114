//! Job repository.
//!
//! Every state change is a conditional update: the `WHERE` clause restates
//! the state the caller observed, and the affected-row count tells whether
//! the transition happened. Callers never read-modify-write job rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use debile_core::ResourceId;
use debile_core::snapshot::{JobSnapshot, SNAPSHOT_VERSION};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// A job, joined with the names of its arch, affinity, check and builder.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    pub id: uuid::Uuid,
    pub name: String,
    pub check_id: Option<uuid::Uuid>,
    pub check_name: Option<String>,
    pub arch_id: uuid::Uuid,
    pub arch: String,
    pub affinity_id: Option<uuid::Uuid>,
    pub affinity: Option<String>,
    pub source_id: uuid::Uuid,
    pub binary_id: Option<uuid::Uuid>,
    pub builder_id: Option<uuid::Uuid>,
    pub builder: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn is_assigned(&self) -> bool {
        self.assigned_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id.into(),
            name: self.name.clone(),
            check: self.check_name.clone(),
            arch: self.arch.clone(),
            affinity: self.affinity.clone(),
            source: self.source_id.into(),
            binary: self.binary_id.map(Into::into),
            builder: self.builder.clone(),
            assigned_at: self.assigned_at,
            finished_at: self.finished_at,
            created_at: self.created_at,
        }
    }
}

/// A job as submitted, unassigned and unfinished.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub check_id: Option<ResourceId>,
    pub arch_id: ResourceId,
    pub affinity_id: Option<ResourceId>,
    pub source_id: ResourceId,
    pub binary_id: Option<ResourceId>,
}

#[async_trait]
pub trait JobRepo: Send + Sync {
    async fn create(&self, job: NewJob) -> DbResult<JobRecord>;

    /// Record that `job_id` cannot start before `depends_on` finishes.
    async fn add_dependency(&self, job_id: ResourceId, depends_on: ResourceId) -> DbResult<()>;

    async fn get_by_id(&self, id: ResourceId) -> DbResult<JobRecord>;

    /// Unassigned, unfinished jobs whose arch is in `arch_ids`, whose
    /// affinity is unset or in `arch_ids`, and whose prerequisites have all
    /// finished. Ordered by submission, at most `limit` rows.
    async fn find_eligible(
        &self,
        arch_ids: &[ResourceId],
        limit: i64,
    ) -> DbResult<Vec<JobRecord>>;

    /// Assign the job to `builder_id` if it is still unassigned and
    /// unfinished. Returns whether this call won the claim.
    async fn try_claim(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool>;

    /// Set `finished_at` if the job is assigned to `builder_id` and not yet
    /// finished. Returns whether the row changed.
    async fn mark_finished(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool>;

    /// Clear the assignment if the job is assigned to `builder_id` and not
    /// finished. Returns whether the row changed.
    async fn release(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool>;

    async fn count(&self) -> DbResult<i64>;
}

/// PostgreSQL implementation of JobRepo.
pub struct PgJobRepo {
    pool: PgPool,
}

impl PgJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepo for PgJobRepo {
    async fn create(&self, job: NewJob) -> DbResult<JobRecord> {
        let id = uuid::Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO jobs (id, name, check_id, arch_id, affinity_id, source_id, binary_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(id)
        .bind(&job.name)
        .bind(job.check_id.map(uuid::Uuid::from))
        .bind(job.arch_id.as_uuid())
        .bind(job.affinity_id.map(uuid::Uuid::from))
        .bind(job.source_id.as_uuid())
        .bind(job.binary_id.map(uuid::Uuid::from))
        .execute(&self.pool)
        .await?;

        self.get_by_id(id.into()).await
    }

    async fn add_dependency(&self, job_id: ResourceId, depends_on: ResourceId) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO job_dependencies (id, job_id, depends_on_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id, depends_on_id) DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(job_id.as_uuid())
        .bind(depends_on.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<JobRecord> {
        let record = sqlx::query_as::<_, JobRecord>("SELECT * FROM job_view WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("job {}", id)))?;
        Ok(record)
    }

    async fn find_eligible(
        &self,
        arch_ids: &[ResourceId],
        limit: i64,
    ) -> DbResult<Vec<JobRecord>> {
        if arch_ids.is_empty() {
            return Ok(Vec::new());
        }
        let arch_ids: Vec<uuid::Uuid> = arch_ids.iter().map(|id| *id.as_uuid()).collect();

        let records = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT v.*
            FROM job_view v
            WHERE v.assigned_at IS NULL
              AND v.finished_at IS NULL
              AND v.arch_id = ANY($1)
              AND (v.affinity_id IS NULL OR v.affinity_id = ANY($1))
              AND NOT EXISTS (
                  SELECT 1
                  FROM job_dependencies d
                  JOIN jobs p ON p.id = d.depends_on_id
                  WHERE d.job_id = v.id AND p.finished_at IS NULL
              )
            ORDER BY v.created_at ASC, v.id ASC
            LIMIT $2
            "#,
        )
        .bind(&arch_ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn try_claim(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET assigned_at = NOW(), builder_id = $2
            WHERE id = $1 AND assigned_at IS NULL AND finished_at IS NULL
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(builder_id.as_uuid())
        .execute(&self.pool)
        .await?;
        let claimed = result.rows_affected() == 1;
        if !claimed {
            tracing::debug!(job_id = %job_id, "Claim lost to a concurrent builder");
        }
        Ok(claimed)
    }

    async fn mark_finished(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET finished_at = NOW()
            WHERE id = $1 AND builder_id = $2 AND finished_at IS NULL
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(builder_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET assigned_at = NULL, builder_id = NULL
            WHERE id = $1 AND builder_id = $2 AND finished_at IS NULL
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(builder_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count(&self) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
