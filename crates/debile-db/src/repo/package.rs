//! Source, binary and check repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use debile_core::ResourceId;
use debile_core::snapshot::{BinarySnapshot, SNAPSHOT_VERSION, SourceSnapshot};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// An uploaded source package.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceRecord {
    pub id: uuid::Uuid,
    pub name: String,
    pub version: String,
    pub group_name: String,
    pub suite: String,
    pub component: String,
    pub uploaded_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id.into(),
            name: self.name.clone(),
            package_version: self.version.clone(),
            group: self.group_name.clone(),
            suite: self.suite.clone(),
            component: self.component.clone(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// A built binary package, joined with its arch name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BinaryRecord {
    pub id: uuid::Uuid,
    pub name: String,
    pub version: String,
    pub source_id: uuid::Uuid,
    pub arch_id: uuid::Uuid,
    pub arch: String,
    pub build_job_id: Option<uuid::Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

impl BinaryRecord {
    pub fn snapshot(&self) -> BinarySnapshot {
        BinarySnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id.into(),
            name: self.name.clone(),
            package_version: self.version.clone(),
            source: self.source_id.into(),
            arch: self.arch.clone(),
            build_job: self.build_job_id.map(Into::into),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// A QA check or build step jobs can run.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckRecord {
    pub id: uuid::Uuid,
    pub name: String,
    /// Runs against source packages.
    pub on_source: bool,
    /// Runs against binary packages.
    pub on_binary: bool,
    /// Produces binaries.
    pub is_build: bool,
}

#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub version: String,
    pub group_name: String,
    pub suite: String,
    pub component: String,
}

#[derive(Debug, Clone)]
pub struct NewBinary {
    pub name: String,
    pub version: String,
    pub source_id: ResourceId,
    pub arch_id: ResourceId,
    pub build_job_id: Option<ResourceId>,
}

#[derive(Debug, Clone)]
pub struct NewCheck {
    pub name: String,
    pub on_source: bool,
    pub on_binary: bool,
    pub is_build: bool,
}

#[async_trait]
pub trait PackageRepo: Send + Sync {
    async fn create_source(&self, source: NewSource) -> DbResult<SourceRecord>;
    async fn get_source(&self, id: ResourceId) -> DbResult<SourceRecord>;
    async fn create_binary(&self, binary: NewBinary) -> DbResult<BinaryRecord>;
    async fn get_binary(&self, id: ResourceId) -> DbResult<BinaryRecord>;
    async fn create_check(&self, check: NewCheck) -> DbResult<CheckRecord>;
    async fn get_check_by_name(&self, name: &str) -> DbResult<CheckRecord>;
}

/// PostgreSQL implementation of PackageRepo.
pub struct PgPackageRepo {
    pool: PgPool,
}

impl PgPackageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackageRepo for PgPackageRepo {
    async fn create_source(&self, source: NewSource) -> DbResult<SourceRecord> {
        let record = sqlx::query_as::<_, SourceRecord>(
            r#"
            INSERT INTO sources (id, name, version, group_name, suite, component, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(&source.name)
        .bind(&source.version)
        .bind(&source.group_name)
        .bind(&source.suite)
        .bind(&source.component)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get_source(&self, id: ResourceId) -> DbResult<SourceRecord> {
        let record = sqlx::query_as::<_, SourceRecord>("SELECT * FROM sources WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("source {}", id)))?;
        Ok(record)
    }

    async fn create_binary(&self, binary: NewBinary) -> DbResult<BinaryRecord> {
        let id = uuid::Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO binaries (id, name, version, source_id, arch_id, build_job_id, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(id)
        .bind(&binary.name)
        .bind(&binary.version)
        .bind(binary.source_id.as_uuid())
        .bind(binary.arch_id.as_uuid())
        .bind(binary.build_job_id.map(uuid::Uuid::from))
        .execute(&self.pool)
        .await?;

        self.get_binary(id.into()).await
    }

    async fn get_binary(&self, id: ResourceId) -> DbResult<BinaryRecord> {
        let record = sqlx::query_as::<_, BinaryRecord>("SELECT * FROM binary_view WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("binary {}", id)))?;
        Ok(record)
    }

    async fn create_check(&self, check: NewCheck) -> DbResult<CheckRecord> {
        let record = sqlx::query_as::<_, CheckRecord>(
            r#"
            INSERT INTO checks (id, name, on_source, on_binary, is_build)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(&check.name)
        .bind(check.on_source)
        .bind(check.on_binary)
        .bind(check.is_build)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("check {}", check.name)))?;
        Ok(record)
    }

    async fn get_check_by_name(&self, name: &str) -> DbResult<CheckRecord> {
        let record = sqlx::query_as::<_, CheckRecord>("SELECT * FROM checks WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("check {}", name)))?;
        Ok(record)
    }
}
