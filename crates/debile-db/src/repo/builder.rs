//! Builder repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use debile_core::ResourceId;
use debile_core::snapshot::{BuilderSnapshot, SNAPSHOT_VERSION};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// A build machine, joined with its maintainer's name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BuilderRecord {
    pub id: uuid::Uuid,
    pub name: String,
    pub key: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub maintainer_id: uuid::Uuid,
    pub maintainer: String,
    pub last_ping: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BuilderRecord {
    pub fn snapshot(&self) -> BuilderSnapshot {
        BuilderSnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id.into(),
            name: self.name.clone(),
            key: self.key.clone(),
            maintainer: self.maintainer.clone(),
            last_ping: self.last_ping,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBuilder {
    pub name: String,
    pub key: String,
    pub password_hash: String,
    pub maintainer_id: ResourceId,
}

#[async_trait]
pub trait BuilderRepo: Send + Sync {
    /// Insert a builder with `last_ping` set to now.
    /// Fails with [`DbError::Duplicate`] when the name is taken.
    async fn create(&self, builder: NewBuilder) -> DbResult<BuilderRecord>;
    async fn exists(&self, name: &str) -> DbResult<bool>;
    async fn get_by_id(&self, id: ResourceId) -> DbResult<BuilderRecord>;
    async fn get_by_name(&self, name: &str) -> DbResult<BuilderRecord>;
    /// Refresh `last_ping`.
    async fn touch(&self, id: ResourceId) -> DbResult<()>;
}

/// PostgreSQL implementation of BuilderRepo.
pub struct PgBuilderRepo {
    pool: PgPool,
}

impl PgBuilderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BuilderRepo for PgBuilderRepo {
    async fn create(&self, builder: NewBuilder) -> DbResult<BuilderRecord> {
        let id = uuid::Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO builders (id, name, key, password_hash, maintainer_id, last_ping, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&builder.name)
        .bind(&builder.key)
        .bind(&builder.password_hash)
        .bind(builder.maintainer_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("builder {}", builder.name)))?;

        self.get_by_id(id.into()).await
    }

    async fn exists(&self, name: &str) -> DbResult<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM builders WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count != 0)
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<BuilderRecord> {
        let record = sqlx::query_as::<_, BuilderRecord>("SELECT * FROM builder_view WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("builder {}", id)))?;
        Ok(record)
    }

    async fn get_by_name(&self, name: &str) -> DbResult<BuilderRecord> {
        let record =
            sqlx::query_as::<_, BuilderRecord>("SELECT * FROM builder_view WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::NotFound(format!("builder {}", name)))?;
        Ok(record)
    }

    async fn touch(&self, id: ResourceId) -> DbResult<()> {
        let result = sqlx::query("UPDATE builders SET last_ping = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("builder {}", id)));
        }
        Ok(())
    }
}
