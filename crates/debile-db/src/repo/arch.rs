//! Architecture repository.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::DbResult;

/// An architecture builders can run jobs for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArchRecord {
    pub id: uuid::Uuid,
    pub name: String,
}

#[async_trait]
pub trait ArchRepo: Send + Sync {
    /// Return the arch called `name`, creating it if needed.
    async fn ensure(&self, name: &str) -> DbResult<ArchRecord>;
    /// Look up every known arch among `names`. Unknown names are skipped.
    async fn resolve(&self, names: &[String]) -> DbResult<Vec<ArchRecord>>;
}

/// PostgreSQL implementation of ArchRepo.
pub struct PgArchRepo {
    pool: PgPool,
}

impl PgArchRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArchRepo for PgArchRepo {
    async fn ensure(&self, name: &str) -> DbResult<ArchRecord> {
        let arch = sqlx::query_as::<_, ArchRecord>(
            r#"
            INSERT INTO arches (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(arch)
    }

    async fn resolve(&self, names: &[String]) -> DbResult<Vec<ArchRecord>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let arches =
            sqlx::query_as::<_, ArchRecord>("SELECT * FROM arches WHERE name = ANY($1) ORDER BY name")
                .bind(names)
                .fetch_all(&self.pool)
                .await?;
        Ok(arches)
    }
}
