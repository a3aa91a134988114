//! User repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use debile_core::ResourceId;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// A human operator who maintains builders.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: NewUser) -> DbResult<UserRecord>;
    async fn get_by_id(&self, id: ResourceId) -> DbResult<UserRecord>;
    async fn get_by_name(&self, name: &str) -> DbResult<UserRecord>;
}

/// PostgreSQL implementation of UserRepo.
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, user: NewUser) -> DbResult<UserRecord> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("user {}", user.name)))?;
        Ok(record)
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<UserRecord> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("user {}", id)))?;
        Ok(record)
    }

    async fn get_by_name(&self, name: &str) -> DbResult<UserRecord> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("user {}", name)))?;
        Ok(record)
    }
}
