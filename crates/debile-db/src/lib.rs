//! Entity store for the Debile build master.
//!
//! Provides repository traits with PostgreSQL and in-memory implementations.

pub mod error;
pub mod memory;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use repo::*;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

/// Create a new database connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Handles to every repository, sharing one backend.
#[derive(Clone)]
pub struct Store {
    pub jobs: Arc<dyn JobRepo>,
    pub arches: Arc<dyn ArchRepo>,
    pub builders: Arc<dyn BuilderRepo>,
    pub users: Arc<dyn UserRepo>,
    pub packages: Arc<dyn PackageRepo>,
    pool: Option<PgPool>,
}

impl Store {
    /// Store backed by PostgreSQL.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            jobs: Arc::new(PgJobRepo::new(pool.clone())),
            arches: Arc::new(PgArchRepo::new(pool.clone())),
            builders: Arc::new(PgBuilderRepo::new(pool.clone())),
            users: Arc::new(PgUserRepo::new(pool.clone())),
            packages: Arc::new(PgPackageRepo::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Store backed by a shared in-memory state.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            jobs: store.clone(),
            arches: store.clone(),
            builders: store.clone(),
            users: store.clone(),
            packages: store,
            pool: None,
        }
    }

    /// Fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        Self::memory(Arc::new(MemoryStore::new()))
    }

    /// Check that the backend answers.
    pub async fn ping(&self) -> DbResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
