//! In-memory entity store.
//!
//! Implements every repository trait over a single lock-protected state.
//! Writers hold the lock for the whole conditional update, which gives the
//! same claim atomicity as the PostgreSQL `UPDATE ... WHERE` statements.
//! Rows are kept in insertion order, which is the submission order used by
//! [`JobRepo::find_eligible`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use debile_core::ResourceId;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repo::*;
use crate::{DbError, DbResult};

#[derive(Debug, Clone)]
struct JobRow {
    id: Uuid,
    name: String,
    check_id: Option<Uuid>,
    arch_id: Uuid,
    affinity_id: Option<Uuid>,
    source_id: Uuid,
    binary_id: Option<Uuid>,
    builder_id: Option<Uuid>,
    assigned_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct BuilderRow {
    id: Uuid,
    name: String,
    key: String,
    password_hash: String,
    maintainer_id: Uuid,
    last_ping: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct BinaryRow {
    id: Uuid,
    name: String,
    version: String,
    source_id: Uuid,
    arch_id: Uuid,
    build_job_id: Option<Uuid>,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    arches: Vec<ArchRecord>,
    users: Vec<UserRecord>,
    builders: Vec<BuilderRow>,
    sources: Vec<SourceRecord>,
    binaries: Vec<BinaryRow>,
    checks: Vec<CheckRecord>,
    jobs: Vec<JobRow>,
    /// (dependent job, prerequisite job)
    dependencies: Vec<(Uuid, Uuid)>,
}

impl State {
    fn arch_name(&self, id: Uuid) -> Option<&str> {
        self.arches
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.name.as_str())
    }

    fn job(&self, id: Uuid) -> Option<&JobRow> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn job_mut(&mut self, id: Uuid) -> Option<&mut JobRow> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    fn job_record(&self, row: &JobRow) -> JobRecord {
        JobRecord {
            id: row.id,
            name: row.name.clone(),
            check_id: row.check_id,
            check_name: row.check_id.and_then(|id| {
                self.checks
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.name.clone())
            }),
            arch_id: row.arch_id,
            arch: self.arch_name(row.arch_id).unwrap_or_default().to_string(),
            affinity_id: row.affinity_id,
            affinity: row
                .affinity_id
                .and_then(|id| self.arch_name(id))
                .map(str::to_string),
            source_id: row.source_id,
            binary_id: row.binary_id,
            builder_id: row.builder_id,
            builder: row.builder_id.and_then(|id| {
                self.builders
                    .iter()
                    .find(|b| b.id == id)
                    .map(|b| b.name.clone())
            }),
            assigned_at: row.assigned_at,
            finished_at: row.finished_at,
            created_at: row.created_at,
        }
    }

    fn builder_record(&self, row: &BuilderRow) -> BuilderRecord {
        BuilderRecord {
            id: row.id,
            name: row.name.clone(),
            key: row.key.clone(),
            password_hash: row.password_hash.clone(),
            maintainer_id: row.maintainer_id,
            maintainer: self
                .users
                .iter()
                .find(|u| u.id == row.maintainer_id)
                .map(|u| u.name.clone())
                .unwrap_or_default(),
            last_ping: row.last_ping,
            created_at: row.created_at,
        }
    }

    fn binary_record(&self, row: &BinaryRow) -> BinaryRecord {
        BinaryRecord {
            id: row.id,
            name: row.name.clone(),
            version: row.version.clone(),
            source_id: row.source_id,
            arch_id: row.arch_id,
            arch: self.arch_name(row.arch_id).unwrap_or_default().to_string(),
            build_job_id: row.build_job_id,
            uploaded_at: row.uploaded_at,
        }
    }

    fn unresolved(&self, job_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.dependencies
            .iter()
            .filter(move |(dependent, _)| *dependent == job_id)
            .filter_map(|(_, prerequisite)| self.job(*prerequisite))
            .filter(|p| p.finished_at.is_none())
            .map(|p| p.id)
    }
}

/// Entity store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchRepo for MemoryStore {
    async fn ensure(&self, name: &str) -> DbResult<ArchRecord> {
        let mut state = self.state.write().await;
        if let Some(arch) = state.arches.iter().find(|a| a.name == name) {
            return Ok(arch.clone());
        }
        let arch = ArchRecord {
            id: Uuid::now_v7(),
            name: name.to_string(),
        };
        state.arches.push(arch.clone());
        Ok(arch)
    }

    async fn resolve(&self, names: &[String]) -> DbResult<Vec<ArchRecord>> {
        let state = self.state.read().await;
        let mut arches: Vec<ArchRecord> = state
            .arches
            .iter()
            .filter(|a| names.contains(&a.name))
            .cloned()
            .collect();
        arches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(arches)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, user: NewUser) -> DbResult<UserRecord> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.name == user.name) {
            return Err(DbError::Duplicate(format!("user {}", user.name)));
        }
        let record = UserRecord {
            id: Uuid::now_v7(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<UserRecord> {
        let state = self.state.read().await;
        state
            .users
            .iter()
            .find(|u| u.id == *id.as_uuid())
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("user {}", id)))
    }

    async fn get_by_name(&self, name: &str) -> DbResult<UserRecord> {
        let state = self.state.read().await;
        state
            .users
            .iter()
            .find(|u| u.name == name)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("user {}", name)))
    }
}

#[async_trait]
impl BuilderRepo for MemoryStore {
    async fn create(&self, builder: NewBuilder) -> DbResult<BuilderRecord> {
        let mut state = self.state.write().await;
        if state.builders.iter().any(|b| b.name == builder.name) {
            return Err(DbError::Duplicate(format!("builder {}", builder.name)));
        }
        if !state
            .users
            .iter()
            .any(|u| u.id == *builder.maintainer_id.as_uuid())
        {
            return Err(DbError::NotFound(format!("user {}", builder.maintainer_id)));
        }
        let now = Utc::now();
        let row = BuilderRow {
            id: Uuid::now_v7(),
            name: builder.name,
            key: builder.key,
            password_hash: builder.password_hash,
            maintainer_id: builder.maintainer_id.into(),
            last_ping: now,
            created_at: now,
        };
        let record = state.builder_record(&row);
        state.builders.push(row);
        Ok(record)
    }

    async fn exists(&self, name: &str) -> DbResult<bool> {
        let state = self.state.read().await;
        Ok(state.builders.iter().any(|b| b.name == name))
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<BuilderRecord> {
        let state = self.state.read().await;
        state
            .builders
            .iter()
            .find(|b| b.id == *id.as_uuid())
            .map(|b| state.builder_record(b))
            .ok_or_else(|| DbError::NotFound(format!("builder {}", id)))
    }

    async fn get_by_name(&self, name: &str) -> DbResult<BuilderRecord> {
        let state = self.state.read().await;
        state
            .builders
            .iter()
            .find(|b| b.name == name)
            .map(|b| state.builder_record(b))
            .ok_or_else(|| DbError::NotFound(format!("builder {}", name)))
    }

    async fn touch(&self, id: ResourceId) -> DbResult<()> {
        let mut state = self.state.write().await;
        let builder = state
            .builders
            .iter_mut()
            .find(|b| b.id == *id.as_uuid())
            .ok_or_else(|| DbError::NotFound(format!("builder {}", id)))?;
        builder.last_ping = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl PackageRepo for MemoryStore {
    async fn create_source(&self, source: NewSource) -> DbResult<SourceRecord> {
        let mut state = self.state.write().await;
        let record = SourceRecord {
            id: Uuid::now_v7(),
            name: source.name,
            version: source.version,
            group_name: source.group_name,
            suite: source.suite,
            component: source.component,
            uploaded_at: Utc::now(),
        };
        state.sources.push(record.clone());
        Ok(record)
    }

    async fn get_source(&self, id: ResourceId) -> DbResult<SourceRecord> {
        let state = self.state.read().await;
        state
            .sources
            .iter()
            .find(|s| s.id == *id.as_uuid())
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("source {}", id)))
    }

    async fn create_binary(&self, binary: NewBinary) -> DbResult<BinaryRecord> {
        let mut state = self.state.write().await;
        if state.arch_name(binary.arch_id.into()).is_none() {
            return Err(DbError::NotFound(format!("arch {}", binary.arch_id)));
        }
        let row = BinaryRow {
            id: Uuid::now_v7(),
            name: binary.name,
            version: binary.version,
            source_id: binary.source_id.into(),
            arch_id: binary.arch_id.into(),
            build_job_id: binary.build_job_id.map(Uuid::from),
            uploaded_at: Utc::now(),
        };
        let record = state.binary_record(&row);
        state.binaries.push(row);
        Ok(record)
    }

    async fn get_binary(&self, id: ResourceId) -> DbResult<BinaryRecord> {
        let state = self.state.read().await;
        state
            .binaries
            .iter()
            .find(|b| b.id == *id.as_uuid())
            .map(|b| state.binary_record(b))
            .ok_or_else(|| DbError::NotFound(format!("binary {}", id)))
    }

    async fn create_check(&self, check: NewCheck) -> DbResult<CheckRecord> {
        let mut state = self.state.write().await;
        if state.checks.iter().any(|c| c.name == check.name) {
            return Err(DbError::Duplicate(format!("check {}", check.name)));
        }
        let record = CheckRecord {
            id: Uuid::now_v7(),
            name: check.name,
            on_source: check.on_source,
            on_binary: check.on_binary,
            is_build: check.is_build,
        };
        state.checks.push(record.clone());
        Ok(record)
    }

    async fn get_check_by_name(&self, name: &str) -> DbResult<CheckRecord> {
        let state = self.state.read().await;
        state
            .checks
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("check {}", name)))
    }
}

#[async_trait]
impl JobRepo for MemoryStore {
    async fn create(&self, job: NewJob) -> DbResult<JobRecord> {
        let mut state = self.state.write().await;
        if state.arch_name(job.arch_id.into()).is_none() {
            return Err(DbError::NotFound(format!("arch {}", job.arch_id)));
        }
        if let Some(affinity) = job.affinity_id {
            if state.arch_name(affinity.into()).is_none() {
                return Err(DbError::NotFound(format!("arch {}", affinity)));
            }
        }
        let row = JobRow {
            id: Uuid::now_v7(),
            name: job.name,
            check_id: job.check_id.map(Uuid::from),
            arch_id: job.arch_id.into(),
            affinity_id: job.affinity_id.map(Uuid::from),
            source_id: job.source_id.into(),
            binary_id: job.binary_id.map(Uuid::from),
            builder_id: None,
            assigned_at: None,
            finished_at: None,
            created_at: Utc::now(),
        };
        let record = state.job_record(&row);
        state.jobs.push(row);
        Ok(record)
    }

    async fn add_dependency(&self, job_id: ResourceId, depends_on: ResourceId) -> DbResult<()> {
        let mut state = self.state.write().await;
        let (dependent, prerequisite) = (Uuid::from(job_id), Uuid::from(depends_on));
        for id in [dependent, prerequisite] {
            if state.job(id).is_none() {
                return Err(DbError::NotFound(format!("job {}", id)));
            }
        }
        if !state.dependencies.contains(&(dependent, prerequisite)) {
            state.dependencies.push((dependent, prerequisite));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: ResourceId) -> DbResult<JobRecord> {
        let state = self.state.read().await;
        state
            .job(id.into())
            .map(|row| state.job_record(row))
            .ok_or_else(|| DbError::NotFound(format!("job {}", id)))
    }

    async fn find_eligible(
        &self,
        arch_ids: &[ResourceId],
        limit: i64,
    ) -> DbResult<Vec<JobRecord>> {
        let state = self.state.read().await;
        let arch_ids: Vec<Uuid> = arch_ids.iter().map(|id| *id.as_uuid()).collect();
        let limit = usize::try_from(limit).unwrap_or(0);

        let records = state
            .jobs
            .iter()
            .filter(|j| j.assigned_at.is_none() && j.finished_at.is_none())
            .filter(|j| arch_ids.contains(&j.arch_id))
            .filter(|j| j.affinity_id.is_none_or(|a| arch_ids.contains(&a)))
            .filter(|j| state.unresolved(j.id).next().is_none())
            .take(limit)
            .map(|j| state.job_record(j))
            .collect();
        Ok(records)
    }

    async fn try_claim(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool> {
        let mut state = self.state.write().await;
        let Some(job) = state.job_mut(job_id.into()) else {
            return Ok(false);
        };
        if job.assigned_at.is_some() || job.finished_at.is_some() {
            return Ok(false);
        }
        job.assigned_at = Some(Utc::now());
        job.builder_id = Some(builder_id.into());
        Ok(true)
    }

    async fn mark_finished(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool> {
        let mut state = self.state.write().await;
        let Some(job) = state.job_mut(job_id.into()) else {
            return Ok(false);
        };
        if job.builder_id != Some(builder_id.into()) || job.finished_at.is_some() {
            return Ok(false);
        }
        job.finished_at = Some(Utc::now());
        Ok(true)
    }

    async fn release(&self, job_id: ResourceId, builder_id: ResourceId) -> DbResult<bool> {
        let mut state = self.state.write().await;
        let Some(job) = state.job_mut(job_id.into()) else {
            return Ok(false);
        };
        if job.builder_id != Some(builder_id.into()) || job.finished_at.is_some() {
            return Ok(false);
        }
        job.assigned_at = None;
        job.builder_id = None;
        Ok(true)
    }

    async fn count(&self) -> DbResult<i64> {
        let state = self.state.read().await;
        Ok(state.jobs.len() as i64)
    }
}
