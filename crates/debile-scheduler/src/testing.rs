//! Shared fixtures for scheduler tests.

use debile_core::credential::hash_password;
use debile_core::{Event, EventAction, EventCategory, EventSink, RequestContext, ResourceId};
use debile_db::{DbError, NewBuilder, NewCheck, NewJob, NewSource, NewUser, Store};
use std::sync::{Arc, Mutex};

/// Sink that remembers every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<(EventAction, EventCategory)> {
        self.events()
            .into_iter()
            .map(|e| (e.action, e.category))
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

/// In-memory store seeded with arches, one user and one source.
pub struct Farm {
    pub store: Store,
    pub sink: Arc<RecordingSink>,
    pub source: ResourceId,
    pub user: RequestContext,
}

impl Farm {
    pub async fn new() -> Self {
        let store = Store::in_memory();
        for arch in ["amd64", "i386", "arm64", "all"] {
            store.arches.ensure(arch).await.unwrap();
        }
        let source = store
            .packages
            .create_source(NewSource {
                name: "fluxbox".to_string(),
                version: "1.3.5-2".to_string(),
                group_name: "default".to_string(),
                suite: "unstable".to_string(),
                component: "main".to_string(),
            })
            .await
            .unwrap();
        let user = store
            .users
            .create(NewUser {
                name: "paultag".to_string(),
                email: "paultag@example.org".to_string(),
                password_hash: hash_password("user-secret"),
            })
            .await
            .unwrap();

        Self {
            store,
            sink: Arc::new(RecordingSink::default()),
            source: source.id.into(),
            user: RequestContext::user(user.id.into(), user.name),
        }
    }

    pub async fn arch(&self, name: &str) -> ResourceId {
        self.store.arches.ensure(name).await.unwrap().id.into()
    }

    /// Register a builder directly in the store and return its context.
    pub async fn builder(&self, name: &str) -> RequestContext {
        let (user_id, _) = self.user.require_user().unwrap();
        let record = self
            .store
            .builders
            .create(NewBuilder {
                name: name.to_string(),
                key: format!("KEY-{}", name),
                password_hash: hash_password("builder-secret"),
                maintainer_id: user_id,
            })
            .await
            .unwrap();
        RequestContext::builder(record.id.into(), record.name)
    }

    /// Return the check called `name`, registering it on first use.
    pub async fn check(&self, name: &str) -> ResourceId {
        match self.store.packages.get_check_by_name(name).await {
            Ok(check) => check.id.into(),
            Err(DbError::NotFound(_)) => self
                .store
                .packages
                .create_check(NewCheck {
                    name: name.to_string(),
                    on_source: true,
                    on_binary: false,
                    is_build: false,
                })
                .await
                .unwrap()
                .id
                .into(),
            Err(e) => panic!("check lookup failed: {e}"),
        }
    }

    pub async fn job(&self, name: &str, arch: &str, affinity: Option<&str>) -> ResourceId {
        self.insert_job(name, arch, affinity, None).await
    }

    /// A job running `check` on the farm's source.
    pub async fn check_job(&self, name: &str, arch: &str, check: &str) -> ResourceId {
        let check_id = self.check(check).await;
        self.insert_job(name, arch, None, Some(check_id)).await
    }

    async fn insert_job(
        &self,
        name: &str,
        arch: &str,
        affinity: Option<&str>,
        check_id: Option<ResourceId>,
    ) -> ResourceId {
        let arch_id = self.arch(arch).await;
        let affinity_id = match affinity {
            Some(a) => Some(self.arch(a).await),
            None => None,
        };
        self.store
            .jobs
            .create(NewJob {
                name: name.to_string(),
                check_id,
                arch_id,
                affinity_id,
                source_id: self.source,
                binary_id: None,
            })
            .await
            .unwrap()
            .id
            .into()
    }

    pub async fn depends(&self, job: ResourceId, on: ResourceId) {
        self.store.jobs.add_dependency(job, on).await.unwrap();
    }
}
