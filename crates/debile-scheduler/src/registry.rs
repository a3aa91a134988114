//! Builder registry - onboarding of build machines.

use debile_core::credential::hash_password;
use debile_core::snapshot::BuilderSnapshot;
use debile_core::{
    Error, Event, EventAction, EventCategory, EventSink, KeyImporter, RequestContext, Result,
};
use debile_db::{BuilderRepo, NewBuilder};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BuilderRegistry {
    builders: Arc<dyn BuilderRepo>,
    keyring: Arc<dyn KeyImporter>,
    events: Arc<dyn EventSink>,
}

impl BuilderRegistry {
    pub fn new(
        builders: Arc<dyn BuilderRepo>,
        keyring: Arc<dyn KeyImporter>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            builders,
            keyring,
            events,
        }
    }

    /// Register a new builder owned by the calling user.
    pub async fn create_builder(
        &self,
        ctx: &RequestContext,
        name: &str,
        password: &str,
        key: &str,
    ) -> Result<BuilderSnapshot> {
        let (user_id, user) = ctx.require_user()?;

        if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::Validation(format!("invalid builder name: {:?}", name)));
        }
        if password.is_empty() {
            return Err(Error::Validation("builder password must not be empty".to_string()));
        }

        if self.builders.exists(name).await? {
            warn!(builder = %name, %user, "Builder already exists");
            return Err(Error::AlreadyExists(format!("builder {}", name)));
        }

        let key_id = self.keyring.import(key).await?;

        let record = self
            .builders
            .create(NewBuilder {
                name: name.to_string(),
                key: key_id.to_string(),
                password_hash: hash_password(password),
                maintainer_id: user_id,
            })
            .await?;

        let snapshot = record.snapshot();
        info!(builder = %record.name, key = %record.key, maintainer = %user, "Created builder");
        self.events
            .emit(Event::new(EventAction::Create, EventCategory::Slave, &snapshot));
        Ok(snapshot)
    }
}
