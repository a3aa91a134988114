//! Startup seeding of the arch and check catalog.

use debile_config::{CheckConfig, MasterConfig};
use debile_db::{CheckRecord, DbError, DbResult, NewCheck, Store};
use tracing::info;

/// Make sure every configured arch and check exists in the store.
///
/// Existing checks are left as they are; safe to run on every start.
pub async fn seed_catalog(store: &Store, config: &MasterConfig) -> DbResult<()> {
    for arch in &config.arches {
        store.arches.ensure(arch).await?;
    }
    for check in &config.checks {
        ensure_check(store, check).await?;
    }
    Ok(())
}

async fn ensure_check(store: &Store, check: &CheckConfig) -> DbResult<CheckRecord> {
    match store.packages.get_check_by_name(&check.name).await {
        Ok(existing) => Ok(existing),
        Err(DbError::NotFound(_)) => {
            let created = store
                .packages
                .create_check(NewCheck {
                    name: check.name.clone(),
                    on_source: check.source,
                    on_binary: check.binary,
                    is_build: check.build,
                })
                .await?;
            info!(check = %created.name, "Registered check");
            Ok(created)
        }
        Err(e) => Err(e),
    }
}
