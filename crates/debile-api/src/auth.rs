//! HTTP Basic authentication against the builder and user tables.

use axum::http::HeaderMap;
use axum_extra::headers::authorization::{Authorization, Basic};
use axum_extra::headers::HeaderMapExt;
use debile_core::credential::verify_password;
use debile_core::{AuthTier, RequestContext};
use debile_db::DbError;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

/// Resolve the caller for a method registered at `tier`.
///
/// Anonymous methods ignore any credentials sent along.
pub async fn authenticate(
    state: &AppState,
    tier: AuthTier,
    headers: &HeaderMap,
) -> Result<RequestContext, ApiError> {
    match tier {
        AuthTier::Anonymous => Ok(RequestContext::anonymous()),
        AuthTier::Builder => {
            let (name, password) = credentials(headers)?;
            let builder = match state.store.builders.get_by_name(&name).await {
                Ok(builder) => builder,
                Err(DbError::NotFound(_)) => return Err(rejected(&name)),
                Err(e) => return Err(e.into()),
            };
            if !verify_password(&password, &builder.password_hash) {
                return Err(rejected(&name));
            }
            state.store.builders.touch(builder.id.into()).await?;
            Ok(RequestContext::builder(builder.id.into(), builder.name))
        }
        AuthTier::User => {
            let (name, password) = credentials(headers)?;
            let user = match state.store.users.get_by_name(&name).await {
                Ok(user) => user,
                Err(DbError::NotFound(_)) => return Err(rejected(&name)),
                Err(e) => return Err(e.into()),
            };
            if !verify_password(&password, &user.password_hash) {
                return Err(rejected(&name));
            }
            Ok(RequestContext::user(user.id.into(), user.name))
        }
    }
}

fn credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
    let Authorization(basic) = headers
        .typed_get::<Authorization<Basic>>()
        .ok_or_else(|| ApiError::Unauthorized("credentials required".to_string()))?;
    Ok((basic.username().to_string(), basic.password().to_string()))
}

fn rejected(name: &str) -> ApiError {
    debug!(name = %name, "Rejected credentials");
    ApiError::Unauthorized("invalid credentials".to_string())
}
