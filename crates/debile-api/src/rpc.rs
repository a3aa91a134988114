//! JSON-RPC dispatch.
//!
//! Every callable method is registered in [`METHODS`] together with the
//! credential tier it requires. The dispatcher authenticates the caller for
//! that tier before decoding parameters.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use debile_core::{AuthTier, RequestContext, ResourceId};
use debile_scheduler::{JobRequest, MasterInterface};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::AppState;
use crate::auth::authenticate;
use crate::error::ApiError;

/// Operations exposed over `/rpc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    BuilderWhoami,
    GetNextJob,
    CloseJob,
    ForfeitJob,
    UserWhoami,
    CreateBuilder,
    GetSource,
    GetBinary,
    GetArchiveLocation,
    GetInfo,
    JobCount,
}

/// Registration table: wire name, method and required tier.
pub const METHODS: &[(&str, Method, AuthTier)] = &[
    ("builder_whoami", Method::BuilderWhoami, AuthTier::Builder),
    ("get_next_job", Method::GetNextJob, AuthTier::Builder),
    ("close_job", Method::CloseJob, AuthTier::Builder),
    ("forfeit_job", Method::ForfeitJob, AuthTier::Builder),
    ("user_whoami", Method::UserWhoami, AuthTier::User),
    ("create_builder", Method::CreateBuilder, AuthTier::User),
    ("get_source", Method::GetSource, AuthTier::Anonymous),
    ("get_binary", Method::GetBinary, AuthTier::Anonymous),
    ("get_archive_location", Method::GetArchiveLocation, AuthTier::Anonymous),
    ("get_info", Method::GetInfo, AuthTier::Anonymous),
    ("job_count", Method::JobCount, AuthTier::Anonymous),
];

/// Look up a method by its wire name.
pub fn lookup(name: &str) -> Option<(Method, AuthTier)> {
    METHODS
        .iter()
        .find(|(wire, _, _)| *wire == name)
        .map(|(_, method, tier)| (*method, *tier))
}

/// Request body for `POST /rpc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCall {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Deserialize)]
struct JobParams {
    job_id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct CloseJobParams {
    job_id: ResourceId,
    #[serde(default)]
    failed: bool,
}

#[derive(Debug, Deserialize)]
struct CreateBuilderParams {
    name: String,
    password: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct GroupParams {
    group: String,
}

/// `POST /rpc` handler.
pub async fn rpc_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RpcCall>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(call) = body?;
    let (method, tier) = lookup(&call.method)
        .ok_or_else(|| ApiError::NotFound(format!("unknown method: {}", call.method)))?;

    let ctx = authenticate(&state, tier, &headers).await?;
    let result = dispatch(&state.master, method, &ctx, call.params).await?;

    Ok(Json(json!({ "result": result })))
}

#[instrument(skip(master, ctx, params), fields(caller = ctx.caller.name().unwrap_or("-")))]
async fn dispatch(
    master: &MasterInterface,
    method: Method,
    ctx: &RequestContext,
    params: Value,
) -> Result<Value, ApiError> {
    debug!(request_id = %ctx.request_id, "Dispatching");

    let value = match method {
        Method::BuilderWhoami => json!(master.builder_whoami(ctx)?),
        Method::UserWhoami => json!(master.user_whoami(ctx)?),
        Method::GetNextJob => {
            let request: JobRequest = decode(params)?;
            json!(master.get_next_job(ctx, &request).await?)
        }
        Method::CloseJob => {
            let p: CloseJobParams = decode(params)?;
            json!(master.close_job(ctx, p.job_id, p.failed).await?)
        }
        Method::ForfeitJob => {
            let p: JobParams = decode(params)?;
            json!(master.forfeit_job(ctx, p.job_id).await?)
        }
        Method::CreateBuilder => {
            let p: CreateBuilderParams = decode(params)?;
            json!(
                master
                    .create_builder(ctx, &p.name, &p.password, &p.key)
                    .await?
            )
        }
        Method::GetSource => {
            let p: IdParams = decode(params)?;
            json!(master.get_source(p.id).await?)
        }
        Method::GetBinary => {
            let p: IdParams = decode(params)?;
            json!(master.get_binary(p.id).await?)
        }
        Method::GetArchiveLocation => {
            let p: GroupParams = decode(params)?;
            json!(master.get_archive_location(&p.group)?)
        }
        Method::GetInfo => json!(master.get_info()),
        Method::JobCount => json!(master.job_count().await?),
    };

    Ok(value)
}

/// Decode method parameters; absent params read as an empty object.
fn decode<T: DeserializeOwned>(params: Value) -> Result<T, ApiError> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params)
        .map_err(|e| ApiError::BadRequest(format!("invalid params: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes;
    use crate::testing::{BUILDER_PASSWORD, USER_PASSWORD, app, call};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_every_method_is_registered_once() {
        for (name, method, _) in METHODS {
            let matches = METHODS.iter().filter(|(n, _, _)| n == name).count();
            assert_eq!(matches, 1, "{} registered twice", name);
            assert_eq!(lookup(name).map(|(m, _)| m), Some(*method));
        }
        assert_eq!(METHODS.len(), 11);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(lookup("get_next_job").unwrap().1, AuthTier::Builder);
        assert_eq!(lookup("create_builder").unwrap().1, AuthTier::User);
        assert_eq!(lookup("get_info").unwrap().1, AuthTier::Anonymous);
        assert!(lookup("drop_tables").is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_found() {
        let (state, _) = app().await;
        let (status, body) = call(routes::router(state), "drop_tables", json!({}), None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let (state, _) = app().await;
        let request = Request::post("/rpc")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = routes::router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "validation_error");
        assert!(body["error"].as_str().unwrap().contains("JSON"));
    }

    #[tokio::test]
    async fn test_missing_method_field_gets_json_error() {
        let (state, _) = app().await;
        let request = Request::post("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"params":{}}"#))
            .unwrap();

        let response = routes::router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "validation_error");
    }

    #[tokio::test]
    async fn test_anonymous_method_needs_no_credentials() {
        let (state, _) = app().await;
        let (status, body) = call(routes::router(state), "get_info", Value::Null, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["repo"]["base"], "http://debile.example.org");
    }

    #[tokio::test]
    async fn test_builder_method_requires_credentials() {
        let (state, _) = app().await;
        let (status, body) =
            call(routes::router(state), "builder_whoami", json!({}), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn test_builder_whoami() {
        let (state, _) = app().await;
        let (status, body) = call(
            routes::router(state),
            "builder_whoami",
            json!({}),
            Some(("leliel", BUILDER_PASSWORD)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "leliel");
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let (state, _) = app().await;
        let (status, _) = call(
            routes::router(state),
            "builder_whoami",
            json!({}),
            Some(("leliel", "nope")),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_credentials_do_not_open_builder_methods() {
        let (state, _) = app().await;
        let (status, _) = call(
            routes::router(state),
            "get_next_job",
            json!({ "arches": ["amd64"] }),
            Some(("paultag", USER_PASSWORD)),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_whoami() {
        let (state, _) = app().await;
        let (status, body) = call(
            routes::router(state),
            "user_whoami",
            Value::Null,
            Some(("paultag", USER_PASSWORD)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "paultag");
    }

    #[tokio::test]
    async fn test_claim_and_close_over_rpc() {
        let (state, seeded) = app().await;
        let builder = Some(("leliel", BUILDER_PASSWORD));

        let (status, body) = call(
            routes::router(state.clone()),
            "get_next_job",
            json!({ "arches": ["amd64"] }),
            builder,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["id"], seeded.job.to_string());
        assert_eq!(body["result"]["builder"], "leliel");
        assert_eq!(body["result"]["version"], 1);

        let (status, body) = call(
            routes::router(state.clone()),
            "close_job",
            json!({ "job_id": seeded.job, "failed": true }),
            builder,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], true);

        let (_, body) = call(
            routes::router(state),
            "get_next_job",
            json!({ "arches": ["amd64"] }),
            builder,
        )
        .await;
        assert!(body["result"].is_null());
    }

    #[tokio::test]
    async fn test_close_unassigned_job_is_invalid_state() {
        let (state, seeded) = app().await;
        let (status, body) = call(
            routes::router(state),
            "close_job",
            json!({ "job_id": seeded.job }),
            Some(("leliel", BUILDER_PASSWORD)),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "invalid_state");
    }

    #[tokio::test]
    async fn test_malformed_params_are_rejected() {
        let (state, _) = app().await;
        let (status, body) = call(
            routes::router(state),
            "close_job",
            json!({ "job_id": "not-a-uuid" }),
            Some(("leliel", BUILDER_PASSWORD)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
    }

    #[tokio::test]
    async fn test_create_builder_requires_user() {
        let (state, _) = app().await;
        let params = json!({
            "name": "sachiel",
            "password": "pw",
            "key": crate::testing::ARMORED_KEY,
        });

        let (status, _) = call(
            routes::router(state.clone()),
            "create_builder",
            params.clone(),
            Some(("leliel", BUILDER_PASSWORD)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            routes::router(state.clone()),
            "create_builder",
            params.clone(),
            Some(("paultag", USER_PASSWORD)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["name"], "sachiel");
        assert_eq!(body["result"]["maintainer"], "paultag");

        let (status, body) = call(
            routes::router(state),
            "create_builder",
            params,
            Some(("paultag", USER_PASSWORD)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "already_exists");
    }

    #[tokio::test]
    async fn test_bad_key_is_credential_error() {
        let (state, _) = app().await;
        let (status, body) = call(
            routes::router(state),
            "create_builder",
            json!({ "name": "sachiel", "password": "pw", "key": "garbage" }),
            Some(("paultag", USER_PASSWORD)),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "credential_error");
    }

    #[tokio::test]
    async fn test_accessors_over_rpc() {
        let (state, seeded) = app().await;

        let (status, body) = call(
            routes::router(state.clone()),
            "get_source",
            json!({ "id": seeded.source }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["name"], "fluxbox");

        let (status, _) = call(
            routes::router(state.clone()),
            "get_binary",
            json!({ "id": ResourceId::new() }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = call(
            routes::router(state.clone()),
            "get_archive_location",
            json!({ "group": "default" }),
            None,
        )
        .await;
        assert_eq!(body["result"], "http://debile.example.org/default");

        let (_, body) = call(routes::router(state), "job_count", Value::Null, None).await;
        assert_eq!(body["result"], 1);
    }

    #[tokio::test]
    async fn test_builder_auth_refreshes_last_ping() {
        let (state, _) = app().await;
        let before = state.store.builders.get_by_name("leliel").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (status, _) = call(
            routes::router(state.clone()),
            "builder_whoami",
            Value::Null,
            Some(("leliel", BUILDER_PASSWORD)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let after = state.store.builders.get_by_name("leliel").await.unwrap();
        assert!(after.last_ping > before.last_ping);
    }
}
