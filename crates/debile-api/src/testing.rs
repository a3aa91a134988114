//! Fixtures for router tests.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum_extra::headers::HeaderMapExt;
use axum_extra::headers::authorization::Authorization;
use debile_config::MasterConfig;
use debile_core::ResourceId;
use debile_core::credential::hash_password;
use debile_db::{NewBuilder, NewJob, NewSource, NewUser, Store};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::AppState;

pub const USER_PASSWORD: &str = "user-secret";
pub const BUILDER_PASSWORD: &str = "builder-secret";

pub const ARMORED_KEY: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----

mQENBFJp0ZQBCADHtq9kR0d3iTn5p6Qh1W2X
-----END PGP PUBLIC KEY BLOCK-----";

/// Ids of the rows seeded by [`app`].
pub struct Seeded {
    pub source: ResourceId,
    pub job: ResourceId,
}

/// In-memory master with user `paultag`, builder `leliel` and one amd64 job.
pub async fn app() -> (AppState, Seeded) {
    let store = Store::in_memory();
    let amd64 = store.arches.ensure("amd64").await.unwrap();

    let user = store
        .users
        .create(NewUser {
            name: "paultag".to_string(),
            email: "paultag@example.org".to_string(),
            password_hash: hash_password(USER_PASSWORD),
        })
        .await
        .unwrap();
    store
        .builders
        .create(NewBuilder {
            name: "leliel".to_string(),
            key: "0123456789ABCDEF".to_string(),
            password_hash: hash_password(BUILDER_PASSWORD),
            maintainer_id: user.id.into(),
        })
        .await
        .unwrap();

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
    let job = store
        .jobs
        .create(NewJob {
            name: "fluxbox build".to_string(),
            check_id: None,
            arch_id: amd64.id.into(),
            affinity_id: None,
            source_id: source.id.into(),
            binary_id: None,
        })
        .await
        .unwrap();

    let config = MasterConfig::in_memory("http://debile.example.org");
    let state = AppState::new(store, &config);
    let seeded = Seeded {
        source: source.id.into(),
        job: job.id.into(),
    };
    (state, seeded)
}

/// Send one RPC call and decode the JSON reply.
pub async fn call(
    router: Router,
    method: &str,
    params: Value,
    credentials: Option<(&str, &str)>,
) -> (StatusCode, Value) {
    let body = json!({ "method": method, "params": params });
    let mut request = Request::post("/rpc")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    if let Some((name, password)) = credentials {
        request
            .headers_mut()
            .typed_insert(Authorization::basic(name, password));
    }

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
