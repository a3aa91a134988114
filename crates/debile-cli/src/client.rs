//! RPC client for the master.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid master URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{kind}: {message} (HTTP {status})")]
    Rpc {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("unexpected reply: {0}")]
    Parse(String),
}

/// Basic credentials of a builder or user.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

pub struct RpcClient {
    client: reqwest::Client,
    endpoint: Url,
    credentials: Option<Credentials>,
}

impl RpcClient {
    pub fn new(base: &str, credentials: Option<Credentials>) -> Result<Self, ClientError> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: rpc_endpoint(base)?,
            credentials,
        })
    }

    /// Call `method` and decode its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ClientError> {
        debug!(method = %method, endpoint = %self.endpoint, "Calling master");

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "method": method, "params": params }));
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.name, Some(&creds.password));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        decode_reply(status, &text)
    }
}

/// Resolve the `/rpc` endpoint under `base`, keeping any path prefix.
fn rpc_endpoint(base: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.join("rpc")?)
}

fn decode_reply<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, ClientError> {
    let success = (200..300).contains(&status);
    let mut body: Value = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(e) if success => return Err(ClientError::Parse(e.to_string())),
        // Proxies and the HTTP layer may answer in plain text.
        Err(_) => {
            return Err(ClientError::Rpc {
                status,
                kind: "http".to_string(),
                message: text.trim().to_string(),
            });
        }
    };

    if success {
        let result = body
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| ClientError::Parse("missing result".to_string()))?;
        return serde_json::from_value(result).map_err(|e| ClientError::Parse(e.to_string()));
    }

    let text = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Err(ClientError::Rpc {
        status,
        kind: text("kind"),
        message: text("error"),
    })
}
