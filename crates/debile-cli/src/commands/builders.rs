//! Builder registration.

use anyhow::{Context, Result};
use debile_core::snapshot::BuilderSnapshot;
use serde_json::json;
use std::path::Path;

use super::print_json;
use crate::client::RpcClient;

pub async fn create(client: &RpcClient, name: &str, password: &str, key_file: &Path) -> Result<()> {
    let key = std::fs::read_to_string(key_file)
        .with_context(|| format!("reading {}", key_file.display()))?;

    let builder: BuilderSnapshot = client
        .call(
            "create_builder",
            json!({ "name": name, "password": password, "key": key }),
        )
        .await?;
    print_json(&builder)
}
