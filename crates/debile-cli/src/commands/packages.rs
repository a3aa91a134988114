//! Package and archive lookups.

use anyhow::Result;
use debile_core::ResourceId;
use debile_core::snapshot::{BinarySnapshot, SourceSnapshot};
use serde_json::json;

use super::print_json;
use crate::client::RpcClient;

pub async fn source(client: &RpcClient, id: ResourceId) -> Result<()> {
    let source: SourceSnapshot = client.call("get_source", json!({ "id": id })).await?;
    print_json(&source)
}

pub async fn binary(client: &RpcClient, id: ResourceId) -> Result<()> {
    let binary: BinarySnapshot = client.call("get_binary", json!({ "id": id })).await?;
    print_json(&binary)
}

pub async fn archive_location(client: &RpcClient, group: &str) -> Result<()> {
    let location: String = client
        .call("get_archive_location", json!({ "group": group }))
        .await?;
    println!("{}", location);
    Ok(())
}
