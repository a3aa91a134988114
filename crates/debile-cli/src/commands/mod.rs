//! CLI command implementations.

pub mod builders;
pub mod jobs;
pub mod packages;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::client::RpcClient;

pub async fn whoami(client: &RpcClient, user: bool) -> Result<()> {
    let method = if user { "user_whoami" } else { "builder_whoami" };
    let name: String = client.call(method, json!({})).await?;
    println!("{}", name);
    Ok(())
}

pub async fn info(client: &RpcClient) -> Result<()> {
    let info: serde_json::Value = client.call("get_info", json!({})).await?;
    print_json(&info)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
