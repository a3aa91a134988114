//! Job commands.

use anyhow::Result;
use debile_core::ResourceId;
use debile_core::snapshot::JobSnapshot;
use serde_json::json;

use super::print_json;
use crate::client::RpcClient;

pub async fn next(
    client: &RpcClient,
    arches: Vec<String>,
    suites: Vec<String>,
    capabilities: Vec<String>,
) -> Result<()> {
    let params = json!({
        "arches": arches,
        "suites": suites,
        "capabilities": capabilities,
    });
    let job: Option<JobSnapshot> = client.call("get_next_job", params).await?;
    match job {
        Some(job) => print_json(&job),
        None => {
            println!("No job available");
            Ok(())
        }
    }
}

pub async fn close(client: &RpcClient, id: ResourceId, failed: bool) -> Result<()> {
    let _: bool = client
        .call("close_job", json!({ "job_id": id, "failed": failed }))
        .await?;
    println!("Closed job {}{}", id, if failed { " (failed)" } else { "" });
    Ok(())
}

pub async fn forfeit(client: &RpcClient, id: ResourceId) -> Result<()> {
    let _: bool = client.call("forfeit_job", json!({ "job_id": id })).await?;
    println!("Forfeited job {}", id);
    Ok(())
}

pub async fn count(client: &RpcClient) -> Result<()> {
    let count: i64 = client.call("job_count", json!({})).await?;
    println!("{}", count);
    Ok(())
}
