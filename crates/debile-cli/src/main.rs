//! Debile command-line client.

use clap::{Parser, Subcommand};
use debile_core::ResourceId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;

use client::{Credentials, RpcClient};

#[derive(Parser)]
#[command(name = "debile")]
#[command(about = "Debile build farm client", long_about = None)]
struct Cli {
    /// Master URL
    #[arg(long, env = "DEBILE_URL", default_value = "http://localhost:22017")]
    url: String,

    /// Builder or user name to authenticate as
    #[arg(long, env = "DEBILE_NAME")]
    name: Option<String>,

    /// Password for --name
    #[arg(long, env = "DEBILE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who the master thinks you are
    Whoami {
        /// Authenticate as an operator instead of a builder
        #[arg(long)]
        user: bool,
    },
    /// Claim the next job for this builder
    NextJob {
        /// Architecture the builder can build (repeatable)
        #[arg(long = "arch", required = true)]
        arches: Vec<String>,
        /// Suite to build for (repeatable)
        #[arg(long = "suite")]
        suites: Vec<String>,
        /// Check the builder can run (repeatable)
        #[arg(long = "capability")]
        capabilities: Vec<String>,
    },
    /// Mark a job finished
    CloseJob {
        id: ResourceId,
        /// Record the job as failed
        #[arg(long)]
        failed: bool,
    },
    /// Hand a job back to the queue
    ForfeitJob { id: ResourceId },
    /// Register a new builder
    CreateBuilder {
        name: String,
        #[arg(long, env = "DEBILE_BUILDER_PASSWORD", hide_env_values = true)]
        password: String,
        /// ASCII-armored public key of the builder
        #[arg(long)]
        key_file: PathBuf,
    },
    /// Show a source upload
    Source { id: ResourceId },
    /// Show a binary upload
    Binary { id: ResourceId },
    /// Show where a group's archive lives
    ArchiveLocation { group: String },
    /// Show master information
    Info,
    /// Show the number of jobs
    JobCount,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let credentials = match (cli.name, cli.password) {
        (Some(name), Some(password)) => Some(Credentials { name, password }),
        _ => None,
    };
    let client = RpcClient::new(&cli.url, credentials)?;

    match cli.command {
        Commands::Whoami { user } => commands::whoami(&client, user).await?,
        Commands::NextJob {
            arches,
            suites,
            capabilities,
        } => commands::jobs::next(&client, arches, suites, capabilities).await?,
        Commands::CloseJob { id, failed } => commands::jobs::close(&client, id, failed).await?,
        Commands::ForfeitJob { id } => commands::jobs::forfeit(&client, id).await?,
        Commands::CreateBuilder {
            name,
            password,
            key_file,
        } => commands::builders::create(&client, &name, &password, &key_file).await?,
        Commands::Source { id } => commands::packages::source(&client, id).await?,
        Commands::Binary { id } => commands::packages::binary(&client, id).await?,
        Commands::ArchiveLocation { group } => {
            commands::packages::archive_location(&client, &group).await?
        }
        Commands::Info => commands::info(&client).await?,
        Commands::JobCount => commands::jobs::count(&client).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_job_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "debile", "next-job", "--arch", "amd64", "--arch", "all", "--suite", "unstable",
        ])
        .unwrap();

        match cli.command {
            Commands::NextJob {
                arches,
                suites,
                capabilities,
            } => {
                assert_eq!(arches, vec!["amd64", "all"]);
                assert_eq!(suites, vec!["unstable"]);
                assert!(capabilities.is_empty());
            }
            _ => panic!("expected next-job"),
        }
    }

    #[test]
    fn test_next_job_needs_an_arch() {
        assert!(Cli::try_parse_from(["debile", "next-job"]).is_err());
    }

    #[test]
    fn test_close_job_parses_id() {
        let id = ResourceId::new();
        let cli = Cli::try_parse_from(["debile", "close-job", &id.to_string(), "--failed"]).unwrap();

        match cli.command {
            Commands::CloseJob { id: parsed, failed } => {
                assert_eq!(parsed, id);
                assert!(failed);
            }
            _ => panic!("expected close-job"),
        }
    }

    #[test]
    fn test_close_job_rejects_bad_id() {
        assert!(Cli::try_parse_from(["debile", "close-job", "seven"]).is_err());
    }
}
