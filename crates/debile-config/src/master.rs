//! Master configuration parsing.
//!
//! ```kdl
//! repo {
//!     url "http://debile.example.org/"
//!     archive-location "{url}/pool/{group}"
//! }
//! database url="postgres://debile@localhost/debile" max-connections=10
//! server listen="0.0.0.0:22017"
//! events buffer=256
//! arches "amd64" "i386" "all" "source"
//! check "build" source=#true build=#true
//! check "lintian" source=#true binary=#true
//! ```

use crate::{ArchiveTemplate, ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:22017";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Complete master configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    pub repo: RepoConfig,
    /// Absent means the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub server: ServerConfig,
    pub events: EventsConfig,
    /// Architectures ensured in the store at startup.
    pub arches: Vec<String>,
    /// Checks ensured in the store at startup.
    pub checks: Vec<CheckConfig>,
}

/// A check jobs can run, and what it runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    pub source: bool,
    pub binary: bool,
    pub build: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Base URL of the package repository.
    pub url: String,
    /// Archive location template, see [`ArchiveTemplate`].
    pub archive_location: String,
}

impl RepoConfig {
    pub fn archive_template(&self) -> ArchiveTemplate {
        ArchiveTemplate::new(self.archive_location.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 22017)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the event broadcast channel.
    pub buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl MasterConfig {
    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        parse_master_config(&content)
    }

    /// Configuration for a throwaway master: in-memory store, given repo URL.
    pub fn in_memory(repo_url: impl Into<String>) -> Self {
        Self {
            repo: RepoConfig {
                url: repo_url.into(),
                archive_location: crate::template::DEFAULT_ARCHIVE_LOCATION.to_string(),
            },
            database: None,
            server: ServerConfig::default(),
            events: EventsConfig::default(),
            arches: Vec::new(),
            checks: Vec::new(),
        }
    }
}

/// Parse master configuration from KDL text.
pub fn parse_master_config(kdl: &str) -> ConfigResult<MasterConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut repo = None;
    let mut database = None;
    let mut server = None;
    let mut events = None;
    let mut arches = Vec::new();
    let mut checks: Vec<CheckConfig> = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "repo" => set_once(&mut repo, "repo", parse_repo(node)?)?,
            "database" => set_once(&mut database, "database", parse_database(node)?)?,
            "server" => set_once(&mut server, "server", parse_server(node)?)?,
            "events" => set_once(&mut events, "events", parse_events(node)?)?,
            "arches" => {
                for arch in get_all_string_args(node) {
                    if arches.contains(&arch) {
                        return Err(ConfigError::Duplicate(format!("arch {}", arch)));
                    }
                    arches.push(arch);
                }
            }
            "check" => {
                let check = parse_check(node)?;
                if checks.iter().any(|c| c.name == check.name) {
                    return Err(ConfigError::Duplicate(format!("check {}", check.name)));
                }
                checks.push(check);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(MasterConfig {
        repo: repo.ok_or_else(|| ConfigError::MissingField("repo".to_string()))?,
        database,
        server: server.unwrap_or_default(),
        events: events.unwrap_or_default(),
        arches,
        checks,
    })
}

fn set_once<T>(slot: &mut Option<T>, name: &str, value: T) -> ConfigResult<()> {
    if slot.is_some() {
        return Err(ConfigError::Duplicate(name.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_repo(node: &KdlNode) -> ConfigResult<RepoConfig> {
    let mut url = None;
    let mut archive_location = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "url" => url = get_first_string_arg(child),
                "archive-location" | "archive_location" => {
                    archive_location = get_first_string_arg(child)
                }
                _ => {}
            }
        }
    }

    let url = url.ok_or_else(|| ConfigError::MissingField("repo url".to_string()))?;
    url::Url::parse(&url).map_err(|e| ConfigError::InvalidValue {
        field: "repo url".to_string(),
        message: e.to_string(),
    })?;

    Ok(RepoConfig {
        url,
        archive_location: archive_location
            .unwrap_or_else(|| crate::template::DEFAULT_ARCHIVE_LOCATION.to_string()),
    })
}

fn parse_database(node: &KdlNode) -> ConfigResult<DatabaseConfig> {
    let url = get_string_prop(node, "url")
        .or_else(|| get_first_string_arg(node))
        .ok_or_else(|| ConfigError::MissingField("database url".to_string()))?;

    let max_connections = match get_integer_prop(node, "max-connections") {
        Some(n) => u32::try_from(n)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "database max-connections".to_string(),
                message: format!("expected a positive integer, got {}", n),
            })?,
        None => DEFAULT_MAX_CONNECTIONS,
    };

    Ok(DatabaseConfig {
        url,
        max_connections,
    })
}

fn parse_server(node: &KdlNode) -> ConfigResult<ServerConfig> {
    let listen = get_string_prop(node, "listen").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let listen = listen
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "server listen".to_string(),
            message: e.to_string(),
        })?;
    Ok(ServerConfig { listen })
}

fn parse_events(node: &KdlNode) -> ConfigResult<EventsConfig> {
    let buffer = match get_integer_prop(node, "buffer") {
        Some(n) => usize::try_from(n)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "events buffer".to_string(),
                message: format!("expected a positive integer, got {}", n),
            })?,
        None => DEFAULT_EVENT_BUFFER,
    };
    Ok(EventsConfig { buffer })
}

fn parse_check(node: &KdlNode) -> ConfigResult<CheckConfig> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("check name".to_string()))?;

    Ok(CheckConfig {
        name,
        source: get_bool_prop(node, "source").unwrap_or(false),
        binary: get_bool_prop(node, "binary").unwrap_or(false),
        build: get_bool_prop(node, "build").unwrap_or(false),
    })
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}

fn get_integer_prop(node: &KdlNode, name: &str) -> Option<i128> {
    node.get(name).and_then(|v| v.as_integer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let kdl = r#"
            repo {
                url "http://debile.example.org/"
                archive-location "{url}/pool/{group}"
            }
            database url="postgres://debile@localhost/debile" max-connections=4
            server listen="127.0.0.1:8080"
            events buffer=16
            arches "amd64" "i386" "all"
        "#;

        let config = parse_master_config(kdl).unwrap();
        assert_eq!(config.repo.url, "http://debile.example.org/");
        assert_eq!(config.repo.archive_location, "{url}/pool/{group}");
        let database = config.database.unwrap();
        assert_eq!(database.url, "postgres://debile@localhost/debile");
        assert_eq!(database.max_connections, 4);
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.events.buffer, 16);
        assert_eq!(config.arches, vec!["amd64", "i386", "all"]);
    }

    #[test]
    fn test_defaults() {
        let kdl = r#"
            repo {
                url "http://localhost/"
            }
        "#;

        let config = parse_master_config(kdl).unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.repo.archive_location, "{url}/{group}");
        assert_eq!(config.server.listen.port(), 22017);
        assert_eq!(config.events.buffer, DEFAULT_EVENT_BUFFER);
        assert!(config.arches.is_empty());
        assert!(config.checks.is_empty());
    }

    #[test]
    fn test_checks() {
        let kdl = r#"
            repo {
                url "http://localhost/"
            }
            check "build" source=#true build=#true
            check "lintian" source=#true binary=#true
        "#;

        let config = parse_master_config(kdl).unwrap();
        assert_eq!(config.checks.len(), 2);
        assert_eq!(
            config.checks[0],
            CheckConfig {
                name: "build".to_string(),
                source: true,
                binary: false,
                build: true,
            }
        );
        assert!(config.checks[1].binary);
        assert!(!config.checks[1].build);
    }

    #[test]
    fn test_duplicate_check() {
        let kdl = r#"
            repo {
                url "http://localhost/"
            }
            check "lintian" source=#true
            check "lintian" binary=#true
        "#;
        let result = parse_master_config(kdl);
        assert!(matches!(result, Err(ConfigError::Duplicate(_))));
    }

    #[test]
    fn test_check_needs_a_name() {
        let kdl = r#"
            repo {
                url "http://localhost/"
            }
            check source=#true
        "#;
        let result = parse_master_config(kdl);
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_missing_repo() {
        let result = parse_master_config(r#"server listen="127.0.0.1:1""#);
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_invalid_repo_url() {
        let kdl = r#"
            repo {
                url "not a url"
            }
        "#;
        let result = parse_master_config(kdl);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_duplicate_arch() {
        let kdl = r#"
            repo {
                url "http://localhost/"
            }
            arches "amd64" "amd64"
        "#;
        let result = parse_master_config(kdl);
        assert!(matches!(result, Err(ConfigError::Duplicate(_))));
    }

    #[test]
    fn test_invalid_event_buffer() {
        let kdl = r#"
            repo {
                url "http://localhost/"
            }
            events buffer=0
        "#;
        let result = parse_master_config(kdl);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
