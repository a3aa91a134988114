//! Archive location templating.
//!
//! Templates use `{name}` placeholders. Known placeholders:
//! - `{url}` - repository base URL
//! - `{group}` - name of the source group
//!
//! Unknown placeholders are left untouched.

use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_ARCHIVE_LOCATION: &str = "{url}/{group}";

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

/// A parsed archive location template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTemplate {
    template: String,
}

impl ArchiveTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Render the location of `group` in the repository at `url`.
    pub fn render(&self, url: &str, group: &str) -> String {
        PLACEHOLDER_REGEX
            .replace_all(&self.template, |caps: &regex::Captures| match &caps[1] {
                "url" => url.to_string(),
                "group" => group.to_string(),
                other => format!("{{{}}}", other),
            })
            .to_string()
    }
}

impl Default for ArchiveTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_LOCATION)
    }
}
