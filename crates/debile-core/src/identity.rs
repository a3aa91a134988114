//! Caller identity and authentication tiers.

use serde::{Deserialize, Serialize};

use crate::{Error, ResourceId, Result};

/// Which kind of authenticated identity an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthTier {
    /// Any caller the dispatch layer admits.
    Anonymous,
    /// An authenticated build machine.
    Builder,
    /// An authenticated human operator.
    User,
}

/// The resolved identity of whoever issued a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Caller {
    Anonymous,
    Builder { id: ResourceId, name: String },
    User { id: ResourceId, name: String },
}

impl Caller {
    pub fn tier(&self) -> AuthTier {
        match self {
            Caller::Anonymous => AuthTier::Anonymous,
            Caller::Builder { .. } => AuthTier::Builder,
            Caller::User { .. } => AuthTier::User,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Caller::Anonymous => None,
            Caller::Builder { name, .. } | Caller::User { name, .. } => Some(name),
        }
    }
}

/// Explicit per-request context handed to every master operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub caller: Caller,
    /// Correlates log lines belonging to one request.
    pub request_id: ResourceId,
}

impl RequestContext {
    pub fn new(caller: Caller) -> Self {
        Self {
            caller,
            request_id: ResourceId::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(Caller::Anonymous)
    }

    pub fn builder(id: ResourceId, name: impl Into<String>) -> Self {
        Self::new(Caller::Builder {
            id,
            name: name.into(),
        })
    }

    pub fn user(id: ResourceId, name: impl Into<String>) -> Self {
        Self::new(Caller::User {
            id,
            name: name.into(),
        })
    }

    /// The calling builder, or `Forbidden` for any other identity.
    pub fn require_builder(&self) -> Result<(ResourceId, &str)> {
        match &self.caller {
            Caller::Builder { id, name } => Ok((*id, name.as_str())),
            other => Err(Error::Forbidden(format!(
                "builder identity required, caller is {:?}",
                other.tier()
            ))),
        }
    }

    /// The calling user, or `Forbidden` for any other identity.
    pub fn require_user(&self) -> Result<(ResourceId, &str)> {
        match &self.caller {
            Caller::User { id, name } => Ok((*id, name.as_str())),
            other => Err(Error::Forbidden(format!(
                "user identity required, caller is {:?}",
                other.tier()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_builder() {
        let id = ResourceId::new();
        let ctx = RequestContext::builder(id, "leliel");
        assert_eq!(ctx.require_builder().unwrap(), (id, "leliel"));
        assert!(matches!(ctx.require_user(), Err(Error::Forbidden(_))));
    }

    #[test]
    fn test_anonymous_has_no_name() {
        let ctx = RequestContext::anonymous();
        assert_eq!(ctx.caller.tier(), AuthTier::Anonymous);
        assert!(ctx.caller.name().is_none());
        assert!(ctx.require_builder().is_err());
    }
}
