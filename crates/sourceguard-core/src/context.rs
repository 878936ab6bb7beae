//! Caller context passed into the orchestrator.
//!
//! Authorization is decided by the calling layer. The orchestrator only
//! checks the `elevated` flag it is handed, and refuses mutating operations
//! when it is false.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who is invoking an admin operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Authenticated principal, if known.
    pub principal: Option<String>,

    /// Remote address of the caller, if any.
    pub ip: Option<String>,

    /// True only if the caller layer verified super-admin privilege.
    pub elevated: bool,
}

impl ActorContext {
    /// A caller the outer layer has verified as super-admin.
    pub fn super_admin(principal: impl Into<String>, ip: Option<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            ip,
            elevated: true,
        }
    }

    /// A caller without elevated privilege.
    pub fn unprivileged(principal: impl Into<String>, ip: Option<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            ip,
            elevated: false,
        }
    }
}

impl fmt::Display for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.principal.as_deref().unwrap_or("anonymous"),
            self.ip.as_deref().unwrap_or("local")
        )
    }
}

/// Minimal description of an inbound request, for gate-failure audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Remote address.
    pub ip: Option<String>,

    /// HTTP method.
    pub method: Option<String>,

    /// Request path.
    pub path: Option<String>,
}

impl RequestContext {
    /// A request from `ip`.
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_display() {
        let actor = ActorContext::super_admin("root", Some("10.0.0.1".to_string()));
        assert_eq!(actor.to_string(), "root@10.0.0.1");
        assert_eq!(ActorContext::default().to_string(), "anonymous@local");
        assert!(!ActorContext::default().elevated);
    }
}
