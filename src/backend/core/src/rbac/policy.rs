//! Permission evaluation for application API keys.
//!
//! Answers two questions for a key's scope:
//! "may this key read resource kind K at all?" and
//! "may this key see relationship R embedded in a K?"

use tracing::debug;

use super::scope::{AccessScope, Capability};
use crate::error::{PanelError, Result};
use crate::models::{RelationshipSpec, ResourceKind};

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    /// Denied for lack of the named capability
    Deny(Capability),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Evaluator
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluates read decisions against one key's scope.
#[derive(Debug, Clone, Copy)]
pub struct PermissionEvaluator<'a> {
    scope: &'a AccessScope,
}

impl<'a> PermissionEvaluator<'a> {
    pub fn new(scope: &'a AccessScope) -> Self {
        Self { scope }
    }

    fn decide(&self, capability: Capability) -> PolicyDecision {
        if self.scope.allows(capability) {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny(capability)
        }
    }

    /// Decision for reading `kind` itself.
    pub fn read_decision(&self, kind: ResourceKind) -> PolicyDecision {
        self.decide(kind.read_capability())
    }

    pub fn can_read(&self, kind: ResourceKind) -> bool {
        self.read_decision(kind).is_allowed()
    }

    /// Fail with 403 unless the key may read `kind`.
    pub fn authorize_read(&self, kind: ResourceKind) -> Result<()> {
        match self.read_decision(kind) {
            PolicyDecision::Allow => Ok(()),
            PolicyDecision::Deny(capability) => {
                debug!(resource = %kind, capability = %capability, "Read denied");
                Err(PanelError::access_denied(format!(
                    "key lacks {} required to read {} resources",
                    capability, kind
                )))
            }
        }
    }

    /// Whether the relationship may be loaded.
    pub fn can_access(&self, relationship: &RelationshipSpec) -> bool {
        self.decide(relationship.capability).is_allowed()
    }

    /// Name-based variant of [`can_access`](Self::can_access).
    ///
    /// Names not declared on `kind` are never accessible.
    pub fn can_access_named(&self, kind: ResourceKind, relationship: &str) -> bool {
        kind.relationship(relationship)
            .is_some_and(|spec| self.can_access(spec))
    }
}
