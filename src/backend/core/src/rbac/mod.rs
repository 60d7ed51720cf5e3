//! Access control for application API keys.
//!
//! - **Scope**: the explicit set of `r_*` read capabilities held by a key
//! - **Policy**: base read checks and relationship gating against a scope
//!
//! # Usage
//!
//! ```rust,ignore
//! use panel_core::rbac::{AccessScope, Capability, PermissionEvaluator};
//!
//! let scope = AccessScope::full().revoke(Capability::Nodes);
//! let evaluator = PermissionEvaluator::new(&scope);
//!
//! evaluator.authorize_read(ResourceKind::Location)?;
//! assert!(!evaluator.can_access_named(ResourceKind::Location, "nodes"));
//! ```

pub mod policy;
pub mod scope;

pub use policy::{PermissionEvaluator, PolicyDecision};
pub use scope::{AccessScope, Capability};
