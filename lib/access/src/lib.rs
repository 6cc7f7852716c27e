//! Role-based access control for gatehouse.
//!
//! This crate provides:
//! - The user's role model (`Role`, `RoleSet`)
//! - Per-resource role policies and their resolution from JSON (`PolicyMap`)
//! - The access evaluator producing per-resource decisions (`AccessMap`)
//!
//! # Access Control Model
//!
//! Each page or component carries an allow-list (`roles_enabled`) and a
//! deny-list (`roles_disabled`). A user without roles never gets access, a
//! deny-list match always wins, and otherwise the allow-list decides.
//! Resources with neither list configured are open to authenticated users
//! unless the evaluator is configured with [`OpenResourcePolicy::Deny`].
//!
//! # Example
//!
//! ```
//! use gatehouse_access::{AccessEvaluator, PolicySource, RoleSet, resolve_policy};
//!
//! let pages = resolve_policy(PolicySource::json(
//!     r#"{"Admin": {"roles_enabled": ["admin"]}, "Reports": {"roles_disabled": ["guest"]}}"#,
//! ));
//! let roles = RoleSet::from_names(["admin"]);
//!
//! let acl = AccessEvaluator::default().build_acl(&pages, &roles, true);
//!
//! assert!(acl.has_access("Admin"));
//! assert!(!acl.has_access("Reports"));
//! ```

pub mod error;
pub mod evaluator;
pub mod policy;
pub mod role;

// Re-export main types at crate root
pub use error::PolicyParseError;
pub use evaluator::{AccessDecision, AccessEvaluator, AccessMap, OpenResourcePolicy};
pub use policy::{PolicyMap, PolicySource, ResourcePolicy, resolve_policy, try_resolve_policy};
pub use role::{Role, RoleSet};
