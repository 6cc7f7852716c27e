//! Role types for access control.
//!
//! Roles are opaque strings issued by the identity provider in the `roles`
//! claim of the identity token (e.g. Entra ID app roles). The platform never
//! infers roles from any other claim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// A single role identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Creates a role from its identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Set of roles held by the current user.
///
/// Order is irrelevant and duplicates collapse. An empty set means the user
/// can never match an allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: BTreeSet<Role>,
}

impl RoleSet {
    /// Creates an empty role set (no access).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a role set from role identifiers.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: names.into_iter().map(Role::new).collect(),
        }
    }

    /// Reads a role set from the value of a `roles` claim.
    ///
    /// Only a JSON array is accepted; its string elements become roles and
    /// other elements are ignored. A missing claim or any other JSON type
    /// yields an empty set.
    #[must_use]
    pub fn from_claim(value: Option<&Value>) -> Self {
        let roles = value
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(Role::from)
                    .collect()
            })
            .unwrap_or_default();
        Self { roles }
    }

    /// Returns true if the user holds no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns the number of distinct roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns true if the set contains the given role.
    #[must_use]
    pub fn contains(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Returns the first of `candidates` held by this set, if any.
    #[must_use]
    pub fn first_match<'a>(&self, candidates: &'a [Role]) -> Option<&'a Role> {
        candidates.iter().find(|r| self.roles.contains(*r))
    }

    /// Returns true if any of `candidates` is held by this set.
    #[must_use]
    pub fn intersects(&self, candidates: &[Role]) -> bool {
        self.first_match(candidates).is_some()
    }

    /// Iterates over the roles in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self {
            roles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn none_is_empty() {
        let roles = RoleSet::none();
        assert!(roles.is_empty());
        assert_eq!(roles.len(), 0);
    }

    #[test]
    fn from_names_collapses_duplicates() {
        let roles = RoleSet::from_names(["admin", "viewer", "admin"]);
        assert_eq!(roles.len(), 2);
        assert!(roles.contains(&Role::from("admin")));
        assert!(roles.contains(&Role::from("viewer")));
    }

    #[test]
    fn from_claim_reads_string_array() {
        let value = json!(["admin", "editor"]);
        let roles = RoleSet::from_claim(Some(&value));
        assert_eq!(roles, RoleSet::from_names(["editor", "admin"]));
    }

    #[test]
    fn from_claim_skips_non_string_elements() {
        let value = json!(["admin", 7, null, {"role": "x"}]);
        let roles = RoleSet::from_claim(Some(&value));
        assert_eq!(roles, RoleSet::from_names(["admin"]));
    }

    #[test]
    fn from_claim_treats_non_array_as_empty() {
        assert!(RoleSet::from_claim(None).is_empty());
        assert!(RoleSet::from_claim(Some(&json!("admin"))).is_empty());
        assert!(RoleSet::from_claim(Some(&json!({"admin": true}))).is_empty());
        assert!(RoleSet::from_claim(Some(&Value::Null)).is_empty());
    }

    #[test]
    fn first_match_follows_candidate_order() {
        let roles = RoleSet::from_names(["guest", "viewer"]);
        let candidates = vec![Role::from("viewer"), Role::from("guest")];
        assert_eq!(roles.first_match(&candidates), Some(&Role::from("viewer")));
        assert!(!roles.intersects(&[Role::from("admin")]));
    }

    #[test]
    fn role_set_serializes_as_sorted_array() {
        let roles = RoleSet::from_names(["viewer", "admin"]);
        let json = serde_json::to_string(&roles).expect("serialize");
        assert_eq!(json, r#"["admin","viewer"]"#);
    }
}
