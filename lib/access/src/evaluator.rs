//! Access decisions for pages and components.
//!
//! The evaluator applies one precedence rule to every resource:
//!
//! 1. A user without roles is refused.
//! 2. A role on the deny-list refuses access, whatever the allow-list says.
//! 3. An empty allow-list refuses access, except for open resources (no list
//!    configured at all), which follow [`OpenResourcePolicy`].
//! 4. Otherwise access requires holding at least one allow-listed role.

use crate::policy::{PolicyMap, ResourcePolicy};
use crate::role::RoleSet;
use gatehouse_core::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{debug, trace};

/// How resources without any configured role list are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenResourcePolicy {
    /// Authenticated users holding at least one role may access them.
    #[default]
    GrantAuthenticated,
    /// Nobody may access them until a policy is configured.
    Deny,
}

/// The access decision for a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the current user may see the resource.
    #[serde(rename = "hasAccess")]
    pub has_access: bool,
}

impl AccessDecision {
    /// A granting decision.
    pub const GRANTED: Self = Self { has_access: true };
    /// A refusing decision.
    pub const DENIED: Self = Self { has_access: false };
}

impl From<bool> for AccessDecision {
    fn from(has_access: bool) -> Self {
        Self { has_access }
    }
}

/// Access decisions keyed by resource id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMap {
    decisions: BTreeMap<ResourceId, AccessDecision>,
}

impl AccessMap {
    /// Creates an empty access map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decision for a resource, if it was evaluated.
    #[must_use]
    pub fn get(&self, resource: &str) -> Option<AccessDecision> {
        self.decisions.get(resource).copied()
    }

    /// Returns true if the resource was evaluated and granted.
    ///
    /// Resources absent from the map are reported as not accessible.
    #[must_use]
    pub fn has_access(&self, resource: &str) -> bool {
        self.get(resource).is_some_and(|d| d.has_access)
    }

    /// Returns true if no resources were evaluated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Returns the number of evaluated resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    /// Iterates over resources and their decisions.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &AccessDecision)> {
        self.decisions.iter()
    }

    /// Merges `other` into this map.
    ///
    /// Ids present in both maps take the decision from `other`. Page and
    /// component ids must therefore be kept disjoint by the application.
    #[must_use]
    pub fn merge(mut self, other: AccessMap) -> Self {
        for (resource, decision) in other.decisions {
            match self.decisions.entry(resource) {
                Entry::Occupied(mut slot) => {
                    debug!(resource = %slot.key(), "access map merge overwrote an existing decision");
                    slot.insert(decision);
                }
                Entry::Vacant(slot) => {
                    slot.insert(decision);
                }
            }
        }
        self
    }
}

impl FromIterator<(ResourceId, AccessDecision)> for AccessMap {
    fn from_iter<T: IntoIterator<Item = (ResourceId, AccessDecision)>>(iter: T) -> Self {
        Self {
            decisions: iter.into_iter().collect(),
        }
    }
}

/// Evaluates role policies against a user's role set.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessEvaluator {
    open_resources: OpenResourcePolicy,
}

impl AccessEvaluator {
    /// Creates an evaluator with the given treatment of open resources.
    #[must_use]
    pub fn new(open_resources: OpenResourcePolicy) -> Self {
        Self { open_resources }
    }

    /// Returns how open resources are treated.
    #[must_use]
    pub fn open_resources(&self) -> OpenResourcePolicy {
        self.open_resources
    }

    /// Decides whether `roles` grants access to a resource with `policy`.
    #[must_use]
    pub fn evaluate(&self, roles: &RoleSet, policy: &ResourcePolicy, is_authenticated: bool) -> bool {
        if roles.is_empty() {
            return false;
        }

        if let Some(role) = roles.first_match(&policy.roles_disabled) {
            trace!(%role, "access denied by disabled role");
            return false;
        }

        if policy.roles_enabled.is_empty() {
            return policy.is_open()
                && is_authenticated
                && self.open_resources == OpenResourcePolicy::GrantAuthenticated;
        }

        roles.intersects(&policy.roles_enabled)
    }

    /// Evaluates every resource in `policies`.
    ///
    /// An empty policy map produces an empty access map.
    #[must_use]
    pub fn build_acl(&self, policies: &PolicyMap, roles: &RoleSet, is_authenticated: bool) -> AccessMap {
        let acl: AccessMap = policies
            .iter()
            .map(|(resource, policy)| {
                let decision = AccessDecision::from(self.evaluate(roles, policy, is_authenticated));
                trace!(%resource, has_access = decision.has_access, "evaluated resource");
                (resource.clone(), decision)
            })
            .collect();

        debug!(
            resources = acl.len(),
            granted = acl.iter().filter(|(_, d)| d.has_access).count(),
            "built access map"
        );
        acl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn no_roles() -> Vec<Role> {
        Vec::new()
    }

    #[test]
    fn empty_role_set_never_grants() {
        let evaluator = AccessEvaluator::default();
        let none = RoleSet::none();

        assert!(!evaluator.evaluate(&none, &ResourcePolicy::open(), true));
        assert!(!evaluator.evaluate(&none, &ResourcePolicy::new(["admin"], no_roles()), true));
        assert!(!evaluator.evaluate(&none, &ResourcePolicy::new(no_roles(), ["guest"]), true));
    }

    #[test]
    fn disabled_role_beats_enabled_role() {
        let evaluator = AccessEvaluator::default();
        let roles = RoleSet::from_names(["admin", "contractor"]);
        let policy = ResourcePolicy::new(["admin"], ["contractor"]);

        assert!(!evaluator.evaluate(&roles, &policy, true));
    }

    #[test]
    fn open_policy_grants_authenticated_user_with_roles() {
        let evaluator = AccessEvaluator::default();
        let roles = RoleSet::from_names(["viewer"]);

        assert!(evaluator.evaluate(&roles, &ResourcePolicy::open(), true));
    }

    #[test]
    fn open_policy_refuses_unauthenticated_user() {
        let evaluator = AccessEvaluator::default();
        let roles = RoleSet::from_names(["viewer"]);

        assert!(!evaluator.evaluate(&roles, &ResourcePolicy::open(), false));
    }

    #[test]
    fn open_policy_refused_when_configured_to_deny() {
        let evaluator = AccessEvaluator::new(OpenResourcePolicy::Deny);
        let roles = RoleSet::from_names(["viewer"]);

        assert!(!evaluator.evaluate(&roles, &ResourcePolicy::open(), true));
    }

    #[test]
    fn deny_list_only_policy_refuses_everyone() {
        let evaluator = AccessEvaluator::default();
        let roles = RoleSet::from_names(["viewer"]);
        let policy = ResourcePolicy::new(no_roles(), ["guest"]);

        assert!(!evaluator.evaluate(&roles, &policy, true));
    }

    #[test]
    fn allow_list_requires_matching_role() {
        let evaluator = AccessEvaluator::default();
        let policy = ResourcePolicy::new(["admin"], no_roles());

        assert!(!evaluator.evaluate(&RoleSet::from_names(["viewer"]), &policy, true));
        assert!(evaluator.evaluate(&RoleSet::from_names(["admin", "viewer"]), &policy, true));
    }

    #[test]
    fn build_acl_evaluates_every_resource() {
        let policies = PolicyMap::new()
            .with("Admin", ResourcePolicy::new(["admin"], no_roles()))
            .with("Reports", ResourcePolicy::new(["admin", "analyst"], ["guest"]))
            .with("Help", ResourcePolicy::open());
        let roles = RoleSet::from_names(["analyst"]);

        let acl = AccessEvaluator::default().build_acl(&policies, &roles, true);

        assert_eq!(acl.len(), 3);
        assert_eq!(acl.get("Admin"), Some(AccessDecision::DENIED));
        assert_eq!(acl.get("Reports"), Some(AccessDecision::GRANTED));
        assert_eq!(acl.get("Help"), Some(AccessDecision::GRANTED));
        assert!(!acl.has_access("Unknown"));
    }

    #[test]
    fn build_acl_of_empty_policy_is_empty() {
        let acl = AccessEvaluator::default().build_acl(
            &PolicyMap::new(),
            &RoleSet::from_names(["admin"]),
            true,
        );
        assert!(acl.is_empty());
    }

    #[test]
    fn merge_lets_later_map_win() {
        let pages: AccessMap = [
            (ResourceId::new("Shared"), AccessDecision::GRANTED),
            (ResourceId::new("Dashboard"), AccessDecision::GRANTED),
        ]
        .into_iter()
        .collect();
        let components: AccessMap = [
            (ResourceId::new("Shared"), AccessDecision::DENIED),
            (ResourceId::new("saveButton"), AccessDecision::GRANTED),
        ]
        .into_iter()
        .collect();

        let merged = pages.merge(components);

        assert_eq!(merged.len(), 3);
        assert!(!merged.has_access("Shared"));
        assert!(merged.has_access("Dashboard"));
        assert!(merged.has_access("saveButton"));
    }

    #[test]
    fn access_map_serializes_with_has_access_field() {
        let acl: AccessMap = [(ResourceId::new("Dashboard"), AccessDecision::GRANTED)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&acl).expect("serialize");
        assert_eq!(json, r#"{"Dashboard":{"hasAccess":true}}"#);
    }

    #[test]
    fn open_resource_policy_serialization_format() {
        let json = serde_json::to_string(&OpenResourcePolicy::GrantAuthenticated).expect("serialize");
        assert_eq!(json, "\"grant_authenticated\"");
        let parsed: OpenResourcePolicy = serde_json::from_str("\"deny\"").expect("deserialize");
        assert_eq!(parsed, OpenResourcePolicy::Deny);
    }
}
