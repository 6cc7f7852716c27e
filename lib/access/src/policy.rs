//! Per-resource role policies and their resolution.
//!
//! Policies arrive either as already-structured data or as a JSON-encoded
//! string from an application setting. Both shapes normalize to a
//! [`PolicyMap`]. Resolution fails soft: a malformed payload becomes an empty
//! map and is logged, never propagated.

use crate::error::PolicyParseError;
use crate::role::Role;
use gatehouse_core::ResourceId;
use rootcause::prelude::Report;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Allow-list and deny-list of roles for one page or component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourcePolicy {
    /// Roles granted access.
    pub roles_enabled: Vec<Role>,
    /// Roles refused access, even when also allow-listed.
    pub roles_disabled: Vec<Role>,
}

/// Wire shape of a policy entry; either list may be missing or `null`.
#[derive(Deserialize)]
struct RawPolicy {
    #[serde(default)]
    roles_enabled: Option<Vec<Role>>,
    #[serde(default)]
    roles_disabled: Option<Vec<Role>>,
}

impl<'de> Deserialize<'de> for ResourcePolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawPolicy>::deserialize(deserializer)?;
        Ok(raw
            .map(|raw| Self {
                roles_enabled: raw.roles_enabled.unwrap_or_default(),
                roles_disabled: raw.roles_disabled.unwrap_or_default(),
            })
            .unwrap_or_default())
    }
}

impl ResourcePolicy {
    /// Creates a policy from explicit allow and deny lists.
    #[must_use]
    pub fn new<E, D>(roles_enabled: E, roles_disabled: D) -> Self
    where
        E: IntoIterator,
        E::Item: Into<Role>,
        D: IntoIterator,
        D::Item: Into<Role>,
    {
        Self {
            roles_enabled: roles_enabled.into_iter().map(Into::into).collect(),
            roles_disabled: roles_disabled.into_iter().map(Into::into).collect(),
        }
    }

    /// A policy with no restrictions configured.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Returns true if neither list has entries.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.roles_enabled.is_empty() && self.roles_disabled.is_empty()
    }
}

/// Mapping from resource id to its policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyMap {
    entries: BTreeMap<ResourceId, ResourcePolicy>,
}

impl PolicyMap {
    /// Creates an empty policy map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the policy for a resource.
    #[must_use]
    pub fn with(mut self, resource: impl Into<ResourceId>, policy: ResourcePolicy) -> Self {
        self.insert(resource, policy);
        self
    }

    /// Adds or replaces the policy for a resource.
    pub fn insert(&mut self, resource: impl Into<ResourceId>, policy: ResourcePolicy) {
        self.entries.insert(resource.into(), policy);
    }

    /// Returns the policy for a resource.
    #[must_use]
    pub fn get(&self, resource: &str) -> Option<&ResourcePolicy> {
        self.entries.get(resource)
    }

    /// Returns true if no resources are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of configured resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over resources and their policies.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &ResourcePolicy)> {
        self.entries.iter()
    }

    /// Builds a policy map from a JSON value.
    ///
    /// `null` is an empty map. Any other non-object value, or an entry that
    /// is neither an object nor `null`, is rejected.
    ///
    /// # Errors
    ///
    /// Returns `PolicyParseError` if the value does not have the policy shape.
    pub fn from_value(value: &Value) -> Result<Self, Report<PolicyParseError>> {
        let object = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(object) => object,
            other => {
                return Err(PolicyParseError::NotAnObject {
                    found: json_type_name(other).to_string(),
                }
                .into());
            }
        };

        let mut entries = BTreeMap::new();
        for (resource, entry) in object {
            let policy = ResourcePolicy::deserialize(entry).map_err(|e| {
                PolicyParseError::InvalidEntry {
                    resource: resource.clone(),
                    reason: e.to_string(),
                }
            })?;
            entries.insert(ResourceId::new(resource.as_str()), policy);
        }

        Ok(Self { entries })
    }
}

impl FromIterator<(ResourceId, ResourcePolicy)> for PolicyMap {
    fn from_iter<T: IntoIterator<Item = (ResourceId, ResourcePolicy)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A policy payload as handed over by the host application.
#[derive(Debug, Clone, Default)]
pub enum PolicySource {
    /// Already-structured policy map.
    Structured(PolicyMap),
    /// JSON-encoded policy map.
    Json(String),
    /// Parsed but untyped JSON.
    Value(Value),
    /// No policy supplied.
    #[default]
    Absent,
}

impl PolicySource {
    /// Wraps a JSON-encoded payload.
    #[must_use]
    pub fn json(payload: impl Into<String>) -> Self {
        Self::Json(payload.into())
    }
}

impl From<PolicyMap> for PolicySource {
    fn from(map: PolicyMap) -> Self {
        Self::Structured(map)
    }
}

impl From<Value> for PolicySource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<String>> for PolicySource {
    fn from(payload: Option<String>) -> Self {
        payload.map_or(Self::Absent, Self::Json)
    }
}

/// Resolves a policy source, surfacing parse failures.
///
/// An absent source, a blank string and JSON `null` all resolve to an empty
/// map.
///
/// # Errors
///
/// Returns `PolicyParseError` if a JSON payload is malformed or has the wrong
/// shape.
pub fn try_resolve_policy(source: PolicySource) -> Result<PolicyMap, Report<PolicyParseError>> {
    match source {
        PolicySource::Structured(map) => Ok(map),
        PolicySource::Absent => Ok(PolicyMap::new()),
        PolicySource::Value(value) => PolicyMap::from_value(&value),
        PolicySource::Json(payload) => {
            if payload.trim().is_empty() {
                return Ok(PolicyMap::new());
            }
            let value: Value =
                serde_json::from_str(&payload).map_err(|e| PolicyParseError::InvalidJson {
                    reason: e.to_string(),
                })?;
            PolicyMap::from_value(&value)
        }
    }
}

/// Resolves a policy source, degrading any failure to an empty map.
#[must_use]
pub fn resolve_policy(source: PolicySource) -> PolicyMap {
    match try_resolve_policy(source) {
        Ok(map) => {
            debug!(resources = map.len(), "resolved access policy");
            map
        }
        Err(report) => {
            warn!(error = %report, "ignoring malformed access policy");
            PolicyMap::new()
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
