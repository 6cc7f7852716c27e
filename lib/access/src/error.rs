//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `PolicyParseError`: a policy payload could not be turned into a `PolicyMap`

use std::fmt;

/// Errors from resolving a policy payload.
///
/// Resolution fails soft: callers going through
/// [`resolve_policy`](crate::policy::resolve_policy) see an empty policy map
/// instead of this error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyParseError {
    /// The payload is not valid JSON.
    InvalidJson { reason: String },
    /// The payload is JSON but not an object keyed by resource id.
    NotAnObject { found: String },
    /// A resource entry has the wrong shape.
    InvalidEntry { resource: String, reason: String },
}

impl fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { reason } => {
                write!(f, "policy is not valid JSON: {reason}")
            }
            Self::NotAnObject { found } => {
                write!(f, "policy must be a JSON object, found {found}")
            }
            Self::InvalidEntry { resource, reason } => {
                write!(f, "invalid policy for resource '{resource}': {reason}")
            }
        }
    }
}

impl std::error::Error for PolicyParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_json_display() {
        let err = PolicyParseError::InvalidJson {
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.to_string().contains("not valid JSON"));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn invalid_entry_display_names_resource() {
        let err = PolicyParseError::InvalidEntry {
            resource: "Dashboard".to_string(),
            reason: "roles_enabled must be an array".to_string(),
        };
        assert!(err.to_string().contains("'Dashboard'"));
        assert!(err.to_string().contains("roles_enabled"));
    }
}
