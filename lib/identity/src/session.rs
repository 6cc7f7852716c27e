//! The identity carried by an authentication outcome.
//!
//! A session is rebuilt on every pass, either from the callback fragment or
//! from the credential store. It is never cached in memory between passes.

use crate::claims::Claims;
use gatehouse_access::RoleSet;
use serde::Serialize;

/// Identity established by one authentication pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    /// Whether an access token is available.
    is_authenticated: bool,
    /// Roles from the identity token's `roles` claim.
    roles: RoleSet,
    /// Decoded identity token claims, if any could be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<Claims>,
    /// Access token from the callback or the store.
    #[serde(skip)]
    access_token: Option<String>,
    /// Identity token from the callback.
    #[serde(skip)]
    id_token: Option<String>,
}

impl Session {
    /// A session with no identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates a session from optionally decoded claims.
    ///
    /// Roles are derived from the claims; missing claims mean no roles.
    #[must_use]
    pub fn new(claims: Option<Claims>, is_authenticated: bool) -> Self {
        let roles = claims.as_ref().map(Claims::roles).unwrap_or_default();
        Self {
            is_authenticated,
            roles,
            claims,
            access_token: None,
            id_token: None,
        }
    }

    /// Attaches the raw tokens.
    #[must_use]
    pub fn with_tokens(mut self, access_token: Option<String>, id_token: Option<String>) -> Self {
        self.access_token = access_token;
        self.id_token = id_token;
        self
    }

    /// Returns true if an access token is available.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Returns the user's roles.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Returns the decoded claims, if present.
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Returns the access token, if present.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Returns the identity token, if present.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    pub(crate) fn set_authenticated(&mut self, is_authenticated: bool) {
        self.is_authenticated = is_authenticated;
    }
}
