//! Authentication configuration.
//!
//! Every setting has a default so that a host can start with an empty
//! configuration and override only what it needs. Only `client_id` has no
//! usable default: identity-provider login refuses to start without it.

use gatehouse_access::OpenResourcePolicy;
use gatehouse_core::PageId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::store::CredentialKeys;

/// Configuration of the implicit-flow authentication pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Directory tenant id used in the authorization endpoint path.
    /// Default: "common"
    #[serde(default = "default_tenant_id")]
    tenant_id: String,
    /// OAuth2 client (application) id registered with the provider.
    #[serde(default)]
    client_id: String,
    /// Base URL of the identity provider.
    /// Default: "https://login.microsoftonline.com"
    #[serde(default = "default_authority_url")]
    authority_url: String,
    /// OAuth2 scopes to request as a comma-separated string.
    /// Default: "openid,profile,email"
    #[serde(default = "default_scopes")]
    scopes: String,
    /// Prefix of the credential store keys.
    /// Default: "gatehouse."
    #[serde(default = "default_storage_key_prefix")]
    storage_key_prefix: String,
    /// Page users are sent to when not authenticated.
    /// Default: "Login"
    #[serde(default = "default_login_page_id")]
    login_page_id: PageId,
    /// Page users are sent to after a successful callback.
    /// Default: "Home"
    #[serde(default = "default_home_page_id")]
    home_page_id: PageId,
    /// Whether a successful callback schedules navigation to the home page.
    /// Default: true
    #[serde(default = "default_auto_redirect_home")]
    auto_redirect_home: bool,
    /// Delay before the scheduled home navigation runs, in milliseconds.
    /// Default: 0
    #[serde(default)]
    home_redirect_delay_ms: u64,
    /// Path segment that marks the application editor/preview.
    /// Default: "editor"
    #[serde(default = "default_editor_path_segment")]
    editor_path_segment: String,
    /// Fixed redirect URI for the provider; derived from the current URL when unset.
    #[serde(default)]
    redirect_uri: Option<String>,
    /// Treatment of resources with no role lists configured.
    /// Default: "grant_authenticated"
    #[serde(default)]
    open_resources: OpenResourcePolicy,
    /// Whether building a flow without a credential store is an error.
    /// Default: true
    #[serde(default = "default_require_store")]
    require_store: bool,
}

fn default_tenant_id() -> String {
    "common".to_string()
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_scopes() -> String {
    "openid,profile,email".to_string()
}

fn default_storage_key_prefix() -> String {
    "gatehouse.".to_string()
}

fn default_login_page_id() -> PageId {
    PageId::new("Login")
}

fn default_home_page_id() -> PageId {
    PageId::new("Home")
}

fn default_auto_redirect_home() -> bool {
    true
}

fn default_editor_path_segment() -> String {
    "editor".to_string()
}

fn default_require_store() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: default_tenant_id(),
            client_id: String::new(),
            authority_url: default_authority_url(),
            scopes: default_scopes(),
            storage_key_prefix: default_storage_key_prefix(),
            login_page_id: default_login_page_id(),
            home_page_id: default_home_page_id(),
            auto_redirect_home: default_auto_redirect_home(),
            home_redirect_delay_ms: 0,
            editor_path_segment: default_editor_path_segment(),
            redirect_uri: None,
            open_resources: OpenResourcePolicy::default(),
            require_store: default_require_store(),
        }
    }
}

impl AuthConfig {
    /// Creates a configuration for a client, with defaults for everything else.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(tenant_id: impl Into<String>, client_id: impl Into<String>) -> AuthConfigBuilder {
        AuthConfigBuilder {
            config: Self::new(tenant_id, client_id),
        }
    }

    /// Returns the directory tenant id.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Returns the OAuth2 client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the identity provider base URL.
    #[must_use]
    pub fn authority_url(&self) -> &str {
        &self.authority_url
    }

    /// Returns the OAuth2 scopes to request, parsed from comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Returns the credential store key prefix.
    #[must_use]
    pub fn storage_key_prefix(&self) -> &str {
        &self.storage_key_prefix
    }

    /// Returns the credential store key names.
    #[must_use]
    pub fn credential_keys(&self) -> CredentialKeys {
        CredentialKeys::with_prefix(&self.storage_key_prefix)
    }

    /// Returns the login page id.
    #[must_use]
    pub fn login_page_id(&self) -> &PageId {
        &self.login_page_id
    }

    /// Returns the home page id.
    #[must_use]
    pub fn home_page_id(&self) -> &PageId {
        &self.home_page_id
    }

    /// Returns whether a successful callback navigates home.
    #[must_use]
    pub fn auto_redirect_home(&self) -> bool {
        self.auto_redirect_home
    }

    /// Returns the delay before navigating home.
    #[must_use]
    pub fn home_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.home_redirect_delay_ms)
    }

    /// Returns the path segment that marks editor mode.
    #[must_use]
    pub fn editor_path_segment(&self) -> &str {
        &self.editor_path_segment
    }

    /// Returns the fixed redirect URI, if configured.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Returns the treatment of open resources.
    #[must_use]
    pub fn open_resources(&self) -> OpenResourcePolicy {
        self.open_resources
    }

    /// Returns whether a credential store is mandatory.
    #[must_use]
    pub fn require_store(&self) -> bool {
        self.require_store
    }
}

/// Builder for `AuthConfig`.
#[derive(Debug)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Sets the identity provider base URL.
    #[must_use]
    pub fn authority_url(mut self, url: impl Into<String>) -> Self {
        self.config.authority_url = url.into();
        self
    }

    /// Sets the OAuth2 scopes to request.
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.config.scopes = scopes.join(",");
        self
    }

    /// Adds a scope to the list of scopes to request.
    #[must_use]
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.config.scopes().contains(&scope.as_str()) {
            if self.config.scopes.trim().is_empty() {
                self.config.scopes = scope;
            } else {
                self.config.scopes = format!("{},{scope}", self.config.scopes);
            }
        }
        self
    }

    /// Sets the credential store key prefix.
    #[must_use]
    pub fn storage_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.storage_key_prefix = prefix.into();
        self
    }

    /// Sets the login page id.
    #[must_use]
    pub fn login_page_id(mut self, page: impl Into<PageId>) -> Self {
        self.config.login_page_id = page.into();
        self
    }

    /// Sets the home page id.
    #[must_use]
    pub fn home_page_id(mut self, page: impl Into<PageId>) -> Self {
        self.config.home_page_id = page.into();
        self
    }

    /// Enables or disables navigation home after a successful callback.
    #[must_use]
    pub fn auto_redirect_home(mut self, enabled: bool) -> Self {
        self.config.auto_redirect_home = enabled;
        self
    }

    /// Sets the delay before navigating home.
    #[must_use]
    pub fn home_redirect_delay(mut self, delay: Duration) -> Self {
        self.config.home_redirect_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the path segment that marks editor mode.
    #[must_use]
    pub fn editor_path_segment(mut self, segment: impl Into<String>) -> Self {
        self.config.editor_path_segment = segment.into();
        self
    }

    /// Pins the redirect URI sent to the provider.
    #[must_use]
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.redirect_uri = Some(uri.into());
        self
    }

    /// Sets the treatment of open resources.
    #[must_use]
    pub fn open_resources(mut self, policy: OpenResourcePolicy) -> Self {
        self.config.open_resources = policy;
        self
    }

    /// Sets whether a credential store is mandatory.
    #[must_use]
    pub fn require_store(mut self, required: bool) -> Self {
        self.config.require_store = required;
        self
    }

    /// Builds the `AuthConfig`.
    #[must_use]
    pub fn build(self) -> AuthConfig {
        self.config
    }
}
