//! Identity-provider login initiation.
//!
//! Builds the implicit-flow authorization request. The provider answers by
//! redirecting back to the redirect URI with the tokens in the fragment,
//! which the flow then processes as a callback.

use crate::config::AuthConfig;
use crate::error::ConfigError;
use openidconnect::{CsrfToken, Nonce};
use rootcause::prelude::Report;
use url::Url;

/// Response type requesting both tokens directly in the redirect.
const IMPLICIT_RESPONSE_TYPE: &str = "id_token token";

/// Login initiation data for redirecting to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInitiation {
    authorization_url: Url,
    redirect_uri: Url,
    state: String,
    nonce: String,
}

impl LoginInitiation {
    /// The URL to send the user to.
    #[must_use]
    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    /// The URI the provider redirects back to.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// The `state` parameter sent with the request.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// The single-use `nonce` sent with the request.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

/// Builds an authorization request for `current_url`.
///
/// The redirect URI is the configured one or, when unset, `current_url`
/// without its fragment.
///
/// # Errors
///
/// Returns `ConfigError` if the client id, tenant id or scopes are missing,
/// the authority URL is invalid, or no redirect URI can be derived.
pub fn build_login(
    config: &AuthConfig,
    current_url: &str,
) -> Result<LoginInitiation, Report<ConfigError>> {
    if config.client_id().trim().is_empty() {
        return Err(ConfigError::MissingSetting { name: "client_id" }.into());
    }
    if config.tenant_id().trim().is_empty() {
        return Err(ConfigError::MissingSetting { name: "tenant_id" }.into());
    }
    let scopes = config.scopes();
    if scopes.is_empty() {
        return Err(ConfigError::MissingSetting { name: "scopes" }.into());
    }

    let redirect_uri = redirect_uri(config, current_url)?;
    let mut authorization_url = authorize_endpoint(config)?;
    let nonce = Nonce::new_random();
    let state = CsrfToken::new_random();

    authorization_url
        .query_pairs_mut()
        .append_pair("client_id", config.client_id())
        .append_pair("response_type", IMPLICIT_RESPONSE_TYPE)
        .append_pair("redirect_uri", redirect_uri.as_str())
        .append_pair("scope", &scopes.join(" "))
        .append_pair("response_mode", "fragment")
        .append_pair("state", state.secret())
        .append_pair("nonce", nonce.secret());

    Ok(LoginInitiation {
        authorization_url,
        redirect_uri,
        state: state.secret().clone(),
        nonce: nonce.secret().clone(),
    })
}

/// `{authority}/{tenant}/oauth2/v2.0/authorize`
fn authorize_endpoint(config: &AuthConfig) -> Result<Url, Report<ConfigError>> {
    let invalid = |reason: String| ConfigError::InvalidSetting {
        name: "authority_url",
        reason,
    };

    let mut url = Url::parse(config.authority_url()).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot have a path".to_string()))?
        .pop_if_empty()
        .extend([config.tenant_id(), "oauth2", "v2.0", "authorize"]);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn redirect_uri(config: &AuthConfig, current_url: &str) -> Result<Url, Report<ConfigError>> {
    if let Some(configured) = config.redirect_uri() {
        let url = Url::parse(configured).map_err(|e| ConfigError::InvalidSetting {
            name: "redirect_uri",
            reason: e.to_string(),
        })?;
        return Ok(url);
    }

    let mut url = Url::parse(current_url).map_err(|e| ConfigError::RedirectUriUnavailable {
        reason: format!("current URL '{current_url}' is invalid: {e}"),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::RedirectUriUnavailable {
            reason: format!("current URL '{current_url}' is not an http(s) page URL"),
        }
        .into());
    }
    url.set_fragment(None);
    Ok(url)
}
