//! The authentication redirect state machine.
//!
//! Each page load runs one pass over the current URL:
//!
//! ```text
//! Start ─┬─ unparseable URL ──────────► NoOp(InvalidUrl)
//!        ├─ editor mode ──────────────► NoOp(EditorMode)
//!        ├─ fragment present ─► ProcessCallback ─► Proceed
//!        ├─ on login page ────────────► NoOp(OnLoginPage)
//!        └─ otherwise ─► CheckStore ─┬─► Proceed          (token stored)
//!                                    └─► RedirectToLogin  (no token)
//! ```
//!
//! The pass holds no state between calls. Everything that must survive a
//! reload goes through the injected [`CredentialStore`].

use crate::claims::{Claims, decode_claims_lossy};
use crate::config::AuthConfig;
use crate::error::{AuthFailure, ConfigError, StoreError, UrlParseError};
use crate::fragment::{extract_credentials, parse_fragment};
use crate::idp::{LoginInitiation, build_login};
use crate::navigate::HomeRedirect;
use crate::outcome::{AuthOutcome, AuthReport, Navigation, NoOpReason};
use crate::session::Session;
use crate::store::{CredentialKeys, CredentialStore};
use gatehouse_access::{AccessEvaluator, PolicySource, resolve_policy};
use rootcause::prelude::Report;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Host-supplied facts about the current page load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageContext {
    /// The application is rendered inside its editor or preview.
    pub editor_mode: bool,
}

impl PageContext {
    /// Context of a regular page load.
    #[must_use]
    pub fn page() -> Self {
        Self::default()
    }

    /// Context of a load inside the application editor.
    #[must_use]
    pub fn editor() -> Self {
        Self { editor_mode: true }
    }
}

/// Builder for [`AuthFlow`].
pub struct AuthFlowBuilder {
    config: AuthConfig,
    store: Option<Arc<dyn CredentialStore>>,
}

impl AuthFlowBuilder {
    /// Supplies the credential store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the flow.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingStore` if no store was supplied and the
    /// configuration requires one.
    pub fn build(self) -> Result<AuthFlow, Report<ConfigError>> {
        if self.store.is_none() {
            if self.config.require_store() {
                return Err(ConfigError::MissingStore.into());
            }
            warn!("no credential store supplied; users will never be remembered");
        }

        Ok(AuthFlow {
            keys: self.config.credential_keys(),
            evaluator: AccessEvaluator::new(self.config.open_resources()),
            config: self.config,
            store: self.store,
        })
    }
}

/// Authentication pass over page URLs.
pub struct AuthFlow {
    config: AuthConfig,
    keys: CredentialKeys,
    evaluator: AccessEvaluator,
    store: Option<Arc<dyn CredentialStore>>,
}

impl AuthFlow {
    /// Creates a flow builder.
    #[must_use]
    pub fn builder(config: AuthConfig) -> AuthFlowBuilder {
        AuthFlowBuilder {
            config,
            store: None,
        }
    }

    /// Creates a flow over a store.
    #[must_use]
    pub fn new(config: AuthConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            keys: config.credential_keys(),
            evaluator: AccessEvaluator::new(config.open_resources()),
            config,
            store: Some(store),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns the access evaluator configured for this flow.
    #[must_use]
    pub fn evaluator(&self) -> &AccessEvaluator {
        &self.evaluator
    }

    /// Decides where the user goes for the page at `url`.
    ///
    /// Never fails: malformed URLs and store failures are absorbed into the
    /// outcome and reported through [`AuthOutcome::error`].
    #[instrument(skip(self, url), fields(editor_mode = ctx.editor_mode))]
    pub async fn resolve(&self, url: &str, ctx: &PageContext) -> AuthOutcome {
        let parsed = match parse_page_url(url) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "page URL rejected; no navigation decision made");
                return AuthOutcome::no_op(NoOpReason::InvalidUrl)
                    .with_error(Some(AuthFailure::InvalidUrl(err)));
            }
        };

        if ctx.editor_mode || self.is_editor_path(&parsed) {
            debug!(path = parsed.path(), "editor mode; bypassing authentication");
            return AuthOutcome::no_op(NoOpReason::EditorMode);
        }

        if parsed.fragment().is_some_and(|f| !f.is_empty()) {
            return self.process_callback(url).await;
        }

        if self.is_login_page(&parsed) {
            debug!("already on login page");
            return AuthOutcome::no_op(NoOpReason::OnLoginPage);
        }

        self.check_store(&parsed).await
    }

    /// Resolves the outcome and evaluates both policy sources against it.
    pub async fn authenticate(
        &self,
        url: &str,
        ctx: &PageContext,
        pages: impl Into<PolicySource>,
        components: impl Into<PolicySource>,
    ) -> AuthReport {
        let outcome = self.resolve(url, ctx).await;
        let roles = outcome.roles();
        let is_authenticated = outcome.is_authenticated();

        let pages = self
            .evaluator
            .build_acl(&resolve_policy(pages.into()), roles, is_authenticated);
        let components =
            self.evaluator
                .build_acl(&resolve_policy(components.into()), roles, is_authenticated);

        info!(
            is_authenticated,
            pages = pages.len(),
            components = components.len(),
            "authentication complete"
        );

        AuthReport {
            outcome,
            pages,
            components,
        }
    }

    /// Builds the identity-provider authorization request for `current_url`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the request cannot be built; the user must
    /// not be sent to a broken authorization URL.
    pub fn start_identity_provider_login(
        &self,
        current_url: &str,
    ) -> Result<LoginInitiation, Report<ConfigError>> {
        let login = build_login(&self.config, current_url)?;
        info!(redirect_uri = %login.redirect_uri(), "starting identity provider login");
        Ok(login)
    }

    /// Like [`start_identity_provider_login`](Self::start_identity_provider_login),
    /// wrapped as an outcome for [`AuthOutcome::dispatch`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the request cannot be built.
    pub fn login(&self, current_url: &str) -> Result<AuthOutcome, Report<ConfigError>> {
        let login = self.start_identity_provider_login(current_url)?;
        Ok(AuthOutcome::new(
            Navigation::RedirectToIdentityProvider { login },
            Session::anonymous(),
        ))
    }

    /// Clears stored credentials and sends the user to the login page.
    ///
    /// Idempotent: clearing an empty store is not an error. A failing store
    /// is reported on the outcome.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> AuthOutcome {
        let mut failure = None;

        if let Some(store) = &self.store {
            for key in [self.keys.access_token(), self.keys.claims()] {
                if let Err(report) = store.remove(key).await {
                    warn!(error = %report, "failed to clear stored credential");
                    failure.get_or_insert(AuthFailure::Store(report.current_context().clone()));
                }
            }
        }

        info!("logged out");
        AuthOutcome::new(
            Navigation::LoggedOut {
                login_page: self.config.login_page_id().clone(),
            },
            Session::anonymous(),
        )
        .with_error(failure)
    }

    async fn process_callback(&self, url: &str) -> AuthOutcome {
        let credentials = extract_credentials(&parse_fragment(url));
        let provider_error = credentials
            .provider_error()
            .map(|(error, description)| AuthFailure::Provider {
                error: error.to_string(),
                description: description.map(str::to_string),
            });

        let claims = credentials.id_token.as_deref().and_then(decode_claims_lossy);
        let mut session = Session::new(claims, false)
            .with_tokens(credentials.access_token.clone(), credentials.id_token.clone());

        let Some(access_token) = credentials.access_token.as_deref() else {
            if let Some(failure) = &provider_error {
                warn!(error = %failure, "identity provider returned an error");
            } else {
                info!("callback fragment carried no access token");
            }
            return AuthOutcome::new(Navigation::Proceed, session).with_error(provider_error);
        };

        // Nothing below may navigate until the store write has resolved.
        match self.persist(access_token, session.claims()).await {
            Ok(()) => {
                session.set_authenticated(true);
                info!(
                    user = session
                        .claims()
                        .and_then(Claims::display_label)
                        .unwrap_or("unknown"),
                    roles = session.roles().len(),
                    "callback credentials stored"
                );
                let follow_up = self.config.auto_redirect_home().then(|| {
                    HomeRedirect::new(
                        self.config.home_page_id().clone(),
                        self.config.home_redirect_delay(),
                    )
                });
                AuthOutcome::new(Navigation::Proceed, session)
                    .with_error(provider_error)
                    .with_follow_up(follow_up)
            }
            Err(report) => {
                warn!(error = %report, "failed to persist callback credentials");
                AuthOutcome::new(Navigation::Proceed, session)
                    .with_error(Some(AuthFailure::Store(report.current_context().clone())))
            }
        }
    }

    async fn persist(
        &self,
        access_token: &str,
        claims: Option<&Claims>,
    ) -> Result<(), Report<StoreError>> {
        let store = self.store()?;
        store.set(self.keys.access_token(), access_token).await?;

        let claims_write = match claims {
            Some(claims) => store.set(self.keys.claims(), &claims.to_json()).await,
            None => store.remove(self.keys.claims()).await,
        };
        if let Err(report) = claims_write {
            // Leave no token behind without its claims.
            if let Err(rollback) = store.remove(self.keys.access_token()).await {
                warn!(error = %rollback, "failed to roll back stored access token");
            }
            return Err(report);
        }

        Ok(())
    }

    async fn check_store(&self, url: &Url) -> AuthOutcome {
        let stored = match self.store() {
            Ok(store) => store.get(self.keys.access_token()).await,
            Err(report) => Err(report),
        };

        match stored {
            Ok(Some(access_token)) => {
                let (claims, failure) = self.stored_claims().await;
                debug!(has_claims = claims.is_some(), "using stored credentials");
                let session = Session::new(claims, true).with_tokens(Some(access_token), None);
                AuthOutcome::new(Navigation::Proceed, session).with_error(failure)
            }
            Ok(None) => {
                let target = self.login_redirect_url(url);
                info!(%target, "no stored credentials; redirecting to login");
                AuthOutcome::new(Navigation::RedirectToLogin { target }, Session::anonymous())
            }
            Err(report) => {
                warn!(error = %report, "credential store unreadable; treating user as logged out");
                let target = self.login_redirect_url(url);
                AuthOutcome::new(Navigation::RedirectToLogin { target }, Session::anonymous())
                    .with_error(Some(AuthFailure::Store(report.current_context().clone())))
            }
        }
    }

    async fn stored_claims(&self) -> (Option<Claims>, Option<AuthFailure>) {
        let Ok(store) = self.store() else {
            return (None, None);
        };
        match store.get(self.keys.claims()).await {
            Ok(Some(blob)) => match Claims::from_json(&blob) {
                Ok(claims) => (Some(claims), None),
                Err(report) => {
                    warn!(error = %report, "ignoring unreadable stored claims");
                    (None, None)
                }
            },
            Ok(None) => (None, None),
            Err(report) => {
                warn!(error = %report, "failed to read stored claims");
                (None, Some(AuthFailure::Store(report.current_context().clone())))
            }
        }
    }

    fn store(&self) -> Result<&dyn CredentialStore, Report<StoreError>> {
        match &self.store {
            Some(store) => Ok(store.as_ref()),
            None => Err(StoreError::Unavailable.into()),
        }
    }

    fn is_editor_path(&self, url: &Url) -> bool {
        let marker = self.config.editor_path_segment();
        !marker.is_empty() && decoded_path_segments(url).any(|segment| segment == marker)
    }

    fn is_login_page(&self, url: &Url) -> bool {
        decoded_path_segments(url)
            .last()
            .is_some_and(|segment| segment == self.config.login_page_id().as_str())
    }

    /// The current URL with its last path segment replaced by the login page
    /// (appended to an empty path), without fragment. The query is kept.
    fn login_redirect_url(&self, url: &Url) -> Url {
        // Encoded up front so the segment decodes back to the page id.
        let login = urlencoding::encode(self.config.login_page_id().as_str());
        let mut segments: Vec<&str> = path_segments(url).collect();
        match segments.last_mut() {
            Some(last) => *last = &*login,
            None => segments.push(&*login),
        }

        let mut target = url.clone();
        target.set_path(&format!("/{}", segments.join("/")));
        target.set_fragment(None);
        target
    }
}

fn parse_page_url(url: &str) -> Result<Url, UrlParseError> {
    // Keep tokens out of errors and logs.
    let redacted = url.split('#').next().unwrap_or_default().to_string();

    let parsed = Url::parse(url).map_err(|e| UrlParseError {
        url: redacted.clone(),
        reason: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(UrlParseError {
            url: redacted,
            reason: "URL has no hierarchical path".to_string(),
        });
    }
    Ok(parsed)
}

/// Non-empty path segments of a hierarchical URL.
fn path_segments(url: &Url) -> impl Iterator<Item = &str> {
    url.path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
}

/// Path segments as the page ids they name. Undecodable segments stay raw.
fn decoded_path_segments(url: &Url) -> impl Iterator<Item = Cow<'_, str>> {
    path_segments(url)
        .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
}
