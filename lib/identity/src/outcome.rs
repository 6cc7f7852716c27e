//! Results of an authentication pass.

use crate::error::AuthFailure;
use crate::idp::LoginInitiation;
use crate::navigate::{HomeRedirect, Navigator};
use crate::session::Session;
use gatehouse_access::{AccessMap, RoleSet};
use gatehouse_core::PageId;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// Why a pass made no navigation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// The application runs inside its editor or preview.
    EditorMode,
    /// The user is already on the login page.
    OnLoginPage,
    /// The page URL could not be parsed.
    InvalidUrl,
}

/// Where the user should go after a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Stay; authentication was not evaluated or nothing needs to change.
    NoOp(NoOpReason),
    /// Render the requested page with the outcome's session.
    Proceed,
    /// Send the user to the application's login page.
    RedirectToLogin { target: Url },
    /// Send the user to the identity provider.
    RedirectToIdentityProvider { login: LoginInitiation },
    /// Credentials were cleared; show the login page.
    LoggedOut { login_page: PageId },
}

/// Result of one authentication pass.
///
/// Carries at most one redirect target. A failure, when present, was
/// absorbed: the navigation decision already accounts for it.
#[derive(Debug)]
pub struct AuthOutcome {
    navigation: Navigation,
    session: Session,
    error: Option<AuthFailure>,
    follow_up: Option<HomeRedirect>,
}

impl AuthOutcome {
    pub(crate) fn new(navigation: Navigation, session: Session) -> Self {
        Self {
            navigation,
            session,
            error: None,
            follow_up: None,
        }
    }

    pub(crate) fn no_op(reason: NoOpReason) -> Self {
        Self::new(Navigation::NoOp(reason), Session::anonymous())
    }

    pub(crate) fn with_error(mut self, error: Option<AuthFailure>) -> Self {
        self.error = error;
        self
    }

    pub(crate) fn with_follow_up(mut self, follow_up: Option<HomeRedirect>) -> Self {
        self.follow_up = follow_up;
        self
    }

    /// Returns the navigation decision.
    #[must_use]
    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    /// Returns the session established by the pass.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns true if an access token is available.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Returns the user's roles.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        self.session.roles()
    }

    /// Returns the failure absorbed during the pass, if any.
    #[must_use]
    pub fn error(&self) -> Option<&AuthFailure> {
        self.error.as_ref()
    }

    /// Returns the login page URL when the user must log in.
    #[must_use]
    pub fn login_redirect_url(&self) -> Option<&Url> {
        match &self.navigation {
            Navigation::RedirectToLogin { target } => Some(target),
            _ => None,
        }
    }

    /// Returns the identity provider URL when the user is sent there.
    #[must_use]
    pub fn authorization_url(&self) -> Option<&Url> {
        match &self.navigation {
            Navigation::RedirectToIdentityProvider { login } => Some(login.authorization_url()),
            _ => None,
        }
    }

    /// Returns the pending home navigation, if one was scheduled.
    #[must_use]
    pub fn follow_up(&self) -> Option<&HomeRedirect> {
        self.follow_up.as_ref()
    }

    /// Takes the pending home navigation, leaving none behind.
    pub fn take_follow_up(&mut self) -> Option<HomeRedirect> {
        self.follow_up.take()
    }

    /// Issues the outcome's redirect through `navigator`.
    ///
    /// `Proceed` and `NoOp` issue nothing. The home follow-up is not run;
    /// take it with [`take_follow_up`](Self::take_follow_up).
    pub fn dispatch(&self, navigator: &dyn Navigator) {
        match &self.navigation {
            Navigation::RedirectToLogin { target } => {
                debug!(%target, "redirecting to login page");
                navigator.open_url(target);
            }
            Navigation::RedirectToIdentityProvider { login } => {
                debug!("redirecting to identity provider");
                navigator.open_url(login.authorization_url());
            }
            Navigation::LoggedOut { login_page } => {
                navigator.navigate(login_page);
            }
            Navigation::NoOp(_) | Navigation::Proceed => {}
        }
    }
}

/// An authentication outcome together with the access maps derived from it.
#[derive(Debug)]
pub struct AuthReport {
    /// The navigation decision and session.
    pub outcome: AuthOutcome,
    /// Access decisions for pages.
    pub pages: AccessMap,
    /// Access decisions for components.
    pub components: AccessMap,
}

impl AuthReport {
    /// Returns page and component decisions in one map.
    ///
    /// Component decisions overwrite page decisions with the same id.
    #[must_use]
    pub fn combined(&self) -> AccessMap {
        self.pages.clone().merge(self.components.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigate::testing::{RecordingNavigator, Visit};

    #[test]
    fn no_op_is_anonymous_and_silent() {
        let outcome = AuthOutcome::no_op(NoOpReason::EditorMode);
        let navigator = RecordingNavigator::default();

        outcome.dispatch(&navigator);

        assert!(!outcome.is_authenticated());
        assert!(outcome.login_redirect_url().is_none());
        assert!(outcome.authorization_url().is_none());
        assert!(navigator.visits().is_empty());
    }

    #[test]
    fn login_redirect_opens_target() {
        let target = Url::parse("https://app.example.com/Login").expect("url");
        let outcome = AuthOutcome::new(
            Navigation::RedirectToLogin {
                target: target.clone(),
            },
            Session::anonymous(),
        );
        let navigator = RecordingNavigator::default();

        outcome.dispatch(&navigator);

        assert_eq!(outcome.login_redirect_url(), Some(&target));
        assert_eq!(
            navigator.visits(),
            vec![Visit::Url("https://app.example.com/Login".to_string())]
        );
    }

    #[test]
    fn logged_out_navigates_to_login_page() {
        let outcome = AuthOutcome::new(
            Navigation::LoggedOut {
                login_page: PageId::new("Login"),
            },
            Session::anonymous(),
        );
        let navigator = RecordingNavigator::default();

        outcome.dispatch(&navigator);

        assert_eq!(navigator.visits(), vec![Visit::Page("Login".to_string())]);
    }
}
