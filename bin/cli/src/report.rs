//! JSON views of flow results printed by the CLI.

use gatehouse_access::AccessMap;
use gatehouse_identity::{AuthOutcome, AuthReport, Navigation, NoOpReason, Session};
use serde::Serialize;

/// Printable form of an [`AuthOutcome`].
#[derive(Debug, Serialize)]
pub struct OutcomeView<'a> {
    pub navigation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NoOpReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub session: &'a Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

impl<'a> From<&'a AuthOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a AuthOutcome) -> Self {
        let (navigation, reason, target) = match outcome.navigation() {
            Navigation::NoOp(reason) => ("no_op", Some(*reason), None),
            Navigation::Proceed => ("proceed", None, None),
            Navigation::RedirectToLogin { target } => {
                ("redirect_to_login", None, Some(target.to_string()))
            }
            Navigation::RedirectToIdentityProvider { login } => (
                "redirect_to_identity_provider",
                None,
                Some(login.authorization_url().to_string()),
            ),
            Navigation::LoggedOut { login_page } => ("logged_out", None, Some(login_page.to_string())),
        };

        Self {
            navigation,
            reason,
            target,
            session: outcome.session(),
            error: outcome.error().map(ToString::to_string),
            follow_up: outcome.follow_up().map(|home| home.page().to_string()),
        }
    }
}

/// Printable form of an [`AuthReport`].
#[derive(Debug, Serialize)]
pub struct ReportView<'a> {
    pub outcome: OutcomeView<'a>,
    pub pages: &'a AccessMap,
    pub components: &'a AccessMap,
}

impl<'a> From<&'a AuthReport> for ReportView<'a> {
    fn from(report: &'a AuthReport) -> Self {
        Self {
            outcome: OutcomeView::from(&report.outcome),
            pages: &report.pages,
            components: &report.components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_identity::{AuthConfig, AuthFlow, MemoryStore, PageContext};
    use serde_json::json;
    use std::sync::Arc;

    fn flow() -> AuthFlow {
        AuthFlow::new(
            AuthConfig::new("common", "client-id"),
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn login_redirect_view() {
        let report = flow()
            .authenticate(
                "https://app/Dashboard",
                &PageContext::page(),
                gatehouse_access::PolicySource::json(r#"{"Dashboard": {"roles_enabled": ["admin"]}}"#),
                gatehouse_access::PolicySource::Absent,
            )
            .await;

        let value = serde_json::to_value(ReportView::from(&report)).expect("serialize");

        assert_eq!(value["outcome"]["navigation"], "redirect_to_login");
        assert_eq!(value["outcome"]["target"], "https://app/Login");
        assert_eq!(value["outcome"]["session"]["is_authenticated"], false);
        assert_eq!(value["pages"], json!({"Dashboard": {"hasAccess": false}}));
        assert_eq!(value["components"], json!({}));
    }

    #[tokio::test]
    async fn no_op_view_names_reason() {
        let outcome = flow()
            .resolve("https://app/editor/Dashboard", &PageContext::page())
            .await;

        let value = serde_json::to_value(OutcomeView::from(&outcome)).expect("serialize");

        assert_eq!(value["navigation"], "no_op");
        assert_eq!(value["reason"], "editor_mode");
        assert!(value.get("target").is_none());
        assert!(value.get("error").is_none());
    }
}
