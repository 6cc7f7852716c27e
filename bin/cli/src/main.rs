//! `gatehouse`: drives the authentication flow from the command line.
//!
//! Credentials are remembered in a JSON file between invocations, standing in
//! for the browser storage an embedded application would use.

mod config;
mod report;
mod store;

use clap::{Parser, Subcommand};
use gatehouse_access::{AccessEvaluator, PolicySource, RoleSet, resolve_policy};
use gatehouse_core::PageId;
use gatehouse_identity::{AuthConfig, AuthFlow, Navigator, PageContext};
use report::{OutcomeView, ReportView};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use store::FileStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(
    name = "gatehouse",
    about = "Role-gated page access behind an identity-provider login"
)]
struct Cli {
    /// Configuration file (toml, json or yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Credential store file.
    #[arg(long, global = true, default_value = "gatehouse-credentials.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the authentication pass for a page URL and print the report.
    Resolve {
        /// The current page URL, including any callback fragment.
        url: String,

        /// Treat the page as rendered inside the application editor.
        #[arg(long)]
        editor: bool,

        /// Page policies: inline JSON or @path.
        #[arg(long)]
        pages: Option<String>,

        /// Component policies: inline JSON or @path.
        #[arg(long)]
        components: Option<String>,
    },

    /// Print the identity provider authorization URL.
    Login {
        /// The current page URL; the provider redirects back here.
        url: String,
    },

    /// Clear stored credentials.
    Logout,

    /// Evaluate a policy for a set of roles and print the access map.
    Check {
        /// Comma-separated roles.
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        /// Evaluate as a user without an access token.
        #[arg(long)]
        unauthenticated: bool,

        /// Policies: inline JSON or @path.
        #[arg(long)]
        policy: String,
    },
}

/// Reports navigation requests on stderr.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, page: &PageId) {
        tracing::info!(%page, "navigate to page");
    }

    fn open_url(&self, url: &Url) {
        tracing::info!(%url, "open URL");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Resolve {
            url,
            editor,
            pages,
            components,
        } => {
            let ctx = PageContext {
                editor_mode: editor,
            };
            run_resolve(config, &cli.store, &url, ctx, pages, components).await
        }
        Command::Login { url } => run_login(config, &cli.store, &url),
        Command::Logout => run_logout(config, &cli.store).await,
        Command::Check {
            roles,
            unauthenticated,
            policy,
        } => run_check(&config, &roles, !unauthenticated, &policy).await,
    }
}

fn flow(config: AuthConfig, store: &Path) -> AuthFlow {
    AuthFlow::new(config, Arc::new(FileStore::new(store)))
}

async fn run_resolve(
    config: AuthConfig,
    store: &Path,
    url: &str,
    ctx: PageContext,
    pages: Option<String>,
    components: Option<String>,
) -> ExitCode {
    let (pages, components) = match (
        policy_source(pages.as_deref()).await,
        policy_source(components.as_deref()).await,
    ) {
        (Ok(pages), Ok(components)) => (pages, components),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Policy error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let flow = flow(config, store);
    let mut report = flow.authenticate(url, &ctx, pages, components).await;
    if let Err(code) = print_json(&ReportView::from(&report)) {
        return code;
    }

    let navigator: Arc<dyn Navigator> = Arc::new(ConsoleNavigator);
    report.outcome.dispatch(navigator.as_ref());
    if let Some(home) = report.outcome.take_follow_up() {
        home.schedule(navigator).wait().await;
    }

    ExitCode::SUCCESS
}

fn run_login(config: AuthConfig, store: &Path, url: &str) -> ExitCode {
    match flow(config, store).start_identity_provider_login(url) {
        Ok(login) => {
            println!("{}", login.authorization_url());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Login error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_logout(config: AuthConfig, store: &Path) -> ExitCode {
    let outcome = flow(config, store).logout().await;
    if let Err(code) = print_json(&OutcomeView::from(&outcome)) {
        return code;
    }
    if outcome.error().is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run_check(
    config: &AuthConfig,
    roles: &[String],
    is_authenticated: bool,
    policy: &str,
) -> ExitCode {
    let source = match policy_source(Some(policy)).await {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Policy error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let roles = RoleSet::from_names(roles.iter().map(|r| r.trim()).filter(|r| !r.is_empty()));
    let acl = AccessEvaluator::new(config.open_resources()).build_acl(
        &resolve_policy(source),
        &roles,
        is_authenticated,
    );

    match print_json(&acl) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

/// Reads a policy argument: `@path` names a file, anything else is inline JSON.
async fn policy_source(arg: Option<&str>) -> std::io::Result<PolicySource> {
    match arg {
        None => Ok(PolicySource::Absent),
        Some(arg) => match arg.strip_prefix('@') {
            Some(path) => Ok(PolicySource::json(tokio::fs::read_to_string(path).await?)),
            None => Ok(PolicySource::json(arg)),
        },
    }
}

fn print_json(value: &impl Serialize) -> Result<(), ExitCode> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Output error: {e}");
            Err(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_access::PolicyMap;

    #[test]
    fn cli_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gatehouse",
            "check",
            "--roles",
            "admin,viewer",
            "--policy",
            "{}",
            "--store",
            "/tmp/creds.json",
        ])
        .expect("parse");

        assert_eq!(cli.store, PathBuf::from("/tmp/creds.json"));
        match cli.command {
            Command::Check { roles, unauthenticated, .. } => {
                assert_eq!(roles, vec!["admin", "viewer"]);
                assert!(!unauthenticated);
            }
            _ => panic!("expected check"),
        }
    }

    #[tokio::test]
    async fn policy_source_reads_inline_and_file() {
        let inline = policy_source(Some(r#"{"Admin": {"roles_enabled": ["admin"]}}"#))
            .await
            .expect("inline");
        assert_eq!(resolve_policy(inline).len(), 1);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pages.json");
        std::fs::write(&path, r#"{"A": {}, "B": {}}"#).expect("write");
        let from_file = policy_source(Some(&format!("@{}", path.display())))
            .await
            .expect("file");
        assert_eq!(resolve_policy(from_file).len(), 2);

        let absent = policy_source(None).await.expect("absent");
        assert_eq!(resolve_policy(absent), PolicyMap::new());
    }

    #[tokio::test]
    async fn policy_source_reports_missing_file() {
        assert!(policy_source(Some("@/nonexistent/gatehouse/pages.json")).await.is_err());
    }

    #[tokio::test]
    async fn callback_then_reload_through_file_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = dir.path().join("credentials.json");
        let config = AuthConfig::new("common", "client-id");

        let callback = flow(config.clone(), &store)
            .resolve("https://app/Login#access_token=abc", &PageContext::page())
            .await;
        assert!(callback.is_authenticated());

        let reload = flow(config.clone(), &store)
            .resolve("https://app/Dashboard", &PageContext::page())
            .await;
        assert!(reload.is_authenticated());

        assert_eq!(run_logout(config.clone(), &store).await, ExitCode::SUCCESS);
        let after = flow(config, &store)
            .resolve("https://app/Dashboard", &PageContext::page())
            .await;
        assert!(after.login_redirect_url().is_some());
    }
}
