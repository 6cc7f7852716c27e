//! Identity-provider redirect flow for gatehouse.
//!
//! This crate provides:
//! - Parsing of the provider's callback fragment (`parse_fragment`)
//! - Unverified decoding of identity token claims (`decode_claims`)
//! - The pluggable credential store (`CredentialStore`, `MemoryStore`)
//! - The per-page authentication pass (`AuthFlow`)
//! - Login initiation and logout
//!
//! # Authentication Pass
//!
//! Every page load runs [`AuthFlow::resolve`] over the current URL. The pass
//! either leaves the page alone (editor mode, login page), processes the
//! provider callback and remembers the user, or checks the store and sends
//! anonymous users to the login page. The result is an [`AuthOutcome`] that
//! the host applies through its [`Navigator`].
//!
//! Token signatures and expiry are not verified. Roles read from the
//! identity token are only as trustworthy as the channel that delivered it;
//! any backend must validate the access token itself.
//!
//! # Example
//!
//! ```
//! use gatehouse_identity::{AuthConfig, AuthFlow, MemoryStore, PageContext};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let flow = AuthFlow::new(AuthConfig::new("common", "client-id"), Arc::new(MemoryStore::new()));
//!
//! let outcome = flow.resolve("https://app.example.com/Dashboard", &PageContext::page()).await;
//!
//! assert_eq!(
//!     outcome.login_redirect_url().map(|url| url.as_str()),
//!     Some("https://app.example.com/Login"),
//! );
//! # });
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod flow;
pub mod fragment;
pub mod idp;
pub mod navigate;
pub mod outcome;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use claims::{Claims, decode_claims, decode_claims_lossy};
pub use config::{AuthConfig, AuthConfigBuilder};
pub use error::{AuthFailure, ConfigError, DecodeError, StoreError, UrlParseError};
pub use flow::{AuthFlow, AuthFlowBuilder, PageContext};
pub use fragment::{CallbackCredentials, FragmentParams, extract_credentials, parse_fragment};
pub use idp::{LoginInitiation, build_login};
pub use navigate::{HomeRedirect, Navigator, ScheduledNavigation};
pub use outcome::{AuthOutcome, AuthReport, Navigation, NoOpReason};
pub use session::Session;
pub use store::{CredentialKeys, CredentialStore, MemoryStore};
