//! Error types for the identity crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `UrlParseError`: the page URL handed to the flow is malformed
//! - `DecodeError`: an identity token payload could not be decoded
//! - `StoreError`: the injected credential store failed
//! - `ConfigError`: required configuration is missing or invalid
//!
//! Only `ConfigError` escapes the authentication pass. The others degrade
//! locally and, where the caller needs to know, are reported on the outcome
//! as an [`AuthFailure`].

use std::fmt;

/// The page URL could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParseError {
    /// The rejected input.
    pub url: String,
    /// Why parsing failed.
    pub reason: String,
}

impl fmt::Display for UrlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid URL '{}': {}", self.url, self.reason)
    }
}

impl std::error::Error for UrlParseError {}

/// Errors from decoding an identity token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The token does not have a payload segment.
    MissingPayload { segments: usize },
    /// The payload segment is not base64url.
    InvalidBase64 { reason: String },
    /// The decoded payload is not UTF-8 text.
    InvalidUtf8 { reason: String },
    /// The decoded payload is not JSON.
    InvalidJson { reason: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPayload { segments } => {
                write!(f, "token has {segments} segment(s), expected a payload segment")
            }
            Self::InvalidBase64 { reason } => {
                write!(f, "token payload is not base64url: {reason}")
            }
            Self::InvalidUtf8 { reason } => {
                write!(f, "token payload is not UTF-8: {reason}")
            }
            Self::InvalidJson { reason } => {
                write!(f, "token payload is not JSON: {reason}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors from credential store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading a key failed.
    ReadFailed { key: String, reason: String },
    /// Writing a key failed.
    WriteFailed { key: String, reason: String },
    /// The store refused a write for lack of space.
    QuotaExceeded { key: String },
    /// Removing a key failed.
    RemoveFailed { key: String, reason: String },
    /// No store is configured.
    Unavailable,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { key, reason } => {
                write!(f, "failed to read '{key}' from credential store: {reason}")
            }
            Self::WriteFailed { key, reason } => {
                write!(f, "failed to write '{key}' to credential store: {reason}")
            }
            Self::QuotaExceeded { key } => {
                write!(f, "credential store quota exceeded writing '{key}'")
            }
            Self::RemoveFailed { key, reason } => {
                write!(f, "failed to remove '{key}' from credential store: {reason}")
            }
            Self::Unavailable => write!(f, "no credential store configured"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from missing or invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is empty.
    MissingSetting { name: &'static str },
    /// A setting has an unusable value.
    InvalidSetting { name: &'static str, reason: String },
    /// No redirect URI could be derived for the identity provider.
    RedirectUriUnavailable { reason: String },
    /// The flow was built without a credential store while one is required.
    MissingStore,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting { name } => {
                write!(f, "missing required setting: {name}")
            }
            Self::InvalidSetting { name, reason } => {
                write!(f, "invalid setting '{name}': {reason}")
            }
            Self::RedirectUriUnavailable { reason } => {
                write!(f, "cannot determine redirect URI: {reason}")
            }
            Self::MissingStore => {
                write!(f, "a credential store is required but none was supplied")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A non-fatal failure reported on an authentication outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// The page URL was malformed; no navigation decision was made.
    InvalidUrl(UrlParseError),
    /// The credential store failed; stored credentials were treated as absent.
    Store(StoreError),
    /// The identity provider returned an error response instead of tokens.
    Provider {
        error: String,
        description: Option<String>,
    },
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Provider {
                error,
                description: Some(description),
            } => write!(f, "identity provider error '{error}': {description}"),
            Self::Provider {
                error,
                description: None,
            } => write!(f, "identity provider error '{error}'"),
        }
    }
}

impl std::error::Error for AuthFailure {}
