//! Parsing of the implicit-flow callback fragment.
//!
//! The identity provider returns tokens in the URL fragment
//! (`#access_token=...&id_token=...`), which never reaches a server. This
//! module reads that fragment straight from the raw URL string so that no
//! URL normalization can alter the token text.

use std::collections::BTreeMap;

/// Key/value pairs parsed from a URL fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentParams {
    params: BTreeMap<String, String>,
}

impl FragmentParams {
    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns true if the fragment held no usable pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of parsed pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Parses the fragment of `url` into key/value pairs.
///
/// Everything after the first `#` is split on `&`, and each pair on its first
/// `=`. Keys and values are percent-decoded. Pairs without `=`, or whose
/// decoding is not valid UTF-8, are skipped. When a key repeats, the first
/// occurrence wins. A URL without a fragment yields an empty result.
#[must_use]
pub fn parse_fragment(url: &str) -> FragmentParams {
    let Some((_, fragment)) = url.split_once('#') else {
        return FragmentParams::default();
    };

    let mut params = BTreeMap::new();
    for pair in fragment.split('&') {
        let Some((raw_key, raw_value)) = pair.split_once('=') else {
            continue;
        };
        let (Ok(key), Ok(value)) = (urlencoding::decode(raw_key), urlencoding::decode(raw_value))
        else {
            continue;
        };
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }

    FragmentParams { params }
}

/// Tokens returned by the identity provider in the callback fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackCredentials {
    /// The OAuth2 access token.
    pub access_token: Option<String>,
    /// The OIDC identity token.
    pub id_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackCredentials {
    /// Creates credentials from explicit tokens.
    #[must_use]
    pub fn new(access_token: Option<String>, id_token: Option<String>) -> Self {
        Self {
            access_token,
            id_token,
            error: None,
            error_description: None,
        }
    }

    /// Returns the OAuth2 error response (`error`, `error_description`), if
    /// the provider reported a failure instead of issuing tokens.
    #[must_use]
    pub fn provider_error(&self) -> Option<(&str, Option<&str>)> {
        self.error
            .as_deref()
            .map(|error| (error, self.error_description.as_deref()))
    }
}

/// Looks up `access_token` and `id_token` in parsed fragment parameters.
///
/// Token format is not validated here.
#[must_use]
pub fn extract_credentials(params: &FragmentParams) -> CallbackCredentials {
    let owned = |key: &str| params.get(key).map(str::to_string);
    CallbackCredentials {
        access_token: owned("access_token"),
        id_token: owned("id_token"),
        error: owned("error"),
        error_description: owned("error_description"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_after_hash() {
        let params = parse_fragment("https://app/Login#access_token=T1&id_token=T2&state=abc");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("access_token"), Some("T1"));
        assert_eq!(params.get("id_token"), Some("T2"));
        assert_eq!(params.get("state"), Some("abc"));
    }

    #[test]
    fn no_fragment_yields_empty() {
        assert!(parse_fragment("https://app/Dashboard").is_empty());
        assert!(parse_fragment("https://app/Dashboard#").is_empty());
    }

    #[test]
    fn pairs_without_equals_are_skipped() {
        let params = parse_fragment("https://app/#flag&access_token=T1&&");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("access_token"), Some("T1"));
    }

    #[test]
    fn value_splits_on_first_equals_only() {
        let params = parse_fragment("https://app/#token=abc==&x=");
        assert_eq!(params.get("token"), Some("abc=="));
        assert_eq!(params.get("x"), Some(""));
    }

    #[test]
    fn values_are_percent_decoded() {
        let params = parse_fragment(
            "https://app/#error_description=User%20cancelled%20%E2%9C%93&scope=openid%20profile",
        );
        assert_eq!(params.get("error_description"), Some("User cancelled ✓"));
        assert_eq!(params.get("scope"), Some("openid profile"));
    }

    #[test]
    fn invalid_utf8_pairs_are_skipped() {
        let params = parse_fragment("https://app/#bad=%FF%FE&good=1");
        assert_eq!(params.get("bad"), None);
        assert_eq!(params.get("good"), Some("1"));
    }

    #[test]
    fn first_duplicate_wins() {
        let params = parse_fragment("https://app/#access_token=first&access_token=second");
        assert_eq!(params.get("access_token"), Some("first"));
    }

    #[test]
    fn only_first_hash_starts_the_fragment() {
        let params = parse_fragment("https://app/#a=1#2&b=2");
        assert_eq!(params.get("a"), Some("1#2"));
        assert_eq!(params.get("b"), Some("2"));
    }

    #[test]
    fn extracts_both_tokens() {
        let creds = extract_credentials(&parse_fragment("https://app/#access_token=T1&id_token=T2"));
        assert_eq!(
            creds,
            CallbackCredentials::new(Some("T1".to_string()), Some("T2".to_string()))
        );
    }

    #[test]
    fn missing_id_token_is_absent() {
        let creds = extract_credentials(&parse_fragment("https://app/#access_token=T1"));
        assert_eq!(creds.access_token.as_deref(), Some("T1"));
        assert_eq!(creds.id_token, None);
        assert_eq!(creds.provider_error(), None);
    }

    #[test]
    fn reports_provider_error_response() {
        let creds = extract_credentials(&parse_fragment(
            "https://app/Login#error=access_denied&error_description=AADSTS50105",
        ));
        assert_eq!(creds.access_token, None);
        assert_eq!(
            creds.provider_error(),
            Some(("access_denied", Some("AADSTS50105")))
        );
    }
}
