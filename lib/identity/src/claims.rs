//! Identity token claims.
//!
//! Tokens are JWT-style: `base64url(header).base64url(payload).signature`.
//! Only the payload is decoded. The signature is NOT verified, so a
//! successfully decoded token must never be treated as proof of
//! authenticity; it only tells the UI which roles the provider claims the
//! user has.

use crate::error::DecodeError;
use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use gatehouse_access::RoleSet;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Standard-alphabet engine that accepts payloads with or without padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims decoded from an identity token payload.
///
/// No schema is enforced beyond "valid JSON". Claims are read defensively:
/// a claim of an unexpected type is treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Value);

impl Claims {
    /// Wraps an already-parsed claims value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a string claim by name.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns the roles carried in the `roles` claim.
    ///
    /// A missing or non-array claim yields an empty set.
    #[must_use]
    pub fn roles(&self) -> RoleSet {
        RoleSet::from_claim(self.get("roles"))
    }

    /// Returns a human-readable label for diagnostics.
    ///
    /// Uses the first of `email`, `upn` and `name` that is present. Never use
    /// this for access decisions.
    #[must_use]
    pub fn display_label(&self) -> Option<&str> {
        ["email", "upn", "name"]
            .into_iter()
            .find_map(|claim| self.get_str(claim))
    }

    /// Returns the raw claims value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Serializes the claims for the credential store.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }

    /// Reads claims back from a serialized blob.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidJson` if the blob is not JSON.
    pub fn from_json(blob: &str) -> Result<Self, Report<DecodeError>> {
        let value = serde_json::from_str(blob).map_err(|e| DecodeError::InvalidJson {
            reason: e.to_string(),
        })?;
        Ok(Self(value))
    }
}

/// Decodes the payload segment of a token into claims.
///
/// The payload is converted from the base64url alphabet to the standard one
/// (`-` to `+`, `_` to `/`), decoded with or without padding, read as UTF-8
/// and parsed as JSON.
///
/// # Errors
///
/// Returns `DecodeError` if the token has no payload segment or any decoding
/// step fails.
pub fn decode_claims(token: &str) -> Result<Claims, Report<DecodeError>> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() < 2 {
        return Err(DecodeError::MissingPayload {
            segments: segments.len(),
        }
        .into());
    }

    let payload = segments[1].replace('-', "+").replace('_', "/");
    let bytes = PAYLOAD_ENGINE
        .decode(payload.as_bytes())
        .map_err(|e| DecodeError::InvalidBase64 {
            reason: e.to_string(),
        })?;
    let text = String::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
        reason: e.to_string(),
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| DecodeError::InvalidJson {
        reason: e.to_string(),
    })?;

    Ok(Claims(value))
}

/// Decodes a token, degrading any failure to "no claims".
#[must_use]
pub fn decode_claims_lossy(token: &str) -> Option<Claims> {
    match decode_claims(token) {
        Ok(claims) => {
            debug!(
                user = claims.display_label().unwrap_or("unknown"),
                roles = claims.roles().len(),
                "decoded identity token"
            );
            Some(claims)
        }
        Err(report) => {
            warn!(error = %report, "failed to decode identity token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token_for(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    #[test]
    fn round_trips_claims_with_non_ascii_values() {
        let claims = json!({
            "name": "Zoë Ångström",
            "email": "zoe@example.com",
            "roles": ["admin", "редактор"],
            "tid": "e6a1c2f0"
        });

        let decoded = decode_claims(&token_for(&claims)).expect("decode");

        assert_eq!(decoded.as_value(), &claims);
        assert_eq!(decoded.roles(), RoleSet::from_names(["admin", "редактор"]));
    }

    #[test]
    fn decodes_url_safe_characters() {
        for note in ["??>", "???"] {
            let claims = json!({"note": note, "roles": ["a"]});
            let token = token_for(&claims);
            assert!(token.contains('-') || token.contains('_'));

            let decoded = decode_claims(&token).expect("decode");
            assert_eq!(decoded.get_str("note"), Some(note));
        }
    }

    #[test]
    fn accepts_padded_payload() {
        let payload = base64::engine::general_purpose::STANDARD.encode(r#"{"roles":["admin"]}"#);
        let decoded = decode_claims(&format!("h.{payload}.s")).expect("decode");
        assert_eq!(decoded.roles(), RoleSet::from_names(["admin"]));
    }

    #[test]
    fn signature_segment_is_optional() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"roles":[]}"#);
        assert!(decode_claims(&format!("header.{payload}")).is_ok());
    }

    #[test]
    fn single_segment_is_missing_payload() {
        let err = decode_claims("not-a-jwt").unwrap_err();
        assert_eq!(
            err.current_context(),
            &DecodeError::MissingPayload { segments: 1 }
        );
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = decode_claims("h.!!!!.s").unwrap_err();
        assert!(matches!(
            err.current_context(),
            DecodeError::InvalidBase64 { .. }
        ));
    }

    #[test]
    fn non_utf8_payload_is_rejected() {
        let payload = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
        let err = decode_claims(&format!("h.{payload}.s")).unwrap_err();
        assert!(matches!(err.current_context(), DecodeError::InvalidUtf8 { .. }));
    }

    #[test]
    fn non_json_payload_is_rejected() {
        let payload = URL_SAFE_NO_PAD.encode("hello");
        let err = decode_claims(&format!("h.{payload}.s")).unwrap_err();
        assert!(matches!(err.current_context(), DecodeError::InvalidJson { .. }));
    }

    #[test]
    fn lossy_decode_degrades_to_none() {
        assert!(decode_claims_lossy("garbage").is_none());
        assert!(decode_claims_lossy(&token_for(&json!({"roles": ["x"]}))).is_some());
    }

    #[test]
    fn roles_claim_of_wrong_type_is_empty() {
        let claims = Claims::new(json!({"roles": "admin", "groups": ["admin"]}));
        assert!(claims.roles().is_empty());
    }

    #[test]
    fn display_label_prefers_email_then_upn_then_name() {
        let claims = Claims::new(json!({"name": "Ada", "upn": "ada@corp"}));
        assert_eq!(claims.display_label(), Some("ada@corp"));

        let claims = Claims::new(json!({"name": "Ada", "email": "ada@example.com"}));
        assert_eq!(claims.display_label(), Some("ada@example.com"));

        assert_eq!(Claims::new(json!([1, 2])).display_label(), None);
    }

    #[test]
    fn stored_blob_round_trips() {
        let claims = Claims::new(json!({"roles": ["admin"], "name": "Zoë"}));
        let restored = Claims::from_json(&claims.to_json()).expect("from_json");
        assert_eq!(restored, claims);
    }
}
