//! Identity token claims.
//!
//! Tokens arrive straight from the tenant's token endpoint over TLS; the
//! payload segment is decoded without signature verification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// `amr` value reported for anonymous (guest) identities.
pub const AMR_APPID_ANON: &str = "appid_anon";

/// `amr` value reported for Cloud Directory (username/password) identities.
pub const AMR_CLOUD_DIRECTORY: &str = "cloud_directory";

/// Claims carried in an identity token payload.
///
/// Only the claims the pages consume are modeled as fields; everything else
/// the tenant adds is kept in `extra` so the token page can show the payload
/// in full.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(default)]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Authentication methods, most recent first.
    #[serde(default)]
    pub amr: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IdentityClaims {
    /// Whether the identity was established through anonymous login.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.amr.first().is_some_and(|m| m == AMR_APPID_ANON)
    }

    /// Whether the identity lives in the tenant's Cloud Directory, the only
    /// case where the provider-hosted account pages apply.
    #[must_use]
    pub fn is_cloud_directory(&self) -> bool {
        self.amr.first().is_some_and(|m| m == AMR_CLOUD_DIRECTORY)
    }
}

/// Decodes the claims object from the payload segment of an identity token.
///
/// # Errors
///
/// Returns `Error::Token` if the token has no payload segment, the payload is
/// not base64url, or the decoded payload is not a JSON claims object.
pub fn decode_identity_claims(token: &str) -> Result<IdentityClaims, Error> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) if !payload.is_empty() => payload,
        _ => {
            return Err(Error::Token(
                "identity token does not have a payload segment".into(),
            ))
        }
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| Error::Token(format!("identity token payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Token(format!("identity token payload is not a claims object: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn encode_token(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn decodes_modeled_and_extra_claims() {
        let token = encode_token(&json!({
            "sub": "user-1",
            "name": "Jane Doe",
            "email": "jane@example.com",
            "amr": ["cloud_directory"],
            "iss": "https://region.example.com/oauth/v4/tenant",
            "exp": 1_700_000_000,
        }));

        let claims = decode_identity_claims(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.name.as_deref(), Some("Jane Doe"));
        assert_eq!(claims.email.as_deref(), Some("jane@example.com"));
        assert!(claims.is_cloud_directory());
        assert!(!claims.is_anonymous());
        assert_eq!(
            claims.extra.get("iss").and_then(|v| v.as_str()),
            Some("https://region.example.com/oauth/v4/tenant")
        );
    }

    #[test]
    fn anonymous_identity_is_detected_from_amr() {
        let token = encode_token(&json!({
            "sub": "anon-1",
            "amr": ["appid_anon"],
        }));

        let claims = decode_identity_claims(&token).unwrap();
        assert!(claims.is_anonymous());
        assert!(!claims.is_cloud_directory());
        assert_eq!(claims.name, None);
    }

    #[test]
    fn amr_is_checked_at_the_first_position_only() {
        let token = encode_token(&json!({
            "sub": "user-2",
            "amr": ["google", "appid_anon"],
        }));

        let claims = decode_identity_claims(&token).unwrap();
        assert!(!claims.is_anonymous());
    }

    #[test]
    fn reserialized_claims_keep_the_extra_fields() {
        let token = encode_token(&json!({"sub": "user-3", "tenant": "t-1"}));
        let claims = decode_identity_claims(&token).unwrap();

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["sub"], "user-3");
        assert_eq!(value["tenant"], "t-1");
        // Absent optional claims stay absent instead of serializing as null.
        assert!(value.get("name").is_none());
    }

    #[test]
    fn rejects_tokens_without_a_payload_segment() {
        assert!(decode_identity_claims("justonechunk").is_err());
        assert!(decode_identity_claims("").is_err());
    }

    #[test]
    fn rejects_payloads_that_are_not_base64url() {
        let err = decode_identity_claims("header.!!!.sig").unwrap_err();
        assert!(err.to_string().contains("base64url"));
    }

    #[test]
    fn rejects_payloads_that_are_not_json_objects() {
        let payload = URL_SAFE_NO_PAD.encode("plain text");
        let err = decode_identity_claims(&format!("h.{payload}.s")).unwrap_err();
        assert!(err.to_string().contains("claims object"));
    }
}
