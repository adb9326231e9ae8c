use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::OriginError;

type HmacSha256 = Hmac<Sha256>;

/// Request header carrying the encoded origin token.
pub const ORIGIN_HEADER: &str = "x-app-origin";

/// How long a token stays valid after it was minted, in milliseconds.
pub const VALIDITY_WINDOW_MS: i64 = 300_000;

// ── Wire record ──────────────────────────────────────────────────────────────

/// The structured payload behind the `x-app-origin` header.
///
/// On the wire this is `base64(json)` with the JSON shaped exactly as
/// `{"timestamp": <ms since epoch>, "signature": "<hex hmac>"}`. Clients pass
/// the encoded form through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginToken {
    pub timestamp: i64,
    pub signature: String,
}

impl OriginToken {
    /// Build a token for `timestamp`, signed with `secret`.
    pub fn signed(secret: &[u8], timestamp: i64) -> Self {
        Self {
            timestamp,
            signature: sign(secret, timestamp),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing two primitive fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self, OriginError> {
        let bytes = STANDARD.decode(raw.trim()).map_err(|_| OriginError::Encoding)?;
        // Only a JSON object counts; serde would also take `[ts, "sig"]`.
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|_| OriginError::Malformed)?;
        if !value.is_object() {
            return Err(OriginError::Malformed);
        }
        serde_json::from_value(value).map_err(|_| OriginError::Malformed)
    }
}

/// Compute the lowercase hex HMAC-SHA256 of the decimal `timestamp`.
pub fn sign(secret: &[u8], timestamp: i64) -> String {
    sign_message(secret, timestamp.to_string().as_bytes())
}

pub(crate) fn sign_message(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_matches_wire_contract() {
        let token = OriginToken {
            timestamp: 1_700_000_000_000,
            signature: "abc123".into(),
        };
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"timestamp":1700000000000,"signature":"abc123"}"#);
    }

    #[test]
    fn decode_accepts_browser_encoded_token() {
        // btoa(JSON.stringify({timestamp: 42, signature: "ff"}))
        let raw = STANDARD.encode(r#"{"timestamp":42,"signature":"ff"}"#);
        let token = OriginToken::decode(&raw).unwrap();
        assert_eq!(token.timestamp, 42);
        assert_eq!(token.signature, "ff");
    }

    #[test]
    fn decode_round_trips_signed_token() {
        for timestamp in [0, -1, i64::MIN, i64::MAX, 1_700_000_123_456] {
            for secret in [&b"secret"[..], &b""[..], &b"another key"[..]] {
                let token = OriginToken::signed(secret, timestamp);
                assert_eq!(OriginToken::decode(&token.encode()).unwrap(), token);
            }
        }
    }

    #[test]
    fn decode_round_trips_arbitrary_signatures() {
        for signature in ["", "ff", "not hex at all", "quote\"and\\slash", "ümlaut"] {
            let token = OriginToken {
                timestamp: 42,
                signature: signature.into(),
            };
            assert_eq!(OriginToken::decode(&token.encode()).unwrap(), token);
        }
    }

    #[test]
    fn decode_rejects_positional_array_with_valid_signature() {
        let raw = STANDARD.encode(format!("[42,\"{}\"]", sign(b"s", 42)));
        assert!(matches!(
            OriginToken::decode(&raw),
            Err(OriginError::Malformed)
        ));
    }

    #[test]
    fn decode_rejects_bad_base64() {
        assert!(matches!(
            OriginToken::decode("not-base64!!!"),
            Err(OriginError::Encoding)
        ));
    }

    #[test]
    fn decode_rejects_wrong_field_types() {
        for body in [
            r#"{"timestamp":"42","signature":"ff"}"#,
            r#"{"timestamp":42.5,"signature":"ff"}"#,
            r#"{"timestamp":42,"signature":7}"#,
            r#"{"timestamp":42}"#,
            r#"[42,"ff"]"#,
            "plain text",
        ] {
            let raw = STANDARD.encode(body);
            assert!(
                matches!(OriginToken::decode(&raw), Err(OriginError::Malformed)),
                "expected malformed for {body}"
            );
        }
    }

    #[test]
    fn signature_is_hex_sha256() {
        let sig = sign(b"secret", 1);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn signature_depends_on_secret_and_timestamp() {
        assert_eq!(sign(b"a", 10), sign(b"a", 10));
        assert_ne!(sign(b"a", 10), sign(b"b", 10));
        assert_ne!(sign(b"a", 10), sign(b"a", 11));
    }

    #[test]
    fn signature_matches_known_vector() {
        // HMAC-SHA256(key="key", msg="The quick brown fox jumps over the lazy dog")
        assert_eq!(
            sign_message(b"key", b"The quick brown fox jumps over the lazy dog"),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }
}
