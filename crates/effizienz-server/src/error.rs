use thiserror::Error;

/// Why an origin token was rejected.
///
/// These reasons are for server-side logs only. Callers always see the same
/// generic rejection so the variants cannot be used to tune replays or probe
/// the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("origin header missing or empty")]
    Missing,
    #[error("origin header is not valid base64")]
    Encoding,
    #[error("origin token is not a {{timestamp, signature}} record")]
    Malformed,
    #[error("origin token expired")]
    Expired,
    #[error("origin token timestamp is in the future")]
    FutureDated,
    #[error("origin token signature mismatch")]
    SignatureMismatch,
}
