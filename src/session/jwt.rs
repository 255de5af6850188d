//! JWT claim decoding.
//!
//! Only the payload segment is read, and only for its `exp` claim. The
//! signature is not verified here; the backend does that on every request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    /// Seconds since epoch. Some issuers emit fractional values.
    exp: Option<f64>,
}

/// Expiry time of a token, if it carries a readable `exp` claim.
pub fn expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?.floor() as i64, 0)
}

/// Whether the token is unexpired at `now`. Undecodable tokens are expired.
pub fn is_unexpired(token: &str, now: DateTime<Utc>) -> bool {
    expiry(token).is_some_and(|exp| exp > now)
}

/// Build an unsigned token with the given claims (tests only).
#[cfg(test)]
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
