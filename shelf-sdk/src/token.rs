//! Token expiry extraction.
//!
//! The client never verifies tokens; the backend does that. The `exp`
//! claim is decoded purely to know when to warn the user, so signature
//! validation is disabled and any token that won't decode silently
//! falls back to a configured TTL.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// When `token` stops being valid: its `exp` claim if one can be
/// decoded, otherwise `now + fallback_ttl`. Advisory only; nothing is
/// enforced client-side.
pub(crate) fn token_expiry(token: &str, fallback_ttl: Duration) -> DateTime<Utc> {
    match decoded_exp(token) {
        Some(exp) => exp,
        None => {
            debug!("token has no decodable exp claim, using fallback ttl");
            Utc::now() + chrono::Duration::seconds(fallback_ttl.as_secs() as i64)
        },
    }
}

fn decoded_exp(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Claims only; we have no key and expired tokens must still decode.
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data =
        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp?, 0)
}

/// An HS256 token with the given `exp`, for tests across this crate.
#[cfg(test)]
pub(crate) fn token_with_exp(exp: DateTime<Utc>) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({"sub": "user-1", "exp": exp.timestamp()}),
        &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}
