//! Reads the user identity out of a session token.
//!
//! This is a **non-verifying** decode. The signature segment is never checked, so the result is trust-on-receipt: it
//! is fit for display (greeting the user, choosing which list to fetch) and nothing else. It is not a security
//! boundary. Anything the server authorizes must be re-validated server-side from the token itself.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use event_utils::Identity;

/// Standard alphabet, padding optional. URL-safe tokens are mapped onto it first.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// `header.payload.signature` → identity, or `None` if any step fails or `username`/`name` is missing or empty.
/// Never panics.
pub fn resolve(token: &str) -> Option<Identity> {
    let payload = payload_segment(token)?;
    let base64 = payload.replace('-', "+").replace('_', "/");

    let bytes = PAYLOAD_ENGINE
        .decode(base64.as_bytes())
        .inspect_err(|e| log::debug!("Invalid token payload encoding: {e}"))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .inspect_err(|e| log::debug!("Invalid token payload: {e}"))
        .ok()?;

    let text = |field: &str| {
        claims
            .get(field)
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let (Some(username), Some(name)) = (text("username"), text("name")) else {
        log::debug!("Token payload has no username or name");
        return None;
    };

    Some(Identity {
        username,
        name,
        photo_url: text("photoUrl"),
    })
}

fn payload_segment(token: &str) -> Option<&str> {
    let mut segments = token.split('.');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Some(payload)
        }
        _ => {
            log::debug!("Token is not made of three segments");
            None
        }
    }
}
