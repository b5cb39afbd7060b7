//! EventSub webhook signature verification.
//!
//! The provider signs `message_id || timestamp || body` with HMAC-SHA256
//! using the secret given at subscription time and sends the digest as
//! `sha256=<hex>`.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const HEADER_MESSAGE_ID: &str = "Twitch-Eventsub-Message-Id";
pub const HEADER_TIMESTAMP: &str = "Twitch-Eventsub-Message-Timestamp";
pub const HEADER_SIGNATURE: &str = "Twitch-Eventsub-Message-Signature";
pub const HEADER_MESSAGE_TYPE: &str = "Twitch-Eventsub-Message-Type";

type HmacSha256 = Hmac<Sha256>;

pub(crate) fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Compute the `sha256=<hex>` signature for a delivery.
pub fn sign(secret: &[u8], message_id: &str, timestamp: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return String::new();
    };
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Check the delivery signature headers against `body`.
pub fn verify_delivery(secret: &[u8], headers: &HeaderMap, body: &[u8]) -> bool {
    let (Some(message_id), Some(timestamp), Some(provided)) = (
        header(headers, HEADER_MESSAGE_ID),
        header(headers, HEADER_TIMESTAMP),
        header(headers, HEADER_SIGNATURE),
    ) else {
        return false;
    };

    let Some(provided_hex) = provided.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(provided_bytes) = hex::decode(provided_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(provided_bytes.as_slice()).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"s3cr3t-webhook-key";

    fn signed_headers(message_id: &str, timestamp: &str, body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_MESSAGE_ID, message_id.parse().unwrap());
        headers.insert(HEADER_TIMESTAMP, timestamp.parse().unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            sign(SECRET, message_id, timestamp, body).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn valid_signature_accepted() {
        let body = br#"{"event":{}}"#;
        let headers = signed_headers("m1", "2023-01-01T00:00:00Z", body);
        assert!(verify_delivery(SECRET, &headers, body));
    }

    #[test]
    fn tampered_body_rejected() {
        let headers = signed_headers("m1", "2023-01-01T00:00:00Z", b"original");
        assert!(!verify_delivery(SECRET, &headers, b"tampered"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let body = b"payload";
        let headers = signed_headers("m1", "2023-01-01T00:00:00Z", body);
        assert!(!verify_delivery(b"other-secret", &headers, body));
    }

    #[test]
    fn id_and_timestamp_are_covered() {
        let body = b"payload";
        let mut headers = signed_headers("m1", "2023-01-01T00:00:00Z", body);
        headers.insert(HEADER_MESSAGE_ID, "m2".parse().unwrap());
        assert!(!verify_delivery(SECRET, &headers, body));
    }

    #[test]
    fn missing_or_malformed_headers_rejected() {
        let body = b"payload";
        assert!(!verify_delivery(SECRET, &HeaderMap::new(), body));

        let mut headers = signed_headers("m1", "t", body);
        headers.insert(HEADER_SIGNATURE, "md5=abcd".parse().unwrap());
        assert!(!verify_delivery(SECRET, &headers, body));

        headers.insert(HEADER_SIGNATURE, "sha256=zz".parse().unwrap());
        assert!(!verify_delivery(SECRET, &headers, body));
    }

    #[test]
    fn known_vector() {
        // HMAC-SHA256(key="key", "The quick brown fox jumps over the lazy dog")
        let sig = sign(b"key", "The quick brown fox ", "jumps over ", b"the lazy dog");
        assert_eq!(
            sig,
            "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }
}
