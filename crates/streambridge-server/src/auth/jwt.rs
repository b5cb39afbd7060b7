//! Session token issuance and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::AuthError;
use super::claims::{SessionClaims, UserLevel};

/// Signs and validates session tokens with one HMAC secret.
///
/// A manager is bound to a single secret; rotating the secret means building
/// a new manager, which makes every token signed by the old one unverifiable.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_at` so it can be reported separately
        // from signature failures and without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a session token for `user` valid for `lifetime_secs` from `now`.
    pub fn issue(
        &self,
        user: &str,
        level: UserLevel,
        lifetime_secs: i64,
        now: i64,
    ) -> Result<(SessionClaims, String), AuthError> {
        let claims = SessionClaims {
            user: user.to_string(),
            level,
            iat: now,
            exp: now.saturating_add(lifetime_secs),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok((claims, token))
    }

    /// Validate a token against this manager's secret as of `now`.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<SessionClaims, AuthError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::TokenMalformed)?;
        if data.claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn test_jwt() -> JwtManager {
        JwtManager::new(b"test-secret-key-for-testing")
    }

    #[test]
    fn issue_and_validate() {
        let jwt = test_jwt();
        let (issued, token) = jwt.issue("alice", UserLevel::Admin, 3600, NOW).unwrap();
        assert_eq!(issued.exp, NOW + 3600);

        let claims = jwt.validate_at(&token, NOW + 1).unwrap();
        assert_eq!(claims, issued);
    }

    #[test]
    fn expiry_boundary() {
        let jwt = test_jwt();
        let (_, token) = jwt.issue("alice", UserLevel::Streamer, 60, NOW).unwrap();

        assert!(jwt.validate_at(&token, NOW + 59).is_ok());
        assert!(matches!(
            jwt.validate_at(&token, NOW + 60),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let jwt = test_jwt();
        assert!(matches!(
            jwt.validate_at("not-a-valid-token", NOW),
            Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn wrong_secret_is_malformed_even_when_expired() {
        let jwt1 = test_jwt();
        let jwt2 = JwtManager::new(b"different-secret");

        let (_, token) = jwt1.issue("alice", UserLevel::Admin, 60, NOW).unwrap();
        assert!(matches!(
            jwt2.validate_at(&token, NOW + 3600),
            Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn tampered_payload_is_malformed() {
        let jwt = test_jwt();
        let (_, token) = jwt.issue("alice", UserLevel::Streamer, 60, NOW).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let (_, forged) = jwt.issue("mallory", UserLevel::Admin, 60, NOW).unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let tampered = parts.join(".");
        assert!(matches!(
            jwt.validate_at(&tampered, NOW),
            Err(AuthError::TokenMalformed)
        ));
    }
}
