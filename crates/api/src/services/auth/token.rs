//! Signed session tokens.
//!
//! Tokens are HS256 JWTs whose subject is the user ID. They expire after the
//! configured TTL; there is no server-side revocation.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_core::UserId;
use larder_core::authz::Identity;

/// Errors issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is malformed, tampered with, or expired.
    #[error("Invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// The token could not be signed.
    #[error("could not sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    iat: u64,
    exp: u64,
}

/// Signing and verification keys plus the token lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl,
        }
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if the token is malformed, signed with a
    /// different key, or expired.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(TokenError::Invalid)?;
        Ok(Identity {
            user_id: data.claims.sub,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(
            &SecretString::from(secret.to_string()),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = keys("k3y-material-for-tests-0123456789abcdef");
        let token = keys.issue(UserId::new(42)).unwrap();
        let identity = keys.verify(&token).unwrap();
        assert_eq!(identity.user_id, UserId::new(42));
    }

    #[test]
    fn test_other_key_rejected() {
        let token = keys("first-key-0123456789abcdefghijklmnop")
            .issue(UserId::new(1))
            .unwrap();
        let result = keys("second-key-0123456789abcdefghijklmno").verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let keys = keys("k3y-material-for-tests-0123456789abcdef");
        let mut token = keys.issue(UserId::new(1)).unwrap();
        token.push('x');
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys("k3y-material-for-tests-0123456789abcdef");
        let past = jsonwebtoken::get_current_timestamp() - 120;
        let claims = Claims {
            sub: UserId::new(1),
            iat: past - 60,
            exp: past,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err().to_string(), "Invalid token");
    }

    #[test]
    fn test_debug_redacts_keys() {
        let debug = format!("{:?}", keys("k3y-material-for-tests-0123456789abcdef"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k3y-material"));
    }
}
