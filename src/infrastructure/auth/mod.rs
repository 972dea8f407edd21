//! Auth Verifier
//!
//! Consumed interface gating WebSocket admission. The verifier is the sole
//! gate for socket connections; every failure cause (missing token, invalid
//! or expired token, verifier unreachable) collapses into `AuthRejected` so
//! the gateway never distinguishes causes to the client.

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::shared::error::GatewayError;

/// Decoded identity of an authenticated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub username: String,
}

/// Token verification contract.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    /// Decode a bearer token into an identity, or reject.
    async fn decode_token(&self, token: &str) -> Result<Identity, GatewayError>;
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct Claims {
    /// Subject (user uid)
    sub: String,
    /// Display name, when the issuer includes one
    #[serde(default)]
    preferred_username: Option<String>,
    #[allow(dead_code)]
    exp: i64,
}

/// HS256 bearer-token verifier.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

#[async_trait]
impl AuthVerifier for JwtVerifier {
    async fn decode_token(&self, token: &str) -> Result<Identity, GatewayError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| GatewayError::AuthRejected(e.to_string()))?;

        Ok(Identity {
            uid: token_data.claims.sub,
            username: token_data.claims.preferred_username.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        preferred_username: String,
        exp: i64,
    }

    fn sign(secret: &str, sub: &str, exp: i64) -> String {
        let claims = TestClaims {
            sub: sub.into(),
            preferred_username: "alice".into(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    const SECRET: &str = "test-secret-at-least-32-characters-long";

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[tokio::test]
    async fn valid_token_decodes_identity() {
        let verifier = JwtVerifier::new(SECRET);
        let token = sign(SECRET, "u1", far_future());

        let identity = verifier.decode_token(&token).await.unwrap();
        assert_eq!(identity.uid, "u1");
        assert_eq!(identity.username, "alice");
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        let token = sign("another-secret-also-32-characters-xx", "u1", far_future());

        let err = verifier.decode_token(&token).await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthRejected(_)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        let token = sign(SECRET, "u1", chrono::Utc::now().timestamp() - 3600);

        let err = verifier.decode_token(&token).await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthRejected(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        let err = verifier.decode_token("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthRejected(_)));
    }
}
