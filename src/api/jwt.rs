use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Session token claims issued by the marketplace auth service
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Verifies HS256 session tokens. View recording only needs the user id,
/// so issuing is limited to what tests and tooling require.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// `None` when no secret is configured: every visitor is anonymous
    pub fn from_config() -> Option<Self> {
        let config = crate::config::get_config();
        match config.api.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Some(Self::new(secret)),
            None => {
                warn!("JWT secret not configured, all visitors are treated as anonymous");
                None
            }
        }
    }

    pub fn issue_token(
        &self,
        user_id: i64,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = UserClaims {
            user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    pub fn validate_token(&self, token: &str) -> Result<UserClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<UserClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}
