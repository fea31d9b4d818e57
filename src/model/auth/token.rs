use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::Status,
    request::{self, FromRequest},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::model::admin::AdminUser;
use crate::Config;

/// The token type reported to clients.
pub const TOKEN_TYPE: &str = "Bearer";

/// An authentication token representing a verified admin identity.
///
/// Carried as a JWT in the `Authorization: Bearer` header; possession of a
/// valid, unexpired token is what admits a request to the admin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    sub: String,
    email: String,
}

impl AuthToken {
    /// Create a token for the given admin user.
    pub fn new(admin: &AdminUser) -> Self {
        Self {
            sub: admin.id.to_string(),
            email: admin.email.clone(),
        }
    }

    /// The authenticated identity's email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Sign this token, valid for the configured lifetime.
    pub fn encode(self, config: &Config) -> Result<String, JwtError> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
    }

    /// Verify and decode a token.
    pub fn decode(token: &str, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims.token)
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = ();

    /// Extract and verify the bearer token from the `Authorization` header.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // Valid as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let token = req
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "))
            .and_then(|token| Self::decode(token, config).ok());

        match token {
            Some(token) => request::Outcome::Success(token),
            None => request::Outcome::Failure((Status::Unauthorized, ())),
        }
    }
}
