use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims issued by the platform's auth service.
///
/// The `sub` field is the user's UUID in the `users` table. Role and profile
/// data are *not* trusted from the token; they are read from the user row.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user UUID.
    pub sub: String,
    /// Token expiration (Unix timestamp).
    pub exp: usize,
    /// Token issued-at (Unix timestamp).
    pub iat: Option<usize>,
    pub iss: Option<String>,
}

impl Claims {
    /// Extract the user UUID from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.sub).map_err(|e| format!("Invalid UUID in sub claim: {e}"))
    }
}

/// Validate an HS256 JWT signed with the shared secret and return its claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|td| td.claims)
    .map_err(|e| format!("Token validation failed: {e}"))
}
