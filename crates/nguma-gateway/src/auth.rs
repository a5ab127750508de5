use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use nguma_types::api::Claims;

/// Verify an HS256 platform access token and return its claims.
/// Only the signature and `exp` are checked, not `aud`.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .ok()
        .map(|data| data.claims)
}
