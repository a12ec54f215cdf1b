use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::core::{MatchError, Principal};
use crate::models::UserId;

/// Claims carried by access tokens from the auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Resolve the caller from an `Authorization: Bearer <jwt>` header
pub fn principal_from_request(req: &HttpRequest, secret: &str) -> Result<Principal, MatchError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(MatchError::Unauthenticated)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(MatchError::Unauthenticated)?;

    decode_principal(token, secret)
}

pub fn decode_principal(token: &str, secret: &str) -> Result<Principal, MatchError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Tokens without `exp` are accepted; an `exp` that is present is still checked
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            tracing::debug!("Rejected access token: {}", e);
            MatchError::Unauthenticated
        })?;

    let principal = Principal(data.claims.user_id);
    principal.user_id()?;

    Ok(principal)
}
