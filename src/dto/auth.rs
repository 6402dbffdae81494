use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Role;

/// OAuth2 password-grant style form body.
#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}
