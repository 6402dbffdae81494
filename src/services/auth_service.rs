use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;

use crate::{
    audit::log_audit,
    dto::auth::{Claims, LoginRequest, LoginResponse},
    error::{AppError, AppResult},
    middleware::auth::{AuthError, AuthUser},
    models::User,
    state::AppState,
    store::UserDirectory,
};

/// Issues and validates HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user: &User) -> AppResult<String> {
        let expiration = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user.username.clone(),
            role: user.role,
            exp: expiration.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Verifies signature and expiry, then resolves the subject against the
    /// identity store. The role always comes from the store.
    pub fn authenticate(&self, token: &str, users: &UserDirectory) -> Result<AuthUser, AuthError> {
        let mut validation = Validation::default();
        // No grace period after `exp`.
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            AuthError::InvalidToken
        })?;

        let user = users
            .find(&decoded.claims.sub)
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser {
            username: user.username.clone(),
            role: user.role,
        })
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    let LoginRequest { username, password } = payload;

    let user = state
        .users
        .find(&username)
        .ok_or_else(|| AppError::BadRequest("Incorrect username".into()))?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::BadRequest("Incorrect password".into()));
    }

    let token = state.tokens.issue(user)?;

    log_audit(
        Some(&user.username),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "role": user.role })),
    );

    Ok(LoginResponse {
        access_token: token,
        token_type: "bearer".into(),
    })
}
