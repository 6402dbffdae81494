use axum::{extract::FromRequestParts, http::header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{error::AppError, models::Role, state::AppState};

/// Identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

/// Allowed-role set for one operation.
#[derive(Debug, Clone, Copy)]
pub struct RoleGuard {
    allowed: &'static [Role],
}

impl RoleGuard {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    pub fn authorize<'a>(&self, user: &'a AuthUser) -> Result<&'a AuthUser, AppError> {
        if !self.allows(user.role) {
            let required: Vec<&str> = self.allowed.iter().map(Role::as_str).collect();
            return Err(AppError::Forbidden(format!(
                "Insufficient permissions. One of these roles is required: {}",
                required.join(", ")
            )));
        }
        Ok(user)
    }
}

pub mod guards {
    use super::RoleGuard;
    use crate::models::Role;

    pub const CLIENT: RoleGuard = RoleGuard::new(&[Role::Client]);
    pub const MANTENEDOR: RoleGuard = RoleGuard::new(&[Role::Mantenedor]);
    pub const CATALOG_STAFF: RoleGuard = RoleGuard::new(&[Role::Mantenedor, Role::Admin]);
    pub const BACK_OFFICE: RoleGuard = RoleGuard::new(&[Role::Admin, Role::ServiceAccount]);
    pub const ANY: RoleGuard = RoleGuard::new(&[
        Role::Client,
        Role::Mantenedor,
        Role::Admin,
        Role::ServiceAccount,
    ]);
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?;

        let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidToken)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .or_else(|| auth_str.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        Ok(state.tokens.authenticate(token, &state.users)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            username: "someone".into(),
            role,
        }
    }

    #[test]
    fn guard_accepts_listed_roles_only() {
        assert!(guards::BACK_OFFICE.authorize(&user(Role::Admin)).is_ok());
        assert!(guards::BACK_OFFICE.authorize(&user(Role::ServiceAccount)).is_ok());

        let err = guards::BACK_OFFICE
            .authorize(&user(Role::Client))
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn mantenedor_guard_rejects_client() {
        assert!(guards::MANTENEDOR.authorize(&user(Role::Client)).is_err());
        assert!(guards::ANY.authorize(&user(Role::Client)).is_ok());
    }
}
