use axum::{Form, Json, Router, extract::State, routing::{get, post}};

use crate::{
    dto::auth::{LoginRequest, LoginResponse},
    error::AppResult,
    middleware::auth::{AuthUser, guards},
    response::{ApiResponse, Meta},
    services::auth_service::login_user,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Bearer token", body = LoginResponse),
        (status = 400, description = "Incorrect username or password")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let resp = login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Authenticated identity", body = ApiResponse<AuthUser>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(user: AuthUser) -> AppResult<Json<ApiResponse<AuthUser>>> {
    guards::ANY.authorize(&user)?;
    Ok(Json(ApiResponse::success("Current user", user, Some(Meta::empty()))))
}
