use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::contact::{ContactMessageList, ContactRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::ContactMessage,
    response::ApiResponse,
    services::contact_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send_message", post(send_message))
        .route("/sent_messages", get(sent_messages))
}

#[utoipa::path(
    post,
    path = "/contact/send_message",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message stored", body = ApiResponse<ContactMessage>),
        (status = 400, description = "Message too short or too long"),
        (status = 404, description = "Seller not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Contact"
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ContactRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ContactMessage>>)> {
    let resp = contact_service::send_message(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/contact/sent_messages",
    responses(
        (status = 200, description = "Every stored message", body = ApiResponse<ContactMessageList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Contact"
)]
pub async fn sent_messages(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ContactMessageList>>> {
    let resp = contact_service::list_messages(&state, &user).await?;
    Ok(Json(resp))
}
