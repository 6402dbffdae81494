use crate::{
    audit::log_audit,
    dto::contact::{ContactMessageList, ContactRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, guards},
    models::ContactMessage,
    response::{ApiResponse, Meta},
    state::AppState,
};

const MIN_MESSAGE_CHARS: usize = 10;
const MAX_MESSAGE_CHARS: usize = 500;

pub async fn send_message(
    state: &AppState,
    user: &AuthUser,
    payload: ContactRequest,
) -> AppResult<ApiResponse<ContactMessage>> {
    guards::CLIENT.authorize(user)?;

    let length = payload.message.trim().chars().count();
    if !(MIN_MESSAGE_CHARS..=MAX_MESSAGE_CHARS).contains(&length) {
        return Err(AppError::BadRequest(format!(
            "Message must be between {MIN_MESSAGE_CHARS} and {MAX_MESSAGE_CHARS} characters"
        )));
    }

    let seller = state.directory.seller(payload.seller_id).ok_or_else(|| {
        AppError::NotFound(format!("Seller with ID {} not found", payload.seller_id))
    })?;

    let message = state
        .contact
        .push(&user.username, seller.id, payload.message.trim().to_string())?;

    log_audit(
        Some(&user.username),
        "contact_message_sent",
        Some("contact"),
        Some(serde_json::json!({ "message_id": message.id, "seller_id": seller.id })),
    );

    Ok(ApiResponse::success(
        "Message sent",
        message,
        Some(Meta::empty()),
    ))
}

pub async fn list_messages(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ContactMessageList>> {
    guards::BACK_OFFICE.authorize(user)?;
    let items = state.contact.list()?;
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success(
        "Sent messages",
        ContactMessageList { items },
        Some(meta),
    ))
}
