use axum::{Router, routing::get};

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod branches;
pub mod contact;
pub mod currency;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod products;
pub mod sellers;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/branches", branches::router())
        .nest("/sellers", sellers::router())
        .nest("/orders", orders::router())
        .nest("/contact", contact::router())
        .nest("/currency", currency::router())
        .nest("/payments", payments::router())
        .nest("/admin", admin::router())
}
