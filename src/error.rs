use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient stock for product '{name}'. Available stock: {available}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i32,
    },

    #[error("Failed to update product stock")]
    StockUpdateFailed,

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Webhook(String),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable identifier clients can branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "validation",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::StockUpdateFailed => "stock_update_failed",
            AppError::Upstream(_) => "upstream",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Webhook(_) => "webhook",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::StockUpdateFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Webhook(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::DuplicateCode(_) | StoreError::PendingCheckout(_) => {
                AppError::Conflict(err.to_string())
            }
            StoreError::InsufficientStock {
                product_id,
                name,
                available,
            } => AppError::InsufficientStock {
                product_id,
                name,
                available,
            },
            StoreError::StockOverflow(_) => AppError::BadRequest(err.to_string()),
            StoreError::DuplicateSession(_) | StoreError::Poisoned => {
                AppError::Internal(anyhow::Error::new(err))
            }
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorData {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal(err) = &self {
            tracing::error!(error = ?err, "internal error");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                kind: self.kind().to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        if status == StatusCode::UNAUTHORIZED {
            return (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                axum::Json(body),
            )
                .into_response();
        }
        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
