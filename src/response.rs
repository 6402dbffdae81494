use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::params::Pagination;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }

    pub fn total(total: usize) -> Self {
        Self {
            page: None,
            per_page: None,
            total: Some(total as i64),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

/// Slices an already filtered and ordered list down to one page.
pub fn paginate<T>(items: Vec<T>, pagination: &Pagination) -> (Vec<T>, Meta) {
    let (page, per_page, offset) = pagination.normalize();
    let total = items.len() as i64;
    let page_items = items
        .into_iter()
        .skip(offset as usize)
        .take(per_page as usize)
        .collect();
    (page_items, Meta::new(page, per_page, total))
}
