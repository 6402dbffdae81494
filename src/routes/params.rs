use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::OrderStatus;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    /// Only products whose promo flag equals this value.
    pub promo: Option<bool>,
    /// Only products whose novelty flag equals this value.
    pub new: Option<bool>,
}

// Page fields are spelled out instead of flattened: flattened query structs
// lose their numeric types in serde_urlencoded.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

impl LowStockQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
