use crate::{
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, guards},
    models::{Branch, Seller},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_branches(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Vec<Branch>>> {
    guards::BACK_OFFICE.authorize(user)?;
    let branches = state.directory.branches().to_vec();
    let meta = Meta::total(branches.len());
    Ok(ApiResponse::success("Branches", branches, Some(meta)))
}

pub async fn get_branch(state: &AppState, id: i64) -> AppResult<ApiResponse<Branch>> {
    let branch = state
        .directory
        .branch(id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Branch with ID {id} not found")))?;
    Ok(ApiResponse::success("Branch", branch, None))
}

/// Unknown branches simply have no sellers.
pub async fn list_branch_sellers(
    state: &AppState,
    branch_id: i64,
) -> AppResult<ApiResponse<Vec<Seller>>> {
    let sellers = state.directory.sellers_of_branch(branch_id);
    let meta = Meta::total(sellers.len());
    Ok(ApiResponse::success("Sellers", sellers, Some(meta)))
}

pub async fn get_seller(state: &AppState, id: i64) -> AppResult<ApiResponse<Seller>> {
    let seller = state
        .directory
        .seller(id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Seller with ID {id} not found")))?;
    Ok(ApiResponse::success("Seller", seller, None))
}
