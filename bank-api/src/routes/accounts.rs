/// Account lifecycle endpoints
///
/// - `POST /account` - Open an account
/// - `DELETE /account` - Unregister an account
/// - `GET /account?user_id=N` - List a user's accounts
/// - `GET /account/:id` - Fetch one account

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use bank_shared::models::account::Account;
use bank_shared::service::account::{AccountBalance, CreatedAccount, UnregisteredAccount};
use serde::Deserialize;
use validator::Validate;

/// Open account request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i64,

    #[validate(range(
        min = 0,
        max = 1_000_000_000,
        message = "initial_balance must be between 0 and 1,000,000,000"
    ))]
    pub initial_balance: i64,
}

/// Unregister account request
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i64,

    #[validate(length(equal = 10, message = "account_number must be 10 characters"))]
    pub account_number: String,
}

/// List accounts query
#[derive(Debug, Deserialize, Validate)]
pub struct ListAccountsQuery {
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i64,
}

/// Open account
///
/// ```text
/// POST /account
/// { "user_id": 12, "initial_balance": 1000 }
/// ```
///
/// # Errors
///
/// - `404 USER_NOT_FOUND`
/// - `400 MAX_ACCOUNT_PER_USER_10`
/// - `409 conflict`: another request took the same account number
/// - `422 validation_error`
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Json<CreatedAccount>> {
    req.validate()?;

    let created = state
        .accounts()
        .create_account(req.user_id, req.initial_balance)
        .await?;

    Ok(Json(created))
}

/// Unregister account
///
/// ```text
/// DELETE /account
/// { "user_id": 12, "account_number": "1000000012" }
/// ```
///
/// # Errors
///
/// - `404 USER_NOT_FOUND`, `404 ACCOUNT_NOT_FOUND`
/// - `400 USER_ACCOUNT_UNMATCH`, `400 BALANCE_NOT_EMPTY`,
///   `400 ACCOUNT_ALREADY_UNREGISTERED`
pub async fn delete_account(
    State(state): State<AppState>,
    Json(req): Json<DeleteAccountRequest>,
) -> ApiResult<Json<UnregisteredAccount>> {
    req.validate()?;

    let deleted = state
        .accounts()
        .delete_account(req.user_id, &req.account_number)
        .await?;

    Ok(Json(deleted))
}

/// List a user's accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Json<Vec<AccountBalance>>> {
    query.validate()?;

    let accounts = state.accounts().get_accounts_by_user_id(query.user_id).await?;

    Ok(Json(accounts))
}

/// Fetch an account by id
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Account>> {
    let account = state.accounts().get_account(id).await?;
    Ok(Json(account))
}
