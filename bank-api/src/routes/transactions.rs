/// Balance transaction endpoints
///
/// - `POST /transaction/use` - Use balance
/// - `POST /transaction/cancel` - Cancel a previous use
/// - `GET /transaction/:transaction_id` - Look up a ledger entry
///
/// When a use or cancel is rejected by a business rule, a failed ledger entry
/// is appended for the account before the error is returned.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Json,
};
use bank_shared::error::{BankError, BankResult};
use bank_shared::service::transaction::{TransactionDetail, TransactionSummary};
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

/// Use balance request
#[derive(Debug, Deserialize, Validate)]
pub struct UseBalanceRequest {
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i64,

    #[validate(length(equal = 10, message = "account_number must be 10 characters"))]
    pub account_number: String,

    #[validate(range(
        min = 10,
        max = 1_000_000_000,
        message = "amount must be between 10 and 1,000,000,000"
    ))]
    pub amount: i64,
}

/// Cancel balance request
#[derive(Debug, Deserialize, Validate)]
pub struct CancelBalanceRequest {
    #[validate(length(min = 1, message = "transaction_id is required"))]
    pub transaction_id: String,

    #[validate(length(equal = 10, message = "account_number must be 10 characters"))]
    pub account_number: String,

    #[validate(range(
        min = 10,
        max = 1_000_000_000,
        message = "amount must be between 10 and 1,000,000,000"
    ))]
    pub amount: i64,
}

/// Use balance
///
/// ```text
/// POST /transaction/use
/// { "user_id": 12, "account_number": "1000000000", "amount": 1000 }
/// ```
pub async fn use_balance(
    State(state): State<AppState>,
    Json(req): Json<UseBalanceRequest>,
) -> ApiResult<Json<TransactionSummary>> {
    req.validate()?;

    let ledger = state.ledger();
    match ledger
        .use_balance(req.user_id, &req.account_number, req.amount)
        .await
    {
        Ok(summary) => Ok(Json(summary)),
        Err(BankError::Rejected(code)) => {
            record_failure(
                ledger
                    .save_failed_use_transaction(&req.account_number, req.amount)
                    .await,
            );
            Err(ApiError::Rejected(code))
        }
        Err(err) => Err(err.into()),
    }
}

/// Cancel a previous use
///
/// ```text
/// POST /transaction/cancel
/// { "transaction_id": "…", "account_number": "1000000000", "amount": 1000 }
/// ```
pub async fn cancel_balance(
    State(state): State<AppState>,
    Json(req): Json<CancelBalanceRequest>,
) -> ApiResult<Json<TransactionSummary>> {
    req.validate()?;

    let ledger = state.ledger();
    match ledger
        .cancel_balance(&req.transaction_id, &req.account_number, req.amount)
        .await
    {
        Ok(summary) => Ok(Json(summary)),
        Err(BankError::Rejected(code)) => {
            record_failure(
                ledger
                    .save_failed_cancel_transaction(&req.account_number, req.amount)
                    .await,
            );
            Err(ApiError::Rejected(code))
        }
        Err(err) => Err(err.into()),
    }
}

/// Look up a ledger entry
pub async fn query_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> ApiResult<Json<TransactionDetail>> {
    let detail = state.ledger().query_transaction(&transaction_id).await?;
    Ok(Json(detail))
}

/// A failed entry can only be recorded for an existing account
fn record_failure(result: BankResult<TransactionSummary>) {
    if let Err(err) = result {
        warn!(error = %err, "Could not record failed transaction");
    }
}
