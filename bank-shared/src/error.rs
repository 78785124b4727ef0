/// Error taxonomy for account and transaction operations
///
/// Two categories are kept apart:
///
/// - [`ErrorCode`]: a caller-input or state validation failure. These are
///   expected outcomes of a request (unknown user, balance not empty, ...).
/// - [`StoreError`]: an infrastructure failure from the record store
///   (connectivity, constraint violations, corrupt rows). These are never
///   mapped onto an `ErrorCode`.
///
/// Services return [`BankError`], which wraps one or the other.
///
/// # Example
///
/// ```
/// use bank_shared::error::{BankError, ErrorCode};
///
/// let err = BankError::Rejected(ErrorCode::BalanceNotEmpty);
/// assert_eq!(err.code(), Some(ErrorCode::BalanceNotEmpty));
/// assert_eq!(ErrorCode::BalanceNotEmpty.as_str(), "BALANCE_NOT_EMPTY");
/// ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for service operations
pub type BankResult<T> = Result<T, BankError>;

/// Result alias for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Domain rejection codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UserNotFound,
    AccountNotFound,
    #[serde(rename = "MAX_ACCOUNT_PER_USER_10")]
    MaxAccountPerUser10,
    UserAccountUnmatch,
    BalanceNotEmpty,
    AccountAlreadyUnregistered,
    TransactionNotFound,
    AmountExceedBalance,
    TransactionAccountUnmatch,
    CancelMustFully,
    TooOldOrderToCancel,
    TransactionNotCancelable,
    TransactionAlreadyCanceled,
    InvalidRequest,
}

impl ErrorCode {
    /// Stable wire identifier of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorCode::MaxAccountPerUser10 => "MAX_ACCOUNT_PER_USER_10",
            ErrorCode::UserAccountUnmatch => "USER_ACCOUNT_UNMATCH",
            ErrorCode::BalanceNotEmpty => "BALANCE_NOT_EMPTY",
            ErrorCode::AccountAlreadyUnregistered => "ACCOUNT_ALREADY_UNREGISTERED",
            ErrorCode::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorCode::AmountExceedBalance => "AMOUNT_EXCEED_BALANCE",
            ErrorCode::TransactionAccountUnmatch => "TRANSACTION_ACCOUNT_UNMATCH",
            ErrorCode::CancelMustFully => "CANCEL_MUST_FULLY",
            ErrorCode::TooOldOrderToCancel => "TOO_OLD_ORDER_TO_CANCEL",
            ErrorCode::TransactionNotCancelable => "TRANSACTION_NOT_CANCELABLE",
            ErrorCode::TransactionAlreadyCanceled => "TRANSACTION_ALREADY_CANCELED",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::AccountNotFound => "Account not found",
            ErrorCode::MaxAccountPerUser10 => "A user may own at most 10 accounts",
            ErrorCode::UserAccountUnmatch => "Account does not belong to the user",
            ErrorCode::BalanceNotEmpty => "Account balance must be zero to unregister",
            ErrorCode::AccountAlreadyUnregistered => "Account is already unregistered",
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::AmountExceedBalance => "Amount exceeds the account balance",
            ErrorCode::TransactionAccountUnmatch => {
                "Transaction does not belong to the account"
            }
            ErrorCode::CancelMustFully => "Partial cancellation is not allowed",
            ErrorCode::TooOldOrderToCancel => "Transactions older than one year cannot be canceled",
            ErrorCode::TransactionNotCancelable => "Only a successful use can be canceled",
            ErrorCode::TransactionAlreadyCanceled => "Transaction has already been canceled",
            ErrorCode::InvalidRequest => "Invalid request",
        }
    }

    /// Whether the code reports a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ErrorCode::UserNotFound | ErrorCode::AccountNotFound | ErrorCode::TransactionNotFound
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Uniqueness conflict (e.g. two accounts computed the same number)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored data could not be interpreted
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Error returned by the account and transaction services
#[derive(Debug, Error)]
pub enum BankError {
    /// A precondition was violated; nothing was written
    #[error("{}: {}", .0.as_str(), .0.description())]
    Rejected(ErrorCode),

    /// The record store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BankError {
    /// Domain code, if this is a rejection
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            BankError::Rejected(code) => Some(*code),
            BankError::Store(_) => None,
        }
    }
}

impl From<ErrorCode> for BankError {
    fn from(code: ErrorCode) -> Self {
        BankError::Rejected(code)
    }
}

impl From<sqlx::Error> for BankError {
    fn from(err: sqlx::Error) -> Self {
        BankError::Store(StoreError::Database(err))
    }
}
