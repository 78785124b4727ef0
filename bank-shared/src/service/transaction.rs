/// Balance use and cancellation, recorded in the append-only ledger
///
/// A successful operation changes the account balance and appends one ledger
/// entry carrying the new balance as its snapshot. Each successful use can be
/// canceled once, in full, while its account is in use. Rejected attempts
/// can be recorded with `save_failed_use_transaction` /
/// `save_failed_cancel_transaction`, which append an `F` entry and leave the
/// balance untouched.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bank_shared::service::{account::AccountService, transaction::TransactionService};
/// use bank_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let user = store.insert_user("Pobi").await;
/// let account = AccountService::new(store.clone()).create_account(user.id, 1000).await?;
///
/// let ledger = TransactionService::new(store.clone());
/// let used = ledger.use_balance(user.id, &account.account_number, 300).await?;
/// ledger.cancel_balance(&used.transaction_id, &account.account_number, 300).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{BankResult, ErrorCode, StoreError};
use crate::models::account::{Account, SaveAccount};
use crate::models::account_user::AccountUser;
use crate::models::transaction::{
    NewTransaction, Transaction, TransactionResultType, TransactionType,
};
use crate::store::RecordStore;

/// Result of a use or cancel operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub transaction_result_type: TransactionResultType,
    pub transaction_id: String,
    pub amount: i64,
    pub balance_snapshot: i64,
    pub transacted_at: DateTime<Utc>,
}

/// Result of `query_transaction`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub transaction_result_type: TransactionResultType,
    pub transaction_id: String,
    pub amount: i64,
    pub transacted_at: DateTime<Utc>,
}

impl TransactionSummary {
    fn new(account_number: String, tx: Transaction) -> Self {
        Self {
            account_number,
            transaction_type: tx.transaction_type,
            transaction_result_type: tx.transaction_result_type,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            balance_snapshot: tx.balance_snapshot,
            transacted_at: tx.transacted_at,
        }
    }
}

/// Ledger operations over a record store
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn RecordStore>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn require_account(&self, account_number: &str) -> BankResult<Account> {
        self.store
            .find_account_by_number(account_number)
            .await?
            .ok_or_else(|| ErrorCode::AccountNotFound.into())
    }

    /// Withdraws `amount` from the user's account
    ///
    /// # Errors
    ///
    /// Checked in this order: `InvalidRequest` (non-positive amount),
    /// `UserNotFound`, `AccountNotFound`, `UserAccountUnmatch`,
    /// `AccountAlreadyUnregistered`, `AmountExceedBalance`
    #[instrument(skip(self))]
    pub async fn use_balance(
        &self,
        user_id: i64,
        account_number: &str,
        amount: i64,
    ) -> BankResult<TransactionSummary> {
        if amount <= 0 {
            return Err(ErrorCode::InvalidRequest.into());
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ErrorCode::UserNotFound)?;
        let account = self.require_account(account_number).await?;

        validate_use_balance(&user, &account, amount)?;

        let mut draft = SaveAccount::from(account);
        draft.balance -= amount;
        let account = self.store.save_account(draft).await?;

        let tx = self
            .store
            .save_transaction(NewTransaction::now(
                TransactionType::Use,
                TransactionResultType::S,
                account.id,
                amount,
                account.balance,
            ))
            .await?;

        info!(
            account_number = %account.account_number,
            transaction_id = %tx.transaction_id,
            amount,
            balance = account.balance,
            "Balance used"
        );

        Ok(TransactionSummary::new(account.account_number, tx))
    }

    /// Records a failed use attempt against an existing account
    #[instrument(skip(self))]
    pub async fn save_failed_use_transaction(
        &self,
        account_number: &str,
        amount: i64,
    ) -> BankResult<TransactionSummary> {
        self.save_failed_transaction(TransactionType::Use, account_number, amount)
            .await
    }

    /// Reverses a previous successful use, in full
    ///
    /// The cancel entry is appended before the balance is credited. It names
    /// the reversed entry, which the store keeps unique, so a concurrent
    /// second cancel of the same use fails with `StoreError::Conflict` before
    /// any money moves.
    ///
    /// # Errors
    ///
    /// Checked in this order: `InvalidRequest` (non-positive amount),
    /// `TransactionNotFound`, `AccountNotFound`, `TransactionAccountUnmatch`,
    /// `AccountAlreadyUnregistered`, `TransactionNotCancelable`,
    /// `TransactionAlreadyCanceled`, `CancelMustFully`, `TooOldOrderToCancel`
    #[instrument(skip(self))]
    pub async fn cancel_balance(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: i64,
    ) -> BankResult<TransactionSummary> {
        if amount <= 0 {
            return Err(ErrorCode::InvalidRequest.into());
        }

        let original = self
            .store
            .find_transaction_by_transaction_id(transaction_id)
            .await?
            .ok_or(ErrorCode::TransactionNotFound)?;
        let account = self.require_account(account_number).await?;
        let already_canceled = self
            .store
            .find_cancel_of(&original.transaction_id)
            .await?
            .is_some();

        validate_cancel_balance(&original, &account, amount, already_canceled, Utc::now())?;

        let balance = account.balance.checked_add(amount).ok_or_else(|| {
            StoreError::InvalidData("balance overflow on cancel".to_string())
        })?;

        let tx = self
            .store
            .save_transaction(
                NewTransaction::now(
                    TransactionType::Cancel,
                    TransactionResultType::S,
                    account.id,
                    amount,
                    balance,
                )
                .reversing(original.transaction_id.clone()),
            )
            .await?;

        let mut draft = SaveAccount::from(account);
        draft.balance = balance;
        let account = self.store.save_account(draft).await?;

        info!(
            account_number = %account.account_number,
            canceled = %original.transaction_id,
            transaction_id = %tx.transaction_id,
            amount,
            "Balance use canceled"
        );

        Ok(TransactionSummary::new(account.account_number, tx))
    }

    /// Records a failed cancel attempt against an existing account
    #[instrument(skip(self))]
    pub async fn save_failed_cancel_transaction(
        &self,
        account_number: &str,
        amount: i64,
    ) -> BankResult<TransactionSummary> {
        self.save_failed_transaction(TransactionType::Cancel, account_number, amount)
            .await
    }

    async fn save_failed_transaction(
        &self,
        transaction_type: TransactionType,
        account_number: &str,
        amount: i64,
    ) -> BankResult<TransactionSummary> {
        let account = self.require_account(account_number).await?;

        let tx = self
            .store
            .save_transaction(NewTransaction::now(
                transaction_type,
                TransactionResultType::F,
                account.id,
                amount,
                account.balance,
            ))
            .await?;

        warn!(
            account_number = %account.account_number,
            transaction_type = ?transaction_type,
            transaction_id = %tx.transaction_id,
            amount,
            "Recorded failed transaction"
        );

        Ok(TransactionSummary::new(account.account_number, tx))
    }

    /// Looks up a ledger entry by its external id. Read-only.
    #[instrument(skip(self))]
    pub async fn query_transaction(&self, transaction_id: &str) -> BankResult<TransactionDetail> {
        let tx = self
            .store
            .find_transaction_by_transaction_id(transaction_id)
            .await?
            .ok_or(ErrorCode::TransactionNotFound)?;

        let account = self
            .store
            .find_account_by_id(tx.account_id)
            .await?
            .ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "transaction {} references missing account {}",
                    tx.transaction_id, tx.account_id
                ))
            })?;

        Ok(TransactionDetail {
            account_number: account.account_number,
            transaction_type: tx.transaction_type,
            transaction_result_type: tx.transaction_result_type,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            transacted_at: tx.transacted_at,
        })
    }
}

fn validate_use_balance(user: &AccountUser, account: &Account, amount: i64) -> Result<(), ErrorCode> {
    if !account.is_owned_by(user.id) {
        return Err(ErrorCode::UserAccountUnmatch);
    }
    if account.is_unregistered() {
        return Err(ErrorCode::AccountAlreadyUnregistered);
    }
    if amount > account.balance {
        return Err(ErrorCode::AmountExceedBalance);
    }
    Ok(())
}

fn validate_cancel_balance(
    original: &Transaction,
    account: &Account,
    amount: i64,
    already_canceled: bool,
    now: DateTime<Utc>,
) -> Result<(), ErrorCode> {
    if original.account_id != account.id {
        return Err(ErrorCode::TransactionAccountUnmatch);
    }
    if account.is_unregistered() {
        return Err(ErrorCode::AccountAlreadyUnregistered);
    }
    if !original.is_cancelable() {
        return Err(ErrorCode::TransactionNotCancelable);
    }
    if already_canceled {
        return Err(ErrorCode::TransactionAlreadyCanceled);
    }
    if original.amount != amount {
        return Err(ErrorCode::CancelMustFully);
    }
    let cutoff = now.checked_sub_months(Months::new(12)).unwrap_or(now);
    if original.transacted_at < cutoff {
        return Err(ErrorCode::TooOldOrderToCancel);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountStatus;
    use chrono::Duration;

    fn ledger_entry(account_id: i64, amount: i64, transacted_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: 1,
            transaction_type: TransactionType::Use,
            transaction_result_type: TransactionResultType::S,
            account_id,
            amount,
            balance_snapshot: 0,
            transaction_id: "abc".to_string(),
            canceled_transaction_id: None,
            transacted_at,
            created_at: transacted_at,
            updated_at: transacted_at,
        }
    }

    fn account(id: i64) -> Account {
        let now = Utc::now();
        Account {
            id,
            account_user_id: 12,
            account_number: "1000000000".to_string(),
            balance: 0,
            account_status: AccountStatus::InUse,
            registered_at: now,
            unregistered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_validate_cancel_balance() {
        let now = Utc::now();
        let entry = ledger_entry(1, 100, now);

        assert_eq!(
            validate_cancel_balance(&ledger_entry(2, 100, now), &account(1), 100, false, now),
            Err(ErrorCode::TransactionAccountUnmatch)
        );
        assert_eq!(
            validate_cancel_balance(&entry, &account(1), 50, false, now),
            Err(ErrorCode::CancelMustFully)
        );
        assert_eq!(
            validate_cancel_balance(
                &ledger_entry(1, 100, now - Duration::days(400)),
                &account(1),
                100,
                false,
                now
            ),
            Err(ErrorCode::TooOldOrderToCancel)
        );
        assert_eq!(
            validate_cancel_balance(
                &ledger_entry(1, 100, now - Duration::days(300)),
                &account(1),
                100,
                false,
                now
            ),
            Ok(())
        );
    }

    #[test]
    fn test_validate_cancel_balance_entry_state() {
        let now = Utc::now();

        let mut closed = account(1);
        closed.account_status = AccountStatus::Unregistered;
        assert_eq!(
            validate_cancel_balance(&ledger_entry(1, 100, now), &closed, 100, false, now),
            Err(ErrorCode::AccountAlreadyUnregistered)
        );

        let mut failed = ledger_entry(1, 100, now);
        failed.transaction_result_type = TransactionResultType::F;
        assert_eq!(
            validate_cancel_balance(&failed, &account(1), 100, false, now),
            Err(ErrorCode::TransactionNotCancelable)
        );

        let mut cancel = ledger_entry(1, 100, now);
        cancel.transaction_type = TransactionType::Cancel;
        assert_eq!(
            validate_cancel_balance(&cancel, &account(1), 100, false, now),
            Err(ErrorCode::TransactionNotCancelable)
        );

        assert_eq!(
            validate_cancel_balance(&ledger_entry(1, 100, now), &account(1), 100, true, now),
            Err(ErrorCode::TransactionAlreadyCanceled)
        );
    }
}
