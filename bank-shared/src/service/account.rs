/// Account lifecycle: open, unregister, list, look up
///
/// Every operation first runs its precondition checks against the store, in
/// a fixed order, and aborts on the first failure before anything is written.
/// A successful mutation is a single `save_account` call.
///
/// # Account numbers
///
/// A new number is the latest account's number plus one (or the policy seed
/// on an empty store). The latest account is read and the new one written in
/// two separate store calls, so two concurrent creations can compute the
/// same number. The PostgreSQL schema has a UNIQUE constraint on
/// `account_number`, which turns that race into a `StoreError::Conflict` for
/// the losing caller rather than a duplicate. Callers needing concurrent
/// creation must serialize it or retry on conflict themselves.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bank_shared::service::account::AccountService;
/// use bank_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let user = store.insert_user("Pobi").await;
///
/// let service = AccountService::new(store.clone());
/// let created = service.create_account(user.id, 1000).await?;
/// assert_eq!(created.account_number, "1000000000");
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{BankResult, ErrorCode, StoreError};
use crate::models::account::{next_account_number, Account, AccountStatus, SaveAccount};
use crate::models::account_user::AccountUser;
use crate::policy::AccountPolicy;
use crate::store::RecordStore;

/// Result of `create_account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAccount {
    pub account_id: i64,
    pub user_id: i64,
    pub account_number: String,
    pub registered_at: DateTime<Utc>,
}

/// Result of `delete_account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisteredAccount {
    pub user_id: i64,
    pub account_number: String,
    pub unregistered_at: DateTime<Utc>,
}

/// One row of `get_accounts_by_user_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_number: String,
    pub balance: i64,
}

/// Account lifecycle operations over a record store
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn RecordStore>,
    policy: AccountPolicy,
}

impl AccountService {
    /// Creates a service with the default policy
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_policy(store, AccountPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn RecordStore>, policy: AccountPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &AccountPolicy {
        &self.policy
    }

    async fn require_user(&self, user_id: i64) -> BankResult<AccountUser> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ErrorCode::UserNotFound.into())
    }

    /// Opens a new `IN_USE` account for the user
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `initial_balance` is negative
    /// - `UserNotFound` if the user does not exist
    /// - `MaxAccountPerUser10` if the user is at the account limit
    /// - `StoreError::InvalidData` if the latest account number is not numeric
    /// - `StoreError::Conflict` if a concurrent creation took the same number
    #[instrument(skip(self))]
    pub async fn create_account(
        &self,
        user_id: i64,
        initial_balance: i64,
    ) -> BankResult<CreatedAccount> {
        if initial_balance < 0 {
            return Err(ErrorCode::InvalidRequest.into());
        }

        let user = self.require_user(user_id).await?;

        let owned = self
            .store
            .count_accounts_for_user(user.id, self.policy.limit_scope.status_filter())
            .await?;
        if owned >= self.policy.max_accounts_per_user {
            warn!(user_id = user.id, owned, "Account limit reached");
            return Err(ErrorCode::MaxAccountPerUser10.into());
        }

        let account_number = match self.store.find_latest_account().await? {
            Some(latest) => next_account_number(&latest.account_number).ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "latest account number is not numeric: {}",
                    latest.account_number
                ))
            })?,
            None => self.policy.seed_account_number.clone(),
        };
        debug!(%account_number, "Computed next account number");

        let account = self
            .store
            .save_account(SaveAccount::opening(user.id, account_number, initial_balance))
            .await?;

        info!(
            user_id = user.id,
            account_id = account.id,
            account_number = %account.account_number,
            "Account created"
        );

        Ok(CreatedAccount {
            account_id: account.id,
            user_id: account.account_user_id,
            account_number: account.account_number,
            registered_at: account.registered_at,
        })
    }

    /// Unregisters an account
    ///
    /// # Errors
    ///
    /// Checked in this order, first failure wins:
    /// `UserNotFound`, `AccountNotFound`, `UserAccountUnmatch`,
    /// `BalanceNotEmpty`, `AccountAlreadyUnregistered`
    #[instrument(skip(self))]
    pub async fn delete_account(
        &self,
        user_id: i64,
        account_number: &str,
    ) -> BankResult<UnregisteredAccount> {
        let user = self.require_user(user_id).await?;

        let account = self
            .store
            .find_account_by_number(account_number)
            .await?
            .ok_or(ErrorCode::AccountNotFound)?;

        validate_delete_account(&user, &account)?;

        let mut draft = SaveAccount::from(account);
        draft.account_status = AccountStatus::Unregistered;
        draft.unregistered_at = Some(Utc::now());

        let saved = self.store.save_account(draft).await?;

        info!(
            user_id = user.id,
            account_number = %saved.account_number,
            "Account unregistered"
        );

        Ok(UnregisteredAccount {
            user_id: user.id,
            account_number: saved.account_number,
            // Just written; fall back to update time if a backend dropped it
            unregistered_at: saved.unregistered_at.unwrap_or(saved.updated_at),
        })
    }

    /// Lists account numbers and balances of every account the user owns
    ///
    /// Order is the store's (ascending id). A user without accounts gets an
    /// empty list.
    #[instrument(skip(self))]
    pub async fn get_accounts_by_user_id(&self, user_id: i64) -> BankResult<Vec<AccountBalance>> {
        let user = self.require_user(user_id).await?;

        let accounts = self.store.list_accounts_for_user(user.id).await?;
        debug!(user_id = user.id, count = accounts.len(), "Listed accounts");

        Ok(accounts
            .into_iter()
            .map(|account| AccountBalance {
                account_number: account.account_number,
                balance: account.balance,
            })
            .collect())
    }

    /// Looks up an account by id. Read-only.
    #[instrument(skip(self))]
    pub async fn get_account(&self, account_id: i64) -> BankResult<Account> {
        self.store
            .find_account_by_id(account_id)
            .await?
            .ok_or_else(|| ErrorCode::AccountNotFound.into())
    }
}

fn validate_delete_account(user: &AccountUser, account: &Account) -> Result<(), ErrorCode> {
    if !account.is_owned_by(user.id) {
        return Err(ErrorCode::UserAccountUnmatch);
    }
    if account.balance != 0 {
        return Err(ErrorCode::BalanceNotEmpty);
    }
    if !account
        .account_status
        .can_transition_to(AccountStatus::Unregistered)
    {
        return Err(ErrorCode::AccountAlreadyUnregistered);
    }
    Ok(())
}
