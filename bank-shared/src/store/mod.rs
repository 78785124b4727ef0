/// Record store abstraction
///
/// The services talk to persistence only through [`RecordStore`]. Two
/// backends are provided:
///
/// - [`PgStore`]: PostgreSQL, delegating to the SQL in `models`
/// - [`MemoryStore`]: in-process maps, for local development and tests
///
/// Each call is atomic on its own. Nothing here spans multiple calls, so a
/// service's read-then-write sequence is not isolated from other writers.
///
/// # Example
///
/// ```
/// use bank_shared::store::{MemoryStore, RecordStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let user = store.insert_user("Pobi").await;
/// assert!(store.find_user_by_id(user.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::account::{Account, AccountStatus, SaveAccount};
use crate::models::account_user::AccountUser;
use crate::models::transaction::{NewTransaction, Transaction};

/// Persistence operations consumed by the services
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name, reported by health checks
    fn backend(&self) -> &'static str;

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<AccountUser>>;

    async fn find_account_by_number(&self, account_number: &str) -> StoreResult<Option<Account>>;

    async fn find_account_by_id(&self, id: i64) -> StoreResult<Option<Account>>;

    /// Most recently created account (highest id)
    async fn find_latest_account(&self) -> StoreResult<Option<Account>>;

    /// Counts a user's accounts, optionally only those in `status`
    async fn count_accounts_for_user(
        &self,
        account_user_id: i64,
        status: Option<AccountStatus>,
    ) -> StoreResult<i64>;

    /// Every account owned by the user, in ascending id order
    async fn list_accounts_for_user(&self, account_user_id: i64) -> StoreResult<Vec<Account>>;

    /// Inserts (`id: None`) or updates an account
    async fn save_account(&self, account: SaveAccount) -> StoreResult<Account>;

    /// Appends a ledger entry
    async fn save_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction>;

    async fn find_transaction_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> StoreResult<Option<Transaction>>;

    /// The successful cancel that reversed `transaction_id`, if any
    async fn find_cancel_of(&self, transaction_id: &str) -> StoreResult<Option<Transaction>>;

    /// Verifies the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;
}
