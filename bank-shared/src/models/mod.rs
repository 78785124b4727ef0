/// Database models for the bank account service
///
/// Each model carries its own SQL operations as associated functions taking a
/// `&PgPool`. The services never call these directly; they go through the
/// [`RecordStore`](crate::store::RecordStore) trait.
///
/// # Models
///
/// - `account_user`: account owners
/// - `account`: accounts and the account status state machine
/// - `transaction`: append-only ledger entries

pub mod account;
pub mod account_user;
pub mod transaction;
