/// Business services
///
/// - `account`: account lifecycle (create, delete, list, get)
/// - `transaction`: balance use/cancel and ledger queries
///
/// Services hold an `Arc<dyn RecordStore>` and are cheap to clone.

pub mod account;
pub mod transaction;
