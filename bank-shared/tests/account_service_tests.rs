/// Account lifecycle tests against the in-memory record store

use std::sync::Arc;

use bank_shared::error::{BankError, ErrorCode};
use bank_shared::models::account::{AccountStatus, SaveAccount};
use bank_shared::policy::{AccountPolicy, LimitScope};
use bank_shared::service::account::AccountService;
use bank_shared::store::{MemoryStore, RecordStore};

fn service(store: &Arc<MemoryStore>) -> AccountService {
    AccountService::new(store.clone())
}

fn assert_rejected<T: std::fmt::Debug>(result: Result<T, BankError>, expected: ErrorCode) {
    match result {
        Err(err) => assert_eq!(err.code(), Some(expected), "unexpected error: {}", err),
        Ok(value) => panic!("expected {}, got Ok({:?})", expected, value),
    }
}

/// Seeds an account directly through the store
async fn seed_account(
    store: &MemoryStore,
    user_id: i64,
    account_number: &str,
    balance: i64,
    status: AccountStatus,
) {
    let mut draft = SaveAccount::opening(user_id, account_number, balance);
    draft.account_status = status;
    store.save_account(draft).await.unwrap();
}

#[tokio::test]
async fn test_create_account_on_empty_store_uses_seed() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user_with_id(12, "Pobi").await;

    let created = service(&store).create_account(pobi.id, 1000).await.unwrap();

    assert_eq!(created.account_number, "1000000000");
    assert_eq!(created.user_id, 12);

    let stored = store.find_account_by_id(created.account_id).await.unwrap().unwrap();
    assert_eq!(stored.balance, 1000);
    assert_eq!(stored.account_status, AccountStatus::InUse);
    assert_eq!(stored.account_user_id, 12);
    assert!(stored.unregistered_at.is_none());
}

#[tokio::test]
async fn test_create_account_increments_latest_number() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user_with_id(12, "Pobi").await;
    let harry = store.insert_user("Harry").await;
    seed_account(&store, harry.id, "1000000012", 0, AccountStatus::InUse).await;

    let created = service(&store).create_account(pobi.id, 1000).await.unwrap();
    assert_eq!(created.account_number, "1000000013");

    let next = service(&store).create_account(harry.id, 0).await.unwrap();
    assert_eq!(next.account_number, "1000000014");
}

#[tokio::test]
async fn test_create_account_keeps_number_width() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    seed_account(&store, pobi.id, "100000012", 0, AccountStatus::InUse).await;

    let created = service(&store).create_account(pobi.id, 1000).await.unwrap();
    assert_eq!(created.account_number, "100000013");
}

#[tokio::test]
async fn test_create_account_user_not_found_writes_nothing() {
    let store = Arc::new(MemoryStore::new());

    assert_rejected(service(&store).create_account(1, 1000).await, ErrorCode::UserNotFound);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_create_account_rejects_negative_balance() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;

    assert_rejected(service(&store).create_account(pobi.id, -1).await, ErrorCode::InvalidRequest);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_create_account_max_ten_per_user() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    let svc = service(&store);

    for _ in 0..10 {
        svc.create_account(pobi.id, 100).await.unwrap();
    }
    let writes = store.write_count();

    for balance in [0, 1000, 1_000_000] {
        assert_rejected(svc.create_account(pobi.id, balance).await, ErrorCode::MaxAccountPerUser10);
    }
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_limit_counts_unregistered_accounts_by_default() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    for i in 0..10 {
        seed_account(
            &store,
            pobi.id,
            &format!("10000000{:02}", i),
            0,
            AccountStatus::Unregistered,
        )
        .await;
    }

    assert_rejected(
        service(&store).create_account(pobi.id, 100).await,
        ErrorCode::MaxAccountPerUser10,
    );
}

#[tokio::test]
async fn test_limit_scope_in_use_only() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    for i in 0..10 {
        seed_account(
            &store,
            pobi.id,
            &format!("10000000{:02}", i),
            0,
            AccountStatus::Unregistered,
        )
        .await;
    }

    let svc = AccountService::with_policy(
        store.clone(),
        AccountPolicy {
            limit_scope: LimitScope::InUseOnly,
            ..Default::default()
        },
    );

    let created = svc.create_account(pobi.id, 100).await.unwrap();
    assert_eq!(created.account_number, "1000000010");
}

#[tokio::test]
async fn test_delete_account_success() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user_with_id(12, "Pobi").await;
    seed_account(&store, pobi.id, "1000000012", 0, AccountStatus::InUse).await;

    let deleted = service(&store)
        .delete_account(12, "1000000012")
        .await
        .unwrap();

    assert_eq!(deleted.user_id, 12);
    assert_eq!(deleted.account_number, "1000000012");

    let stored = store.find_account_by_number("1000000012").await.unwrap().unwrap();
    assert_eq!(stored.account_status, AccountStatus::Unregistered);
    assert_eq!(stored.unregistered_at, Some(deleted.unregistered_at));
}

#[tokio::test]
async fn test_delete_account_twice_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    seed_account(&store, pobi.id, "1000000012", 0, AccountStatus::InUse).await;
    let svc = service(&store);

    svc.delete_account(pobi.id, "1000000012").await.unwrap();
    let writes = store.write_count();

    assert_rejected(
        svc.delete_account(pobi.id, "1000000012").await,
        ErrorCode::AccountAlreadyUnregistered,
    );
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_delete_account_user_not_found() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    seed_account(&store, pobi.id, "1000000012", 0, AccountStatus::InUse).await;
    let writes = store.write_count();

    assert_rejected(
        service(&store).delete_account(99, "1000000012").await,
        ErrorCode::UserNotFound,
    );
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_delete_account_not_found() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;

    assert_rejected(
        service(&store).delete_account(pobi.id, "1234567890").await,
        ErrorCode::AccountNotFound,
    );
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_delete_account_owner_mismatch() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    let harry = store.insert_user("Harry").await;
    seed_account(&store, harry.id, "1000000012", 0, AccountStatus::InUse).await;
    let writes = store.write_count();

    assert_rejected(
        service(&store).delete_account(pobi.id, "1000000012").await,
        ErrorCode::UserAccountUnmatch,
    );
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_delete_account_balance_not_empty_leaves_record_unchanged() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user_with_id(12, "Pobi").await;
    seed_account(&store, pobi.id, "1000000012", 100, AccountStatus::InUse).await;
    let before = store.find_account_by_number("1000000012").await.unwrap().unwrap();

    assert_rejected(
        service(&store).delete_account(12, "1000000012").await,
        ErrorCode::BalanceNotEmpty,
    );

    let after = store.find_account_by_number("1000000012").await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_get_accounts_by_user_id() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    let harry = store.insert_user("Harry").await;
    seed_account(&store, pobi.id, "1111111111", 1000, AccountStatus::InUse).await;
    seed_account(&store, harry.id, "1111111112", 5000, AccountStatus::InUse).await;
    seed_account(&store, pobi.id, "2222222222", 2000, AccountStatus::InUse).await;
    seed_account(&store, pobi.id, "3333333333", 3000, AccountStatus::InUse).await;

    let accounts = service(&store).get_accounts_by_user_id(pobi.id).await.unwrap();

    let listed: Vec<(&str, i64)> = accounts
        .iter()
        .map(|a| (a.account_number.as_str(), a.balance))
        .collect();
    assert_eq!(
        listed,
        vec![("1111111111", 1000), ("2222222222", 2000), ("3333333333", 3000)]
    );
}

#[tokio::test]
async fn test_get_accounts_by_user_id_empty_and_unknown() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    let svc = service(&store);

    assert!(svc.get_accounts_by_user_id(pobi.id).await.unwrap().is_empty());
    assert_rejected(svc.get_accounts_by_user_id(42).await, ErrorCode::UserNotFound);
}

#[tokio::test]
async fn test_get_account_is_read_only() {
    let store = Arc::new(MemoryStore::new());
    let pobi = store.insert_user("Pobi").await;
    seed_account(&store, pobi.id, "65789", 0, AccountStatus::Unregistered).await;
    let writes = store.write_count();

    let account = service(&store).get_account(1).await.unwrap();

    assert_eq!(account.account_number, "65789");
    assert_eq!(account.account_status, AccountStatus::Unregistered);
    assert_eq!(store.write_count(), writes);

    assert_rejected(service(&store).get_account(45551).await, ErrorCode::AccountNotFound);
}
