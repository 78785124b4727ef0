/// Account limits and numbering
///
/// # Example
///
/// ```
/// use bank_shared::policy::{AccountPolicy, LimitScope};
///
/// let policy = AccountPolicy::default();
/// assert_eq!(policy.max_accounts_per_user, 10);
/// assert_eq!(policy.limit_scope, LimitScope::AllAccounts);
/// assert_eq!(policy.seed_account_number, "1000000000");
/// ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::account::AccountStatus;

/// Default per-user account limit
pub const DEFAULT_MAX_ACCOUNTS_PER_USER: i64 = 10;

/// Account number used when the store holds no account yet
pub const DEFAULT_SEED_ACCOUNT_NUMBER: &str = "1000000000";

/// Which accounts count against the per-user limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitScope {
    /// Every account the user ever opened, unregistered ones included
    #[default]
    AllAccounts,

    /// Only accounts still `IN_USE`
    InUseOnly,
}

impl LimitScope {
    /// Status filter to pass to the store when counting
    pub fn status_filter(&self) -> Option<AccountStatus> {
        match self {
            LimitScope::AllAccounts => None,
            LimitScope::InUseOnly => Some(AccountStatus::InUse),
        }
    }
}

impl FromStr for LimitScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all_accounts" => Ok(LimitScope::AllAccounts),
            "in_use" | "in_use_only" => Ok(LimitScope::InUseOnly),
            other => Err(format!("unknown account limit scope: {}", other)),
        }
    }
}

/// Rules applied when opening accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPolicy {
    /// A user may open a new account only while below this count
    pub max_accounts_per_user: i64,

    pub limit_scope: LimitScope,

    /// First account number handed out on an empty store
    pub seed_account_number: String,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            max_accounts_per_user: DEFAULT_MAX_ACCOUNTS_PER_USER,
            limit_scope: LimitScope::AllAccounts,
            seed_account_number: DEFAULT_SEED_ACCOUNT_NUMBER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_scope_from_str() {
        assert_eq!("all".parse::<LimitScope>(), Ok(LimitScope::AllAccounts));
        assert_eq!("IN_USE".parse::<LimitScope>(), Ok(LimitScope::InUseOnly));
        assert!("sometimes".parse::<LimitScope>().is_err());
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(LimitScope::AllAccounts.status_filter(), None);
        assert_eq!(
            LimitScope::InUseOnly.status_filter(),
            Some(AccountStatus::InUse)
        );
    }
}
