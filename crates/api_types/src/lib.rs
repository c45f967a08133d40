//! Request and response bodies of the HTTP API.
//!
//! Amounts in requests are decimal strings with at most two fraction digits
//! (`"150.00"`, `"-3,5"`). Amounts in responses are signed minor units.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable, locale-independent code (`SAME_ACCOUNT`, `DENIED`, ...).
    pub code: String,
    pub error: String,
}

pub mod shop {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShopNew {
        pub name: String,
        pub name_local: Option<String>,
        pub code: String,
        /// IANA name. Defaults to `UTC`.
        pub timezone: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShopView {
        pub id: Uuid,
        pub name: String,
        pub name_local: Option<String>,
        pub code: String,
        pub owner_id: String,
        pub timezone: String,
        pub active: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShopsResponse {
        pub shops: Vec<ShopView>,
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountCategory {
        Cash,
        Bank,
        Customer,
        ExpenseCategory,
    }

    /// One side of a transaction.
    ///
    /// `{"id": "<uuid>"}` or `{"default": "cash"}`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountSelector {
        Id(Uuid),
        Default(AccountCategory),
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub category: AccountCategory,
        pub name: String,
        pub name_local: Option<String>,
        /// Decimal. Defaults to zero.
        pub opening_balance: Option<String>,
        #[serde(default)]
        pub is_default: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountList {
        pub category: Option<AccountCategory>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountDeactivate {
        /// Deactivate despite a non-zero balance. Admins only.
        #[serde(default, rename = "override")]
        pub override_balance: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub shop_id: Uuid,
        pub category: AccountCategory,
        pub name: String,
        pub name_local: Option<String>,
        pub opening_balance_minor: i64,
        pub current_balance_minor: i64,
        pub is_default: bool,
        pub active: bool,
        pub version: i64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountsResponse {
        pub accounts: Vec<AccountView>,
    }
}

pub mod transaction {
    use super::*;
    use crate::account::AccountSelector;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Sale,
        Purchase,
        Expense,
        Payment,
        Transfer,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        /// Decimal, must be > 0.
        pub amount: String,
        pub debit: AccountSelector,
        pub credit: AccountSelector,
        /// Decimal, informational.
        pub amount_paid: Option<String>,
        pub description: Option<String>,
        /// Optional idempotency key for safely retrying the same create request.
        pub idempotency_key: Option<String>,
    }

    /// Query of the per-day endpoints. `date` is shop-local; today when absent.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DayQuery {
        pub date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub shop_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub amount_paid_minor: Option<i64>,
        pub debit_account_id: Uuid,
        pub credit_account_id: Uuid,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
        pub created_by: String,
        pub reversed_at: Option<DateTime<Utc>>,
        pub reversed_by: Option<String>,
        pub reversal_of: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionsResponse {
        pub transactions: Vec<TransactionView>,
    }
}

pub mod balance {
    use super::*;
    use crate::account::AccountCategory;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceAdjust {
        /// Decimal target balance.
        pub new_balance: String,
        pub change_reason: String,
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct HistoryQuery {
        pub limit: Option<u64>,
        /// Opaque pagination cursor, from `next_cursor`.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceHistoryEntryView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub previous_balance_minor: i64,
        pub new_balance_minor: i64,
        pub change_amount_minor: i64,
        pub change_reason: String,
        pub created_at: DateTime<Utc>,
        pub created_by: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceHistoryResponse {
        pub entries: Vec<BalanceHistoryEntryView>,
        /// Opaque cursor for fetching the next page (older entries).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceAuditView {
        pub account_id: Uuid,
        pub category: AccountCategory,
        pub name: String,
        pub opening_balance_minor: i64,
        pub expected_balance_minor: i64,
        pub stored_balance_minor: i64,
        pub drift_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuditResponse {
        pub accounts: Vec<BalanceAuditView>,
    }
}

pub mod dashboard {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DailyStatsView {
        pub sales_minor: i64,
        pub purchases_minor: i64,
        pub expenses_minor: i64,
        pub net_cash_flow_minor: i64,
        pub transaction_count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DashboardView {
        pub shop_id: Uuid,
        pub date: NaiveDate,
        pub cash_balance_minor: i64,
        pub bank_balance_minor: i64,
        pub today_stats: DailyStatsView,
        pub pending_sync_count: u64,
    }
}
