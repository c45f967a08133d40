//! Command structs for engine write operations.
//!
//! They group parameters so call sites stay readable; optional fields are set
//! with builder-style methods.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountCategory, TransactionKind};

/// One side of a transaction: an explicit account, or the shop's default
/// account of a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountRef {
    Id(Uuid),
    Default(AccountCategory),
}

impl From<Uuid> for AccountRef {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl From<AccountCategory> for AccountRef {
    fn from(category: AccountCategory) -> Self {
        Self::Default(category)
    }
}

/// Record a debit/credit transaction.
#[derive(Clone, Debug)]
pub struct RecordTransactionCmd {
    pub shop_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub debit: AccountRef,
    pub credit: AccountRef,
    pub amount_paid_minor: Option<i64>,
    pub description: Option<String>,
    pub idempotency_key: Option<String>,
    /// Defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

impl RecordTransactionCmd {
    #[must_use]
    pub fn new(
        shop_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        debit: impl Into<AccountRef>,
        credit: impl Into<AccountRef>,
    ) -> Self {
        Self {
            shop_id,
            kind,
            amount_minor,
            debit: debit.into(),
            credit: credit.into(),
            amount_paid_minor: None,
            description: None,
            idempotency_key: None,
            created_at: None,
        }
    }

    #[must_use]
    pub fn amount_paid(mut self, amount_paid_minor: i64) -> Self {
        self.amount_paid_minor = Some(amount_paid_minor);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Set an account's balance to an absolute value, with a reason.
#[derive(Clone, Debug)]
pub struct AdjustBalanceCmd {
    pub account_id: Uuid,
    pub new_balance_minor: i64,
    pub change_reason: String,
    pub idempotency_key: Option<String>,
}

impl AdjustBalanceCmd {
    #[must_use]
    pub fn new(account_id: Uuid, new_balance_minor: i64, change_reason: impl Into<String>) -> Self {
        Self {
            account_id,
            new_balance_minor,
            change_reason: change_reason.into(),
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Create an account in a shop.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub shop_id: Uuid,
    pub category: AccountCategory,
    pub name: String,
    pub name_local: Option<String>,
    pub opening_balance_minor: i64,
    pub is_default: bool,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(shop_id: Uuid, category: AccountCategory, name: impl Into<String>) -> Self {
        Self {
            shop_id,
            category,
            name: name.into(),
            name_local: None,
            opening_balance_minor: 0,
            is_default: false,
        }
    }

    #[must_use]
    pub fn name_local(mut self, name_local: impl Into<String>) -> Self {
        self.name_local = Some(name_local.into());
        self
    }

    #[must_use]
    pub fn opening_balance(mut self, opening_balance_minor: i64) -> Self {
        self.opening_balance_minor = opening_balance_minor;
        self
    }

    #[must_use]
    pub fn default_account(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Create a shop owned by the calling admin.
#[derive(Clone, Debug)]
pub struct NewShopCmd {
    pub name: String,
    pub name_local: Option<String>,
    pub code: String,
    /// IANA name. Defaults to `UTC`.
    pub timezone: Option<String>,
}

impl NewShopCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_local: None,
            code: code.into(),
            timezone: None,
        }
    }

    #[must_use]
    pub fn name_local(mut self, name_local: impl Into<String>) -> Self {
        self.name_local = Some(name_local.into());
        self
    }

    #[must_use]
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}
