//! Accounts: where a shop's money sits (cash drawer, bank) or whom it is
//! owed by/to (customers, vendors), plus expense categories.
//!
//! `current_balance` is a materialized value. Only the ledger and balance
//! adjustments write it.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Cash,
    Bank,
    /// Customer or vendor balance.
    Customer,
    ExpenseCategory,
}

impl AccountCategory {
    pub const ALL: [AccountCategory; 4] = [
        Self::Cash,
        Self::Bank,
        Self::Customer,
        Self::ExpenseCategory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::Customer => "customer",
            Self::ExpenseCategory => "expense_category",
        }
    }
}

impl TryFrom<&str> for AccountCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "bank" => Ok(Self::Bank),
            "customer" => Ok(Self::Customer),
            "expense_category" => Ok(Self::ExpenseCategory),
            other => Err(EngineError::InvalidAccount(format!(
                "invalid account category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub category: AccountCategory,
    pub name: String,
    pub name_local: Option<String>,
    /// Balance at creation. Never changes afterwards.
    pub opening_balance: i64,
    pub current_balance: i64,
    pub is_default: bool,
    pub active: bool,
    /// Bumped by every balance write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub(crate) fn new(
        shop_id: Uuid,
        category: AccountCategory,
        name: String,
        name_local: Option<String>,
        opening_balance: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            shop_id,
            category,
            name,
            name_local,
            opening_balance,
            current_balance: opening_balance,
            is_default: false,
            active: true,
            version: 0,
            created_at,
        }
    }

    pub(crate) fn ensure_active(&self) -> ResultEngine<()> {
        if !self.active {
            return Err(EngineError::InvalidAccount(format!(
                "account {} is inactive",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub shop_id: String,
    pub category: String,
    pub name: String,
    pub name_local: Option<String>,
    pub opening_balance: i64,
    pub current_balance: i64,
    pub is_default: bool,
    pub active: bool,
    pub version: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shops::Entity",
        from = "Column::ShopId",
        to = "super::shops::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Shops,
    #[sea_orm(has_many = "super::balance_history::Entity")]
    BalanceHistory,
}

impl Related<super::shops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shops.def()
    }
}

impl Related<super::balance_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            shop_id: ActiveValue::Set(account.shop_id.to_string()),
            category: ActiveValue::Set(account.category.as_str().to_string()),
            name: ActiveValue::Set(account.name.clone()),
            name_local: ActiveValue::Set(account.name_local.clone()),
            opening_balance: ActiveValue::Set(account.opening_balance),
            current_balance: ActiveValue::Set(account.current_balance),
            is_default: ActiveValue::Set(account.is_default),
            active: ActiveValue::Set(account.active),
            version: ActiveValue::Set(account.version),
            created_at: ActiveValue::Set(account.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            shop_id: parse_uuid(&model.shop_id, "shop")?,
            category: AccountCategory::try_from(model.category.as_str())?,
            name: model.name,
            name_local: model.name_local,
            opening_balance: model.opening_balance,
            current_balance: model.current_balance,
            is_default: model.is_default,
            active: model.active,
            version: model.version,
            created_at: model.created_at,
        })
    }
}
