//! Append-only audit trail of out-of-band balance corrections.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceHistoryEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub shop_id: Uuid,
    pub previous_balance: i64,
    pub new_balance: i64,
    /// `new_balance - previous_balance`.
    pub change_amount: i64,
    pub change_reason: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub shop_id: String,
    pub previous_balance: i64,
    pub new_balance: i64,
    pub change_amount: i64,
    pub change_reason: String,
    pub created_at: DateTimeUtc,
    pub created_by: String,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BalanceHistoryEntry> for ActiveModel {
    fn from(entry: &BalanceHistoryEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            account_id: ActiveValue::Set(entry.account_id.to_string()),
            shop_id: ActiveValue::Set(entry.shop_id.to_string()),
            previous_balance: ActiveValue::Set(entry.previous_balance),
            new_balance: ActiveValue::Set(entry.new_balance),
            change_amount: ActiveValue::Set(entry.change_amount),
            change_reason: ActiveValue::Set(entry.change_reason.clone()),
            created_at: ActiveValue::Set(entry.created_at),
            created_by: ActiveValue::Set(entry.created_by.clone()),
            idempotency_key: ActiveValue::Set(entry.idempotency_key.clone()),
        }
    }
}

impl TryFrom<Model> for BalanceHistoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "balance_history")?,
            account_id: parse_uuid(&model.account_id, "account")?,
            shop_id: parse_uuid(&model.shop_id, "shop")?,
            previous_balance: model.previous_balance,
            new_balance: model.new_balance,
            change_amount: model.change_amount,
            change_reason: model.change_reason,
            created_at: model.created_at,
            created_by: model.created_by,
            idempotency_key: model.idempotency_key,
        })
    }
}
