//! Ledger transactions.
//!
//! A `Transaction` moves `amount_minor` from the credit account to the debit
//! account of the same shop: debit `+= amount`, credit `-= amount`. Rows are
//! never deleted; a reversal inserts a compensating row and marks the
//! original.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Purchase,
    Expense,
    Payment,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::Expense => "expense",
            Self::Payment => "payment",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale" => Ok(Self::Sale),
            "purchase" => Ok(Self::Purchase),
            "expense" => Ok(Self::Expense),
            "payment" => Ok(Self::Payment),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidTransaction(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    /// Informational. The outstanding part is `amount_minor - amount_paid_minor`.
    pub amount_paid_minor: Option<i64>,
    pub debit_account_id: Uuid,
    pub credit_account_id: Uuid,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<String>,
    /// Set on compensating rows: the transaction this row reverses.
    pub reversal_of: Option<Uuid>,
}

impl Transaction {
    /// Signed effect of this row on `account_id`.
    #[must_use]
    pub fn effect_on(&self, account_id: Uuid) -> i64 {
        if account_id == self.debit_account_id {
            self.amount_minor
        } else if account_id == self.credit_account_id {
            -self.amount_minor
        } else {
            0
        }
    }

    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.reversed_at.is_some()
    }

    #[must_use]
    pub fn is_reversal(&self) -> bool {
        self.reversal_of.is_some()
    }

    /// Outstanding part of a partially paid transaction.
    #[must_use]
    pub fn outstanding_minor(&self) -> Option<i64> {
        self.amount_paid_minor.map(|paid| self.amount_minor - paid)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub shop_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub amount_paid_minor: Option<i64>,
    pub debit_account_id: String,
    pub credit_account_id: String,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub created_by: String,
    pub idempotency_key: Option<String>,
    pub reversed_at: Option<DateTimeUtc>,
    pub reversed_by: Option<String>,
    pub reversal_of: Option<String>,
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
}

impl Related<super::shops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            shop_id: ActiveValue::Set(tx.shop_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            amount_paid_minor: ActiveValue::Set(tx.amount_paid_minor),
            debit_account_id: ActiveValue::Set(tx.debit_account_id.to_string()),
            credit_account_id: ActiveValue::Set(tx.credit_account_id.to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            created_at: ActiveValue::Set(tx.created_at),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
            reversed_at: ActiveValue::Set(tx.reversed_at),
            reversed_by: ActiveValue::Set(tx.reversed_by.clone()),
            reversal_of: ActiveValue::Set(tx.reversal_of.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            shop_id: parse_uuid(&model.shop_id, "shop")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            amount_paid_minor: model.amount_paid_minor,
            debit_account_id: parse_uuid(&model.debit_account_id, "account")?,
            credit_account_id: parse_uuid(&model.credit_account_id, "account")?,
            description: model.description,
            created_at: model.created_at,
            created_by: model.created_by,
            idempotency_key: model.idempotency_key,
            reversed_at: model.reversed_at,
            reversed_by: model.reversed_by,
            reversal_of: parse_optional_uuid(model.reversal_of.as_deref(), "transaction")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(debit: Uuid, credit: Uuid) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            kind: TransactionKind::Sale,
            amount_minor: 15_000,
            amount_paid_minor: Some(10_000),
            debit_account_id: debit,
            credit_account_id: credit,
            description: None,
            created_at: Utc::now(),
            created_by: "alice".to_string(),
            idempotency_key: None,
            reversed_at: None,
            reversed_by: None,
            reversal_of: None,
        }
    }

    #[test]
    fn effects_are_signed_by_side() {
        let (cash, customer, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let tx = sale(cash, customer);
        assert_eq!(tx.effect_on(cash), 15_000);
        assert_eq!(tx.effect_on(customer), -15_000);
        assert_eq!(tx.effect_on(other), 0);
        assert_eq!(tx.effect_on(cash) + tx.effect_on(customer), 0);
    }

    #[test]
    fn outstanding_is_amount_minus_paid() {
        let tx = sale(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(tx.outstanding_minor(), Some(5_000));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(matches!(
            TransactionKind::try_from("refund"),
            Err(EngineError::InvalidTransaction(_))
        ));
    }
}
