use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Access, Account, AccountRef, Caller, EngineError, RecordTransactionCmd, Resource,
    ResultEngine, Transaction, accounts, transactions,
    util::normalize_optional_text,
};

use super::super::{Engine, insert_conflict, retry_on_conflict, with_tx};
use super::{apply_balance_deltas, transaction_by_idempotency_key};

/// Whether a request carrying a known idempotency key is the same write.
///
/// Sides given as a category default are not compared, the default may have
/// moved since the first write.
fn replay_matches(existing: &Transaction, cmd: &RecordTransactionCmd) -> bool {
    let side_matches = |side: AccountRef, recorded: Uuid| match side {
        AccountRef::Id(id) => id == recorded,
        AccountRef::Default(_) => true,
    };
    existing.kind == cmd.kind
        && existing.amount_minor == cmd.amount_minor
        && existing.amount_paid_minor == cmd.amount_paid_minor
        && side_matches(cmd.debit, existing.debit_account_id)
        && side_matches(cmd.credit, existing.credit_account_id)
}

impl Engine {
    /// Records a debit/credit transaction.
    ///
    /// In one database transaction: inserts the ledger row, then applies
    /// `debit += amount` and `credit -= amount`. Replaying an idempotency key
    /// returns the row recorded the first time; reusing it for a different
    /// kind, amount or explicit account is an `InvalidTransaction`.
    pub async fn record_transaction(
        &self,
        caller: &Caller,
        cmd: RecordTransactionCmd,
    ) -> ResultEngine<Transaction> {
        let cmd = &cmd;
        retry_on_conflict("record_transaction", move || {
            self.record_transaction_once(caller, cmd)
        })
        .await
    }

    async fn record_transaction_once(
        &self,
        caller: &Caller,
        cmd: &RecordTransactionCmd,
    ) -> ResultEngine<Transaction> {
        let (tx, replayed) = with_tx!(self, |db_tx| {
            let explicit: Vec<Resource> = [cmd.debit, cmd.credit]
                .into_iter()
                .filter_map(|side| match side {
                    AccountRef::Id(id) => Some(Resource::Account(id)),
                    AccountRef::Default(_) => None,
                })
                .collect();
            self.authorize_in(&db_tx, caller, cmd.shop_id, Access::Write, &explicit)
                .await?;

            let replay = match cmd.idempotency_key.as_deref() {
                Some(key) => {
                    transaction_by_idempotency_key(&db_tx, cmd.shop_id, &caller.user_id, key)
                        .await?
                }
                None => None,
            };
            match replay {
                Some(existing) if !replay_matches(&existing, cmd) => {
                    Err(EngineError::InvalidTransaction(
                        "idempotency key reused with different payload".to_string(),
                    ))
                }
                Some(existing) => Ok((existing, true)),
                None => self
                    .insert_transaction(&db_tx, caller, cmd)
                    .await
                    .map(|tx| (tx, false)),
            }
        })?;

        if replayed {
            tracing::debug!(transaction_id = %tx.id, "idempotent replay");
        } else {
            tracing::info!(
                shop_id = %tx.shop_id,
                transaction_id = %tx.id,
                kind = tx.kind.as_str(),
                amount_minor = tx.amount_minor,
                "transaction recorded"
            );
        }
        Ok(tx)
    }

    async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        caller: &Caller,
        cmd: &RecordTransactionCmd,
    ) -> ResultEngine<Transaction> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        let debit = self
            .resolve_account_ref(db_tx, caller, cmd.shop_id, cmd.debit)
            .await?;
        let credit = self
            .resolve_account_ref(db_tx, caller, cmd.shop_id, cmd.credit)
            .await?;
        if debit.id == credit.id {
            return Err(EngineError::SameAccount);
        }
        if let Some(paid) = cmd.amount_paid_minor
            && paid < 0
        {
            return Err(EngineError::InvalidAmount(
                "amount paid must be >= 0".to_string(),
            ));
        }

        let tx = Transaction {
            id: Uuid::new_v4(),
            shop_id: cmd.shop_id,
            kind: cmd.kind,
            amount_minor: cmd.amount_minor,
            amount_paid_minor: cmd.amount_paid_minor,
            debit_account_id: debit.id,
            credit_account_id: credit.id,
            description: normalize_optional_text(cmd.description.as_deref()),
            created_at: cmd.created_at.unwrap_or_else(Utc::now),
            created_by: caller.user_id.clone(),
            idempotency_key: cmd.idempotency_key.clone(),
            reversed_at: None,
            reversed_by: None,
            reversal_of: None,
        };

        transactions::ActiveModel::from(&tx)
            .insert(db_tx)
            .await
            .map_err(|err| insert_conflict(err, "transaction"))?;

        let mut deltas = [(debit.id, tx.amount_minor), (credit.id, -tx.amount_minor)];
        apply_balance_deltas(db_tx, tx.shop_id, &mut deltas, true).await?;

        Ok(tx)
    }

    /// Resolve one side of a transaction to an active account of the shop.
    async fn resolve_account_ref(
        &self,
        db_tx: &DatabaseTransaction,
        caller: &Caller,
        shop_id: Uuid,
        side: AccountRef,
    ) -> ResultEngine<Account> {
        let model = match side {
            AccountRef::Id(id) => {
                self.require_account_in_shop(db_tx, caller, shop_id, id)
                    .await?
            }
            AccountRef::Default(category) => accounts::Entity::find()
                .filter(accounts::Column::ShopId.eq(shop_id.to_string()))
                .filter(accounts::Column::Category.eq(category.as_str()))
                .filter(accounts::Column::IsDefault.eq(true))
                .filter(accounts::Column::Active.eq(true))
                .one(db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::InvalidAccount(format!(
                        "no default {} account",
                        category.as_str()
                    ))
                })?,
        };
        let account = Account::try_from(model)?;
        account.ensure_active()?;
        Ok(account)
    }
}
