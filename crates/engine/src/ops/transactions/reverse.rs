use chrono::Utc;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{Access, Caller, EngineError, ResultEngine, Transaction, transactions};

use super::super::{Engine, insert_conflict, retry_on_conflict, with_tx};
use super::apply_balance_deltas;

impl Engine {
    /// Reverses a transaction.
    ///
    /// This:
    /// - inserts a compensating row (same kind and amount, debit and credit
    ///   swapped, `reversal_of` pointing at the original)
    /// - sets `reversed_at`/`reversed_by` on the original, which is never
    ///   deleted
    /// - restores both balances, even if an account was deactivated since
    pub async fn reverse_transaction(
        &self,
        caller: &Caller,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        retry_on_conflict("reverse_transaction", move || {
            self.reverse_transaction_once(caller, transaction_id)
        })
        .await
    }

    async fn reverse_transaction_once(
        &self,
        caller: &Caller,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let reversal = with_tx!(self, |db_tx| {
            let (_, model) = self
                .authorize_transaction(&db_tx, caller, transaction_id, Access::Write)
                .await?;
            let original = Transaction::try_from(model)?;
            if original.is_reversal() {
                return Err(EngineError::InvalidTransaction(
                    "a reversal cannot be reversed".to_string(),
                ));
            }
            if original.is_reversed() {
                return Err(EngineError::AlreadyReversed);
            }

            let now = Utc::now();
            let marked = transactions::Entity::update_many()
                .col_expr(transactions::Column::ReversedAt, Expr::value(now))
                .col_expr(
                    transactions::Column::ReversedBy,
                    Expr::value(caller.user_id.clone()),
                )
                .filter(transactions::Column::Id.eq(original.id.to_string()))
                .filter(transactions::Column::ReversedAt.is_null())
                .exec(&db_tx)
                .await?;
            if marked.rows_affected != 1 {
                return Err(EngineError::ConcurrentModification(format!(
                    "transaction {} reversed concurrently",
                    original.id
                )));
            }

            let reversal = Transaction {
                id: Uuid::new_v4(),
                shop_id: original.shop_id,
                kind: original.kind,
                amount_minor: original.amount_minor,
                amount_paid_minor: None,
                debit_account_id: original.credit_account_id,
                credit_account_id: original.debit_account_id,
                description: Some(format!("reversal of {}", original.id)),
                created_at: now,
                created_by: caller.user_id.clone(),
                idempotency_key: None,
                reversed_at: None,
                reversed_by: None,
                reversal_of: Some(original.id),
            };
            transactions::ActiveModel::from(&reversal)
                .insert(&db_tx)
                .await
                .map_err(|err| insert_conflict(err, "reversal"))?;

            let mut deltas = [
                (reversal.debit_account_id, reversal.amount_minor),
                (reversal.credit_account_id, -reversal.amount_minor),
            ];
            apply_balance_deltas(&db_tx, reversal.shop_id, &mut deltas, false).await?;

            Ok(reversal)
        })?;

        tracing::info!(
            shop_id = %reversal.shop_id,
            transaction_id = %transaction_id,
            reversal_id = %reversal.id,
            "transaction reversed"
        );
        Ok(reversal)
    }
}
