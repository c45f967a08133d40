//! Ledger Engine: recording and reversing debit/credit transactions.
//!
//! `current_balance` is only ever changed here (and by balance adjustments),
//! through [`apply_balance_deltas`], inside the same database transaction as
//! the ledger row.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Transaction, accounts, transactions};

mod record;
mod reverse;

/// Apply signed balance deltas as storage-level increments.
///
/// Rows are written in ascending account id order so two writers touching the
/// same pair of accounts always lock them in the same order. The increment
/// only matches rows whose balance stays inside `i64`, checked against the
/// value being written rather than an earlier read. With `only_active` set,
/// an account deactivated since validation makes the write miss and the whole
/// attempt is reported as a conflict.
pub(super) async fn apply_balance_deltas(
    db: &DatabaseTransaction,
    shop_id: Uuid,
    deltas: &mut [(Uuid, i64)],
    only_active: bool,
) -> ResultEngine<()> {
    deltas.sort_by_key(|(account_id, _)| *account_id);
    for (account_id, delta) in deltas.iter() {
        let in_range = if *delta >= 0 {
            accounts::Column::CurrentBalance.lte(i64::MAX - *delta)
        } else {
            accounts::Column::CurrentBalance.gte(i64::MIN - *delta)
        };
        let mut update = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::CurrentBalance,
                Expr::col(accounts::Column::CurrentBalance).add(*delta),
            )
            .col_expr(
                accounts::Column::Version,
                Expr::col(accounts::Column::Version).add(1),
            )
            .filter(accounts::Column::Id.eq(account_id.to_string()))
            .filter(accounts::Column::ShopId.eq(shop_id.to_string()))
            .filter(in_range);
        if only_active {
            update = update.filter(accounts::Column::Active.eq(true));
        }

        let result = update.exec(db).await?;
        if result.rows_affected != 1 {
            return Err(missed_balance_write(db, *account_id, *delta).await);
        }
    }
    Ok(())
}

/// Tell an out-of-range balance apart from a row that changed underneath.
async fn missed_balance_write(
    db: &DatabaseTransaction,
    account_id: Uuid,
    delta: i64,
) -> EngineError {
    let current = match accounts::Entity::find_by_id(account_id.to_string())
        .one(db)
        .await
    {
        Ok(model) => model.map(|m| m.current_balance),
        Err(err) => return err.into(),
    };
    match current {
        Some(balance) if balance.checked_add(delta).is_none() => {
            EngineError::InvalidAmount("balance out of range".to_string())
        }
        _ => EngineError::ConcurrentModification(format!(
            "account {account_id} changed while writing"
        )),
    }
}

async fn transaction_by_idempotency_key(
    db: &DatabaseTransaction,
    shop_id: Uuid,
    created_by: &str,
    key: &str,
) -> ResultEngine<Option<Transaction>> {
    transactions::Entity::find()
        .filter(transactions::Column::ShopId.eq(shop_id.to_string()))
        .filter(transactions::Column::CreatedBy.eq(created_by.to_string()))
        .filter(transactions::Column::IdempotencyKey.eq(key.to_string()))
        .one(db)
        .await?
        .map(Transaction::try_from)
        .transpose()
}
