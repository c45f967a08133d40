//! Aggregation Service.
//!
//! Read-only. Every call reads inside one database transaction so a ledger
//! write is seen with both of its balance changes or not at all.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Access, AccountCategory, Authorized, Caller, EngineError, ResultEngine, Transaction,
    TransactionKind, accounts, local_date, local_day_bounds, parse_timezone, transactions,
};

use super::{Engine, with_tx};

/// Totals of one shop-local day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub sales: i64,
    pub purchases: i64,
    pub expenses: i64,
    /// `sales - purchases - expenses`.
    pub net_cash_flow: i64,
    pub transaction_count: u64,
}

impl DailyStats {
    /// Fold one ledger row in. Reversed rows and reversals cancel out and are
    /// skipped, as are kinds that only move money around.
    fn add(&mut self, tx: &Transaction) -> ResultEngine<()> {
        if tx.is_reversed() || tx.is_reversal() {
            return Ok(());
        }
        let total = match tx.kind {
            TransactionKind::Sale => &mut self.sales,
            TransactionKind::Purchase => &mut self.purchases,
            TransactionKind::Expense => &mut self.expenses,
            TransactionKind::Payment | TransactionKind::Transfer => return Ok(()),
        };
        *total = checked_total(total.checked_add(tx.amount_minor))?;
        self.net_cash_flow = checked_total(
            self.sales
                .checked_sub(self.purchases)
                .and_then(|net| net.checked_sub(self.expenses)),
        )?;
        self.transaction_count += 1;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub shop_id: Uuid,
    /// Shop-local date the stats refer to.
    pub date: NaiveDate,
    /// Σ current balance of active cash accounts.
    pub cash_balance: i64,
    /// Σ current balance of active bank accounts.
    pub bank_balance: i64,
    pub today_stats: DailyStats,
    /// Writes buffered by clients and not yet received. The ledger keeps no
    /// offline queue, so this is always 0 here.
    pub pending_sync_count: u64,
}

fn checked_total(total: Option<i64>) -> ResultEngine<i64> {
    total.ok_or_else(|| EngineError::InvalidAmount("total out of range".to_string()))
}

/// Resolve the requested (or current) shop-local date to a UTC range.
fn day_range(
    auth: &Authorized,
    date: Option<NaiveDate>,
) -> ResultEngine<(NaiveDate, DateTime<Utc>, DateTime<Utc>)> {
    let tz = parse_timezone(&auth.timezone)?;
    let date = date.unwrap_or_else(|| local_date(tz, Utc::now()));
    let (from, to) = local_day_bounds(tz, date)?;
    Ok((date, from, to))
}

async fn transactions_between(
    db: &DatabaseTransaction,
    shop_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> ResultEngine<Vec<Transaction>> {
    transactions::Entity::find()
        .filter(transactions::Column::ShopId.eq(shop_id.to_string()))
        .filter(transactions::Column::CreatedAt.gte(from))
        .filter(transactions::Column::CreatedAt.lt(to))
        .order_by_asc(transactions::Column::CreatedAt)
        .order_by_asc(transactions::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Transaction::try_from)
        .collect()
}

async fn live_balance(
    db: &DatabaseTransaction,
    shop_id: Uuid,
    category: AccountCategory,
) -> ResultEngine<i64> {
    let models = accounts::Entity::find()
        .filter(accounts::Column::ShopId.eq(shop_id.to_string()))
        .filter(accounts::Column::Category.eq(category.as_str()))
        .filter(accounts::Column::Active.eq(true))
        .all(db)
        .await?;
    models.iter().try_fold(0i64, |sum, m| {
        checked_total(sum.checked_add(m.current_balance))
    })
}

impl Engine {
    /// Live cash/bank balances and the stats of `date` (today when `None`,
    /// in the shop's timezone).
    pub async fn dashboard(
        &self,
        caller: &Caller,
        shop_id: Uuid,
        date: Option<NaiveDate>,
    ) -> ResultEngine<Dashboard> {
        with_tx!(self, |db_tx| {
            let auth = self
                .authorize_in(&db_tx, caller, shop_id, Access::Read, &[])
                .await?;
            let (date, from, to) = day_range(&auth, date)?;

            let cash_balance = live_balance(&db_tx, shop_id, AccountCategory::Cash).await?;
            let bank_balance = live_balance(&db_tx, shop_id, AccountCategory::Bank).await?;

            let mut today_stats = DailyStats::default();
            for tx in transactions_between(&db_tx, shop_id, from, to).await? {
                today_stats.add(&tx)?;
            }

            Ok(Dashboard {
                shop_id,
                date,
                cash_balance,
                bank_balance,
                today_stats,
                pending_sync_count: 0,
            })
        })
    }

    /// Every ledger row of a shop-local day, reversals included, oldest first.
    pub async fn daily_transactions(
        &self,
        caller: &Caller,
        shop_id: Uuid,
        date: Option<NaiveDate>,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, |db_tx| {
            let auth = self
                .authorize_in(&db_tx, caller, shop_id, Access::Read, &[])
                .await?;
            let (_, from, to) = day_range(&auth, date)?;
            transactions_between(&db_tx, shop_id, from, to).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(kind: TransactionKind, amount_minor: i64) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            kind,
            amount_minor,
            amount_paid_minor: None,
            debit_account_id: Uuid::new_v4(),
            credit_account_id: Uuid::new_v4(),
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
    fn net_cash_flow_sign_follows_kind() {
        let mut stats = DailyStats::default();
        for row in [
            tx(TransactionKind::Sale, 15_000),
            tx(TransactionKind::Purchase, 4_000),
            tx(TransactionKind::Expense, 1_000),
            tx(TransactionKind::Payment, 99_999),
            tx(TransactionKind::Transfer, 99_999),
        ] {
            stats.add(&row).unwrap();
        }

        assert_eq!(stats.sales, 15_000);
        assert_eq!(stats.purchases, 4_000);
        assert_eq!(stats.expenses, 1_000);
        assert_eq!(stats.net_cash_flow, 10_000);
        assert_eq!(stats.transaction_count, 3);
    }

    #[test]
    fn reversed_rows_and_reversals_are_skipped() {
        let mut stats = DailyStats::default();
        let mut original = tx(TransactionKind::Sale, 15_000);
        original.reversed_at = Some(Utc::now());
        let mut reversal = tx(TransactionKind::Sale, 15_000);
        reversal.reversal_of = Some(original.id);

        stats.add(&original).unwrap();
        stats.add(&reversal).unwrap();

        assert_eq!(stats, DailyStats::default());
    }

    #[test]
    fn totals_out_of_range_are_an_error() {
        let mut stats = DailyStats::default();
        stats.add(&tx(TransactionKind::Sale, i64::MAX)).unwrap();
        let err = stats.add(&tx(TransactionKind::Sale, 1)).unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");

        let mut stats = DailyStats::default();
        stats.add(&tx(TransactionKind::Purchase, i64::MAX)).unwrap();
        let err = stats.add(&tx(TransactionKind::Expense, 2)).unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");
    }
}
