//! Balance Adjustment: out-of-band corrections with an append-only history.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Access, Account, AdjustBalanceCmd, BalanceHistoryEntry, Caller, EngineError, ResultEngine,
    accounts, balance_history,
};

use super::{Engine, insert_conflict, retry_on_conflict, with_tx};

const MAX_PAGE_SIZE: u64 = 100;

/// One page of balance history, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceHistoryPage {
    pub entries: Vec<BalanceHistoryEntry>,
    /// Opaque; pass back to get the next (older) page. `None` on the last page.
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HistoryCursor {
    created_at: DateTime<Utc>,
    entry_id: String,
}

impl HistoryCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))
    }
}

async fn entry_by_idempotency_key(
    db: &DatabaseTransaction,
    account_id: Uuid,
    created_by: &str,
    key: &str,
) -> ResultEngine<Option<BalanceHistoryEntry>> {
    balance_history::Entity::find()
        .filter(balance_history::Column::AccountId.eq(account_id.to_string()))
        .filter(balance_history::Column::CreatedBy.eq(created_by.to_string()))
        .filter(balance_history::Column::IdempotencyKey.eq(key.to_string()))
        .one(db)
        .await?
        .map(BalanceHistoryEntry::try_from)
        .transpose()
}

async fn insert_adjustment(
    db_tx: &DatabaseTransaction,
    caller: &Caller,
    cmd: &AdjustBalanceCmd,
    model: accounts::Model,
    reason: &str,
) -> ResultEngine<BalanceHistoryEntry> {
    let account = Account::try_from(model)?;
    account.ensure_active()?;
    let change_amount = cmd
        .new_balance_minor
        .checked_sub(account.current_balance)
        .ok_or_else(|| EngineError::InvalidAmount("change out of range".to_string()))?;

    let entry = BalanceHistoryEntry {
        id: Uuid::new_v4(),
        account_id: account.id,
        shop_id: account.shop_id,
        previous_balance: account.current_balance,
        new_balance: cmd.new_balance_minor,
        change_amount,
        change_reason: reason.to_string(),
        created_at: Utc::now(),
        created_by: caller.user_id.clone(),
        idempotency_key: cmd.idempotency_key.clone(),
    };
    balance_history::ActiveModel::from(&entry)
        .insert(db_tx)
        .await
        .map_err(|err| insert_conflict(err, "balance history entry"))?;

    // Compare-and-swap on version.
    let swapped = accounts::Entity::update_many()
        .col_expr(
            accounts::Column::CurrentBalance,
            Expr::value(cmd.new_balance_minor),
        )
        .col_expr(
            accounts::Column::Version,
            Expr::col(accounts::Column::Version).add(1),
        )
        .filter(accounts::Column::Id.eq(account.id.to_string()))
        .filter(accounts::Column::Version.eq(account.version))
        .exec(db_tx)
        .await?;
    if swapped.rows_affected != 1 {
        return Err(EngineError::ConcurrentModification(format!(
            "account {} changed while adjusting",
            account.id
        )));
    }
    Ok(entry)
}

impl Engine {
    /// Sets an account's balance to `new_balance_minor` and records why.
    ///
    /// The history entry and the balance change commit together. The balance
    /// write is a compare-and-swap on the account version; losing it to a
    /// concurrent writer restarts the whole attempt.
    pub async fn adjust_balance(
        &self,
        caller: &Caller,
        cmd: AdjustBalanceCmd,
    ) -> ResultEngine<BalanceHistoryEntry> {
        let cmd = &cmd;
        retry_on_conflict("adjust_balance", move || self.adjust_balance_once(caller, cmd)).await
    }

    async fn adjust_balance_once(
        &self,
        caller: &Caller,
        cmd: &AdjustBalanceCmd,
    ) -> ResultEngine<BalanceHistoryEntry> {
        let (entry, replayed) = with_tx!(self, |db_tx| {
            let (_, model) = self
                .authorize_account(&db_tx, caller, cmd.account_id, Access::Write)
                .await?;
            let reason = cmd.change_reason.trim();
            if reason.is_empty() {
                return Err(EngineError::ReasonRequired);
            }
            let replay = match cmd.idempotency_key.as_deref() {
                Some(key) => {
                    entry_by_idempotency_key(&db_tx, cmd.account_id, &caller.user_id, key).await?
                }
                None => None,
            };
            match replay {
                Some(existing) if existing.new_balance != cmd.new_balance_minor => {
                    Err(EngineError::InvalidTransaction(
                        "idempotency key reused with different payload".to_string(),
                    ))
                }
                Some(existing) => Ok((existing, true)),
                None => insert_adjustment(&db_tx, caller, cmd, model, reason)
                    .await
                    .map(|entry| (entry, false)),
            }
        })?;

        if !replayed {
            tracing::info!(
                shop_id = %entry.shop_id,
                account_id = %entry.account_id,
                previous_balance = entry.previous_balance,
                new_balance = entry.new_balance,
                "balance adjusted"
            );
        }
        Ok(entry)
    }

    /// Balance history of an account, newest first.
    pub async fn balance_history(
        &self,
        caller: &Caller,
        account_id: Uuid,
        limit: u64,
    ) -> ResultEngine<Vec<BalanceHistoryEntry>> {
        let page = self
            .balance_history_page(caller, account_id, limit, None)
            .await?;
        Ok(page.entries)
    }

    /// Balance history of an account with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(created_at DESC, id DESC)`. `limit`
    /// is clamped to `1..=100`.
    pub async fn balance_history_page(
        &self,
        caller: &Caller,
        account_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<BalanceHistoryPage> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        with_tx!(self, |db_tx| {
            self.authorize_account(&db_tx, caller, account_id, Access::Read)
                .await?;

            let mut query = balance_history::Entity::find()
                .filter(balance_history::Column::AccountId.eq(account_id.to_string()))
                .order_by_desc(balance_history::Column::CreatedAt)
                .order_by_desc(balance_history::Column::Id)
                .limit(limit + 1);
            if let Some(cursor) = cursor {
                let cursor = HistoryCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(balance_history::Column::CreatedAt.lt(cursor.created_at))
                        .add(
                            Condition::all()
                                .add(balance_history::Column::CreatedAt.eq(cursor.created_at))
                                .add(balance_history::Column::Id.lt(cursor.entry_id)),
                        ),
                );
            }

            let models = query.all(&db_tx).await?;
            let has_more = models.len() as u64 > limit;
            let entries = models
                .into_iter()
                .take(limit as usize)
                .map(BalanceHistoryEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let next_cursor = match entries.last() {
                Some(last) if has_more => Some(
                    HistoryCursor {
                        created_at: last.created_at,
                        entry_id: last.id.to_string(),
                    }
                    .encode()?,
                ),
                _ => None,
            };

            Ok(BalanceHistoryPage {
                entries,
                next_cursor,
            })
        })
    }
}
