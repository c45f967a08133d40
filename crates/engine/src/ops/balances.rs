use std::collections::HashMap;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Access, Account, AccountCategory, Caller, EngineError, ResultEngine, Transaction, accounts,
    balance_history, transactions, util::parse_uuid,
};

use super::{Engine, with_tx};

/// Stored balance of one account next to the balance derived from history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub account_id: Uuid,
    pub category: AccountCategory,
    pub name: String,
    pub opening_balance: i64,
    /// `opening + Σ transaction effects + Σ adjustments`.
    pub expected_balance: i64,
    pub stored_balance: i64,
    /// `stored - expected`. Anything but 0 is a bug.
    pub drift: i64,
}

impl Engine {
    /// Recomputes every account balance of a shop from the ledger
    /// (`transactions` + `balance_history`) and reports it next to the stored
    /// `current_balance`.
    ///
    /// - Reversed transactions are counted together with their reversal, so
    ///   they cancel out.
    /// - Read-only; drift is reported, never repaired.
    pub async fn audit_balances(
        &self,
        caller: &Caller,
        shop_id: Uuid,
    ) -> ResultEngine<Vec<BalanceAudit>> {
        let audits = with_tx!(self, |db_tx| {
            self.authorize_in(&db_tx, caller, shop_id, Access::Read, &[])
                .await?;

            let account_models = accounts::Entity::find()
                .filter(accounts::Column::ShopId.eq(shop_id.to_string()))
                .order_by_asc(accounts::Column::CreatedAt)
                .order_by_asc(accounts::Column::Id)
                .all(&db_tx)
                .await?;
            let tx_models = transactions::Entity::find()
                .filter(transactions::Column::ShopId.eq(shop_id.to_string()))
                .all(&db_tx)
                .await?;
            let history_models = balance_history::Entity::find()
                .filter(balance_history::Column::ShopId.eq(shop_id.to_string()))
                .all(&db_tx)
                .await?;

            // Summed wide: only the final balance has to fit in i64.
            let mut effects: HashMap<Uuid, i128> = HashMap::new();
            for model in tx_models {
                let tx = Transaction::try_from(model)?;
                *effects.entry(tx.debit_account_id).or_default() += i128::from(tx.amount_minor);
                *effects.entry(tx.credit_account_id).or_default() -= i128::from(tx.amount_minor);
            }
            for model in history_models {
                let account_id = parse_uuid(&model.account_id, "account")?;
                *effects.entry(account_id).or_default() += i128::from(model.change_amount);
            }

            account_models
                .into_iter()
                .map(|model| {
                    let account = Account::try_from(model)?;
                    let expected = i128::from(account.opening_balance)
                        + effects.get(&account.id).copied().unwrap_or(0);
                    let drift = i128::from(account.current_balance) - expected;
                    let (Ok(expected_balance), Ok(drift)) =
                        (i64::try_from(expected), i64::try_from(drift))
                    else {
                        return Err(EngineError::InvalidAmount(format!(
                            "balance of account {} out of range",
                            account.id
                        )));
                    };
                    Ok(BalanceAudit {
                        account_id: account.id,
                        category: account.category,
                        name: account.name,
                        opening_balance: account.opening_balance,
                        expected_balance,
                        stored_balance: account.current_balance,
                        drift,
                    })
                })
                .collect::<ResultEngine<Vec<_>>>()
        })?;

        for audit in audits.iter().filter(|a| a.drift != 0) {
            tracing::error!(
                shop_id = %shop_id,
                account_id = %audit.account_id,
                drift = audit.drift,
                "balance drift detected"
            );
        }
        Ok(audits)
    }
}
