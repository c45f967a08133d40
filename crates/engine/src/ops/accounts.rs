//! Account Store.
//!
//! No balance setter here: balances move through the ledger or through
//! `adjust_balance` only.

use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Access, Account, AccountCategory, Caller, EngineError, Money, NewAccountCmd, ResultEngine,
    accounts,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, access::denied, retry_on_conflict, with_tx};

/// Clear the default flag of `category` in `shop_id`, except on `keep`.
async fn clear_default(
    db: &DatabaseTransaction,
    shop_id: Uuid,
    category: AccountCategory,
    keep: Option<Uuid>,
) -> ResultEngine<()> {
    let mut update = accounts::Entity::update_many()
        .col_expr(accounts::Column::IsDefault, Expr::value(false))
        .filter(accounts::Column::ShopId.eq(shop_id.to_string()))
        .filter(accounts::Column::Category.eq(category.as_str()))
        .filter(accounts::Column::IsDefault.eq(true));
    if let Some(keep) = keep {
        update = update.filter(accounts::Column::Id.ne(keep.to_string()));
    }
    update.exec(db).await?;
    Ok(())
}

impl Engine {
    /// Creates an account with `current_balance == opening_balance`.
    ///
    /// The first account of a category becomes its default; asking for
    /// `is_default` moves the flag away from the previous default.
    pub async fn create_account(&self, caller: &Caller, cmd: NewAccountCmd) -> ResultEngine<Account> {
        let account = with_tx!(self, |db_tx| {
            self.authorize_in(&db_tx, caller, cmd.shop_id, Access::Write, &[])
                .await?;
            let name = normalize_required_name(&cmd.name, "account")?;
            let name_local = normalize_optional_text(cmd.name_local.as_deref());

            let siblings: Vec<accounts::Model> = accounts::Entity::find()
                .filter(accounts::Column::ShopId.eq(cmd.shop_id.to_string()))
                .filter(accounts::Column::Category.eq(cmd.category.as_str()))
                .all(&db_tx)
                .await?;
            let lowered = name.to_lowercase();
            if siblings.iter().any(|m| m.name.to_lowercase() == lowered) {
                return Err(EngineError::ExistingKey(name));
            }
            let has_default = siblings.iter().any(|m| m.is_default);

            let mut account = Account::new(
                cmd.shop_id,
                cmd.category,
                name,
                name_local,
                cmd.opening_balance_minor,
                Utc::now(),
            );
            account.is_default = cmd.is_default || !has_default;
            if cmd.is_default && has_default {
                clear_default(&db_tx, cmd.shop_id, cmd.category, None).await?;
            }
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            Ok(account)
        })?;

        tracing::info!(
            shop_id = %account.shop_id,
            account_id = %account.id,
            category = account.category.as_str(),
            is_default = account.is_default,
            "account created"
        );
        Ok(account)
    }

    pub async fn account(&self, caller: &Caller, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let (_, model) = self
                .authorize_account(&db_tx, caller, account_id, Access::Read)
                .await?;
            Account::try_from(model)
        })
    }

    /// Lists a shop's accounts, inactive ones included, oldest first.
    pub async fn list_accounts(
        &self,
        caller: &Caller,
        shop_id: Uuid,
        category: Option<AccountCategory>,
    ) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            self.authorize_in(&db_tx, caller, shop_id, Access::Read, &[])
                .await?;
            let mut query = accounts::Entity::find()
                .filter(accounts::Column::ShopId.eq(shop_id.to_string()));
            if let Some(category) = category {
                query = query.filter(accounts::Column::Category.eq(category.as_str()));
            }
            let models = query
                .order_by_asc(accounts::Column::CreatedAt)
                .order_by_asc(accounts::Column::Id)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(Account::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Makes `account_id` the default of its category. The previous default is
    /// cleared in the same database transaction.
    pub async fn set_default(&self, caller: &Caller, account_id: Uuid) -> ResultEngine<Account> {
        let account = with_tx!(self, |db_tx| {
            let (_, model) = self
                .authorize_account(&db_tx, caller, account_id, Access::Write)
                .await?;
            let mut account = Account::try_from(model)?;
            account.ensure_active()?;
            if !account.is_default {
                clear_default(&db_tx, account.shop_id, account.category, Some(account.id))
                    .await?;
                accounts::Entity::update_many()
                    .col_expr(accounts::Column::IsDefault, Expr::value(true))
                    .filter(accounts::Column::Id.eq(account.id.to_string()))
                    .exec(&db_tx)
                    .await?;
                account.is_default = true;
            }
            Ok(account)
        })?;

        tracing::info!(
            shop_id = %account.shop_id,
            account_id = %account.id,
            category = account.category.as_str(),
            "default account set"
        );
        Ok(account)
    }

    /// Deactivates an account.
    ///
    /// The balance must be zero unless `override_balance` is set, which only
    /// admins may do. An override on a zero balance is ignored. Deactivating
    /// an inactive account is a no-op.
    pub async fn deactivate_account(
        &self,
        caller: &Caller,
        account_id: Uuid,
        override_balance: bool,
    ) -> ResultEngine<Account> {
        retry_on_conflict("deactivate_account", move || {
            self.deactivate_account_once(caller, account_id, override_balance)
        })
        .await
    }

    async fn deactivate_account_once(
        &self,
        caller: &Caller,
        account_id: Uuid,
        override_balance: bool,
    ) -> ResultEngine<Account> {
        let account = with_tx!(self, |db_tx| {
            let (_, model) = self
                .authorize_account(&db_tx, caller, account_id, Access::Write)
                .await?;
            let mut account = Account::try_from(model)?;
            if !account.active {
                // Nothing to commit.
                return Ok(account);
            }
            if account.current_balance != 0 {
                if !override_balance {
                    return Err(EngineError::NonZeroBalance(format!(
                        "account {} holds {}",
                        account.id,
                        Money::new(account.current_balance)
                    )));
                }
                if !caller.is_admin() {
                    return Err(denied(caller, account_id, "balance override requires admin"));
                }
            }

            // CAS on version: a balance write in between restarts the check.
            let result = accounts::Entity::update_many()
                .col_expr(accounts::Column::Active, Expr::value(false))
                .col_expr(accounts::Column::IsDefault, Expr::value(false))
                .filter(accounts::Column::Id.eq(account.id.to_string()))
                .filter(accounts::Column::Version.eq(account.version))
                .exec(&db_tx)
                .await?;
            if result.rows_affected != 1 {
                return Err(EngineError::ConcurrentModification(format!(
                    "account {} changed while deactivating",
                    account.id
                )));
            }
            account.active = false;
            account.is_default = false;
            Ok(account)
        })?;

        tracing::info!(
            shop_id = %account.shop_id,
            account_id = %account.id,
            override_balance,
            "account deactivated"
        );
        Ok(account)
    }
}
