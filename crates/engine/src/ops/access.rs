//! Tenancy Guard.
//!
//! Resolves which shop a call is scoped to and rejects everything outside it.
//! Unknown ids and ids of another shop produce the same [`EngineError::Denied`],
//! the actual reason only goes to the log.

use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Access, Authorized, Caller, EngineError, ResultEngine, Resource, Role, accounts, shops,
    transactions, util::parse_uuid,
};

use super::{Engine, with_tx};

pub(super) fn denied(caller: &Caller, target: impl std::fmt::Display, reason: &str) -> EngineError {
    tracing::warn!(caller = %caller, %target, reason, "access denied");
    EngineError::Denied
}

/// Generates `_in_shop` and `require_in_shop` lookups for a shop-scoped
/// entity.
macro_rules! impl_target_in_shop {
    ($find_fn:ident, $require_fn:ident, $entity:path, $model:path, $shop_col:expr, $label:literal) => {
        async fn $find_fn(
            &self,
            db: &DatabaseTransaction,
            shop_id: Uuid,
            target_id: Uuid,
        ) -> ResultEngine<Option<$model>> {
            <$entity>::find_by_id(target_id.to_string())
                .filter($shop_col.eq(shop_id.to_string()))
                .one(db)
                .await
                .map_err(Into::into)
        }

        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            caller: &Caller,
            shop_id: Uuid,
            target_id: Uuid,
        ) -> ResultEngine<$model> {
            self.$find_fn(db, shop_id, target_id)
                .await?
                .ok_or_else(|| denied(caller, target_id, concat!($label, " not in shop")))
        }
    };
}

impl Engine {
    impl_target_in_shop!(
        account_in_shop,
        require_account_in_shop,
        accounts::Entity,
        accounts::Model,
        accounts::Column::ShopId,
        "account"
    );

    impl_target_in_shop!(
        transaction_in_shop,
        require_transaction_in_shop,
        transactions::Entity,
        transactions::Model,
        transactions::Column::ShopId,
        "transaction"
    );

    /// Decide whether `caller` may act on `shop_id` and every resource in
    /// `resources`. Read-only.
    pub async fn authorize(
        &self,
        caller: &Caller,
        shop_id: Uuid,
        access: Access,
        resources: &[Resource],
    ) -> ResultEngine<Authorized> {
        with_tx!(self, |db_tx| {
            self.authorize_in(&db_tx, caller, shop_id, access, resources)
                .await
        })
    }

    pub(super) async fn authorize_shop(
        &self,
        db: &DatabaseTransaction,
        caller: &Caller,
        shop_id: Uuid,
        access: Access,
    ) -> ResultEngine<shops::Model> {
        let Some(shop) = shops::Entity::find_by_id(shop_id.to_string())
            .one(db)
            .await?
        else {
            return Err(denied(caller, shop_id, "unknown shop"));
        };

        let in_scope = match caller.role {
            Role::Admin => shop.owner_id == caller.user_id,
            Role::Staff => caller.assigned_shop_id == Some(shop_id),
        };
        if !in_scope {
            return Err(denied(caller, shop_id, "shop out of scope"));
        }
        if access == Access::Write && !shop.active {
            return Err(denied(caller, shop_id, "shop is inactive"));
        }
        Ok(shop)
    }

    pub(super) async fn authorize_in(
        &self,
        db: &DatabaseTransaction,
        caller: &Caller,
        shop_id: Uuid,
        access: Access,
        resources: &[Resource],
    ) -> ResultEngine<Authorized> {
        let shop = self.authorize_shop(db, caller, shop_id, access).await?;
        for resource in resources {
            match *resource {
                Resource::Account(id) => {
                    self.require_account_in_shop(db, caller, shop_id, id)
                        .await?;
                }
                Resource::Transaction(id) => {
                    self.require_transaction_in_shop(db, caller, shop_id, id)
                        .await?;
                }
            }
        }
        Ok(Authorized {
            shop_id,
            access,
            timezone: shop.timezone,
        })
    }

    /// Guard for operations addressed by an account id only: the shop comes
    /// from the row.
    pub(super) async fn authorize_account(
        &self,
        db: &DatabaseTransaction,
        caller: &Caller,
        account_id: Uuid,
        access: Access,
    ) -> ResultEngine<(Authorized, accounts::Model)> {
        let Some(model) = accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
        else {
            return Err(denied(caller, account_id, "unknown account"));
        };
        let shop_id = parse_uuid(&model.shop_id, "shop")?;
        let auth = self.authorize_in(db, caller, shop_id, access, &[]).await?;
        Ok((auth, model))
    }

    /// Guard for operations addressed by a transaction id only.
    pub(super) async fn authorize_transaction(
        &self,
        db: &DatabaseTransaction,
        caller: &Caller,
        transaction_id: Uuid,
        access: Access,
    ) -> ResultEngine<(Authorized, transactions::Model)> {
        let Some(model) = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db)
            .await?
        else {
            return Err(denied(caller, transaction_id, "unknown transaction"));
        };
        let shop_id = parse_uuid(&model.shop_id, "shop")?;
        let auth = self.authorize_in(db, caller, shop_id, access, &[]).await?;
        Ok((auth, model))
    }
}
