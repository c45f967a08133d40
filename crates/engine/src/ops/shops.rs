use chrono::Utc;
use sea_orm::{QueryFilter, QueryOrder, SqlErr, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Access, Caller, EngineError, NewShopCmd, ResultEngine, Role, Shop, parse_timezone, shops,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, access::denied, with_tx};

impl Engine {
    /// Creates a shop owned by the calling admin.
    pub async fn create_shop(&self, caller: &Caller, cmd: NewShopCmd) -> ResultEngine<Shop> {
        if !caller.is_admin() {
            return Err(denied(caller, &cmd.code, "only admins create shops"));
        }
        let name = normalize_required_name(&cmd.name, "shop")?;
        let code = cmd.code.trim().to_string();
        if code.is_empty() {
            return Err(EngineError::InvalidName(
                "shop code must not be empty".to_string(),
            ));
        }
        let timezone = match cmd.timezone.as_deref() {
            Some(name) => parse_timezone(name)?.name().to_string(),
            None => chrono_tz::Tz::UTC.name().to_string(),
        };

        let shop = Shop {
            id: Uuid::new_v4(),
            name,
            name_local: normalize_optional_text(cmd.name_local.as_deref()),
            code,
            owner_id: caller.user_id.clone(),
            timezone,
            active: true,
            created_at: Utc::now(),
        };

        with_tx!(self, |db_tx| {
            let taken = shops::Entity::find()
                .filter(shops::Column::Code.eq(shop.code.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if taken {
                return Err(EngineError::ExistingKey(shop.code.clone()));
            }
            shops::ActiveModel::from(&shop)
                .insert(&db_tx)
                .await
                .map_err(|err| match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        EngineError::ExistingKey(shop.code.clone())
                    }
                    _ => err.into(),
                })?;
            Ok(())
        })?;

        tracing::info!(shop_id = %shop.id, code = %shop.code, owner = %shop.owner_id, "shop created");
        Ok(shop)
    }

    pub async fn shop(&self, caller: &Caller, shop_id: Uuid) -> ResultEngine<Shop> {
        with_tx!(self, |db_tx| {
            let model = self
                .authorize_shop(&db_tx, caller, shop_id, Access::Read)
                .await?;
            Shop::try_from(model)
        })
    }

    /// Shops the caller may read: owned shops for admins, the assigned shop
    /// for staff.
    pub async fn list_shops(&self, caller: &Caller) -> ResultEngine<Vec<Shop>> {
        with_tx!(self, |db_tx| {
            let query = match caller.role {
                Role::Admin => {
                    shops::Entity::find().filter(shops::Column::OwnerId.eq(caller.user_id.clone()))
                }
                Role::Staff => {
                    let Some(shop_id) = caller.assigned_shop_id else {
                        return Ok(Vec::new());
                    };
                    shops::Entity::find().filter(shops::Column::Id.eq(shop_id.to_string()))
                }
            };
            let models = query
                .order_by_asc(shops::Column::CreatedAt)
                .order_by_asc(shops::Column::Code)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(Shop::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Soft-deactivates a shop. Owner only. Reads keep working, writes are
    /// denied afterwards.
    pub async fn deactivate_shop(&self, caller: &Caller, shop_id: Uuid) -> ResultEngine<Shop> {
        let shop = with_tx!(self, |db_tx| {
            let model = self
                .authorize_shop(&db_tx, caller, shop_id, Access::Read)
                .await?;
            if !caller.is_admin() {
                return Err(denied(caller, shop_id, "only the owner deactivates a shop"));
            }
            let mut shop = Shop::try_from(model)?;
            if shop.active {
                shops::Entity::update_many()
                    .col_expr(shops::Column::Active, Expr::value(false))
                    .filter(shops::Column::Id.eq(shop_id.to_string()))
                    .exec(&db_tx)
                    .await?;
                shop.active = false;
            }
            Ok(shop)
        })?;

        tracing::info!(shop_id = %shop.id, "shop deactivated");
        Ok(shop)
    }
}
