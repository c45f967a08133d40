//! The tenant. Every other row in the ledger carries a `shop_id`.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: Uuid,
    pub name: String,
    pub name_local: Option<String>,
    /// Short unique code, e.g. `DT-01`.
    pub code: String,
    /// Admin user owning the shop.
    pub owner_id: String,
    /// IANA timezone that defines the shop's calendar day.
    pub timezone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shops")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub name_local: Option<String>,
    pub code: String,
    pub owner_id: String,
    pub timezone: String,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounts::Entity")]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Shop> for ActiveModel {
    fn from(shop: &Shop) -> Self {
        Self {
            id: ActiveValue::Set(shop.id.to_string()),
            name: ActiveValue::Set(shop.name.clone()),
            name_local: ActiveValue::Set(shop.name_local.clone()),
            code: ActiveValue::Set(shop.code.clone()),
            owner_id: ActiveValue::Set(shop.owner_id.clone()),
            timezone: ActiveValue::Set(shop.timezone.clone()),
            active: ActiveValue::Set(shop.active),
            created_at: ActiveValue::Set(shop.created_at),
        }
    }
}

impl TryFrom<Model> for Shop {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "shop")?,
            name: model.name,
            name_local: model.name_local,
            code: model.code,
            owner_id: model.owner_id,
            timezone: model.timezone,
            active: model.active,
            created_at: model.created_at,
        })
    }
}
