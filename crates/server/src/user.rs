//! Users as the auth layer stores them, and their mapping to an engine
//! [`Caller`].

use engine::{Caller, EngineError, Role};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub role: String,
    /// Assigned shop, staff only.
    pub shop_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Caller {
    type Error = EngineError;

    fn try_from(user: Model) -> Result<Self, Self::Error> {
        let role = Role::try_from(user.role.as_str())?;
        let assigned_shop_id = match (role, user.shop_id) {
            (Role::Staff, Some(shop_id)) => Some(
                Uuid::parse_str(&shop_id)
                    .map_err(|_| EngineError::InvalidId(format!("invalid shop id: {shop_id}")))?,
            ),
            _ => None,
        };
        Ok(Caller {
            user_id: user.username,
            role,
            assigned_shop_id,
        })
    }
}
