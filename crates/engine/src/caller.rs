//! Who is calling, and what they want to touch.
//!
//! The engine never authenticates. The transport resolves the user and hands
//! a [`Caller`] to every operation; the Tenancy Guard (`ops::access`) decides
//! what that caller may see.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owns shops; authorized on every shop whose `owner_id` matches.
    Admin,
    /// Works in exactly one assigned shop.
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            other => Err(EngineError::InvalidId(format!("invalid role: {other}"))),
        }
    }
}

/// Authenticated caller context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
    /// Staff only. Ignored for admins.
    pub assigned_shop_id: Option<Uuid>,
}

impl Caller {
    #[must_use]
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
            assigned_shop_id: None,
        }
    }

    #[must_use]
    pub fn staff(user_id: impl Into<String>, shop_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Staff,
            assigned_shop_id: Some(shop_id),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.user_id, self.role.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// A row referenced by an operation that must live in the authorized shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Account(Uuid),
    Transaction(Uuid),
}

/// Proof that a caller passed the guard for one shop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorized {
    pub shop_id: Uuid,
    pub access: Access,
    /// IANA name, carried along so aggregation does not read the shop twice.
    pub timezone: String,
}
