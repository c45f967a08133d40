//! Multi-tenant shop ledger.
//!
//! Every operation goes through [`Engine`] and takes a [`Caller`]. The
//! Tenancy Guard runs first and scopes the call to one shop; writes then run
//! inside a single database transaction so the ledger row and both balance
//! changes commit or roll back together.

pub use accounts::{Account, AccountCategory};
pub use balance_history::BalanceHistoryEntry;
pub use calendar::{local_date, local_day_bounds, parse_timezone};
pub use caller::{Access, Authorized, Caller, Resource, Role};
pub use commands::{AccountRef, AdjustBalanceCmd, NewAccountCmd, NewShopCmd, RecordTransactionCmd};
pub use error::EngineError;
pub use money::Money;
pub use ops::{
    BalanceAudit, BalanceHistoryPage, DailyStats, Dashboard, Engine, EngineBuilder,
    MAX_CONFLICT_ATTEMPTS,
};
pub use shops::Shop;
pub use transactions::{Transaction, TransactionKind};

mod accounts;
mod balance_history;
mod calendar;
mod caller;
mod commands;
mod error;
mod money;
mod ops;
mod shops;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
