//! The module contains the errors the engine can return.
//!
//! Every variant maps to a stable, locale-independent reason code (see
//! [`EngineError::code`]) so transports can render their own messages.
//!
//! The kinds are:
//!
//! - validation: [`InvalidAmount`], [`InvalidAccount`], [`SameAccount`],
//!   [`ReasonRequired`] and friends. Terminal, never retried.
//! - authorization: [`Denied`]. Carries no detail, so a caller
//!   cannot tell a foreign resource from a missing one.
//! - consistency: [`ConcurrentModification`]. Retried internally a bounded
//!   number of times before it surfaces.
//! - integrity: [`NonZeroBalance`], [`AlreadyReversed`].
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidAccount`]: EngineError::InvalidAccount
//!  [`SameAccount`]: EngineError::SameAccount
//!  [`ReasonRequired`]: EngineError::ReasonRequired
//!  [`Denied`]: EngineError::Denied
//!  [`ConcurrentModification`]: EngineError::ConcurrentModification
//!  [`NonZeroBalance`]: EngineError::NonZeroBalance
//!  [`AlreadyReversed`]: EngineError::AlreadyReversed
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid account: {0}")]
    InvalidAccount(String),
    #[error("Debit and credit account must differ")]
    SameAccount,
    #[error("A change reason is required")]
    ReasonRequired,
    #[error("Not found")]
    Denied,
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("Account balance is not zero: {0}")]
    NonZeroBalance(String),
    #[error("Transaction already reversed")]
    AlreadyReversed,
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Database(DbErr),
}

impl EngineError {
    /// Machine-readable reason code. Stable across releases.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidAccount(_) => "INVALID_ACCOUNT",
            Self::SameAccount => "SAME_ACCOUNT",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::Denied => "DENIED",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::NonZeroBalance(_) => "NON_ZERO_BALANCE",
            Self::AlreadyReversed => "ALREADY_REVERSED",
            Self::InvalidTransaction(_) => "INVALID_TRANSACTION",
            Self::ExistingKey(_) => "EXISTING_KEY",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::InvalidTimezone(_) => "INVALID_TIMEZONE",
            Self::InvalidId(_) => "INVALID_ID",
            Self::InvalidCursor(_) => "INVALID_CURSOR",
            Self::Database(_) => "INTERNAL",
        }
    }
}

/// SQLite reports writer contention as `SQLITE_BUSY`/`SQLITE_LOCKED`; those
/// are conflicts, not storage failures.
fn is_contention(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("database is locked") || message.contains("database table is locked")
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        if is_contention(&err) {
            return Self::ConcurrentModification(err.to_string());
        }
        Self::Database(err)
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidAccount(a), Self::InvalidAccount(b)) => a == b,
            (Self::SameAccount, Self::SameAccount) => true,
            (Self::ReasonRequired, Self::ReasonRequired) => true,
            (Self::Denied, Self::Denied) => true,
            (Self::ConcurrentModification(a), Self::ConcurrentModification(b)) => a == b,
            (Self::NonZeroBalance(a), Self::NonZeroBalance(b)) => a == b,
            (Self::AlreadyReversed, Self::AlreadyReversed) => true,
            (Self::InvalidTransaction(a), Self::InvalidTransaction(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidTimezone(a), Self::InvalidTimezone(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_database_is_a_conflict() {
        let err = EngineError::from(DbErr::Custom("database is locked".to_string()));
        assert_eq!(err.code(), "CONCURRENT_MODIFICATION");
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let err = EngineError::from(DbErr::Custom("disk I/O error".to_string()));
        assert_eq!(err.code(), "INTERNAL");
    }

    #[test]
    fn denied_message_does_not_leak_details() {
        assert_eq!(EngineError::Denied.to_string(), "Not found");
    }
}
