use std::future::Future;

use sea_orm::{DatabaseConnection, DbErr, SqlErr};

use crate::{EngineError, ResultEngine};

mod access;
mod accounts;
mod adjustments;
mod balances;
mod dashboard;
mod shops;
mod transactions;

pub use adjustments::BalanceHistoryPage;
pub use balances::BalanceAudit;
pub use dashboard::{DailyStats, Dashboard};

/// Attempts made for an operation that keeps losing to concurrent writers.
pub const MAX_CONFLICT_ATTEMPTS: u32 = 3;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// An early `return` or `?` inside the block drops the transaction without
/// committing, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Re-run `attempt` while it fails with `ConcurrentModification`, up to
/// [`MAX_CONFLICT_ATTEMPTS`] times. Every other outcome is returned as is.
async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut attempt: F) -> ResultEngine<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ResultEngine<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(EngineError::ConcurrentModification(reason)) if tries < MAX_CONFLICT_ATTEMPTS => {
                tracing::debug!(operation, attempt = tries, %reason, "conflict, retrying");
                tries += 1;
            }
            Err(EngineError::ConcurrentModification(reason)) => {
                tracing::warn!(operation, attempts = tries, %reason, "giving up after conflicts");
                return Err(EngineError::ConcurrentModification(reason));
            }
            other => return other,
        }
    }
}

/// A unique index rejected an insert: somebody else won the race. The retry
/// will find their row.
fn insert_conflict(err: DbErr, what: &str) -> EngineError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return EngineError::ConcurrentModification(format!("{what} inserted concurrently"));
    }
    err.into()
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_conflicts_up_to_the_limit() {
        let calls = AtomicU32::new(0);
        let result: ResultEngine<()> = retry_on_conflict("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::ConcurrentModification("busy".to_string())) }
        })
        .await;

        assert_eq!(
            result,
            Err(EngineError::ConcurrentModification("busy".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), MAX_CONFLICT_ATTEMPTS);
    }

    #[tokio::test]
    async fn succeeds_after_a_lost_race() {
        let calls = AtomicU32::new(0);
        let result = retry_on_conflict("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(EngineError::ConcurrentModification("busy".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: ResultEngine<()> = retry_on_conflict("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::SameAccount) }
        })
        .await;

        assert_eq!(result, Err(EngineError::SameAccount));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
