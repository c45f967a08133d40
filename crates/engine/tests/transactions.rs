mod common;

use std::sync::Arc;

use sea_orm::ConnectionTrait;
use tokio::task::JoinSet;

use common::{CASH_OPENING, assert_no_drift, balance, fixture, fixture_at};
use engine::{
    AccountCategory, AdjustBalanceCmd, EngineError, RecordTransactionCmd, TransactionKind,
};

#[tokio::test]
async fn sale_moves_value_from_customer_to_cash() {
    let fx = fixture().await;

    let tx = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer),
        )
        .await
        .unwrap();

    assert_eq!(tx.debit_account_id, fx.cash);
    assert_eq!(tx.credit_account_id, fx.customer);
    assert_eq!(tx.created_by, "alice");
    assert_eq!(balance(&fx, fx.cash).await, 115_000);
    assert_eq!(balance(&fx, fx.customer).await, -15_000);
    assert_no_drift(&fx, &fx.owner, fx.shop_id).await;
}

#[tokio::test]
async fn default_accounts_are_resolved_by_category() {
    let fx = fixture().await;

    let tx = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(
                fx.shop_id,
                TransactionKind::Expense,
                2_500,
                AccountCategory::ExpenseCategory,
                AccountCategory::Cash,
            ),
        )
        .await
        .unwrap();

    assert_eq!(tx.debit_account_id, fx.expense);
    assert_eq!(tx.credit_account_id, fx.cash);
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING - 2_500);
}

#[tokio::test]
async fn same_account_is_rejected_without_side_effects() {
    let fx = fixture().await;

    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Transfer, 1_000, fx.cash, fx.cash),
        )
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::SameAccount);
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING);
    let rows = fx
        .engine
        .daily_transactions(&fx.owner, fx.shop_id, None)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn default_that_resolves_to_the_other_side_is_still_same_account() {
    let fx = fixture().await;

    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(
                fx.shop_id,
                TransactionKind::Transfer,
                1_000,
                fx.cash,
                AccountCategory::Cash,
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::SameAccount);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let fx = fixture().await;

    for amount in [0, -500] {
        let err = fx
            .engine
            .record_transaction(
                &fx.owner,
                RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, amount, fx.cash, fx.customer),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");
    }
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING);
}

#[tokio::test]
async fn amount_is_validated_before_accounts() {
    let fx = fixture().await;

    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 0, fx.cash, fx.cash),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_AMOUNT");
}

#[tokio::test]
async fn partial_payment_is_informational() {
    let fx = fixture().await;

    let tx = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer)
                .amount_paid(10_000)
                .description("  half now  "),
        )
        .await
        .unwrap();
    assert_eq!(tx.amount_paid_minor, Some(10_000));
    assert_eq!(tx.outstanding_minor(), Some(5_000));
    assert_eq!(tx.description.as_deref(), Some("half now"));
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING + 15_000);

    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer)
                .amount_paid(-1),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_AMOUNT");
}

#[tokio::test]
async fn inactive_accounts_are_rejected() {
    let fx = fixture().await;
    fx.engine
        .deactivate_account(&fx.owner, fx.bank, false)
        .await
        .unwrap();

    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Transfer, 1_000, fx.bank, fx.cash),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ACCOUNT");

    // The deactivated bank account was the default, so there is none left.
    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(
                fx.shop_id,
                TransactionKind::Transfer,
                1_000,
                AccountCategory::Bank,
                fx.cash,
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ACCOUNT");
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING);
}

#[tokio::test]
async fn idempotency_key_replays_the_first_write() {
    let fx = fixture().await;
    let cmd = RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer)
        .idempotency_key("till-1/0001");

    let first = fx
        .engine
        .record_transaction(&fx.owner, cmd.clone())
        .await
        .unwrap();
    let second = fx.engine.record_transaction(&fx.owner, cmd).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING + 15_000);
    let rows = fx
        .engine
        .daily_transactions(&fx.owner, fx.shop_id, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn idempotency_key_reused_for_another_write_is_rejected() {
    let fx = fixture().await;
    fx.engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer)
                .idempotency_key("till-1/0002"),
        )
        .await
        .unwrap();

    for cmd in [
        RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 16_000, fx.cash, fx.customer),
        RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.bank, fx.customer),
        RecordTransactionCmd::new(fx.shop_id, TransactionKind::Payment, 15_000, fx.cash, fx.customer),
    ] {
        let err = fx
            .engine
            .record_transaction(&fx.owner, cmd.idempotency_key("till-1/0002"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSACTION");
    }
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING + 15_000);
    assert_eq!(balance(&fx, fx.bank).await, 0);
}

#[tokio::test]
async fn reversal_restores_balances_and_keeps_the_original() {
    let fx = fixture().await;
    let sale = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer),
        )
        .await
        .unwrap();

    let reversal = fx
        .engine
        .reverse_transaction(&fx.owner, sale.id)
        .await
        .unwrap();

    assert_eq!(reversal.reversal_of, Some(sale.id));
    assert_eq!(reversal.kind, TransactionKind::Sale);
    assert_eq!(reversal.amount_minor, sale.amount_minor);
    assert_eq!(reversal.debit_account_id, sale.credit_account_id);
    assert_eq!(reversal.credit_account_id, sale.debit_account_id);
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING);
    assert_eq!(balance(&fx, fx.customer).await, 0);

    let rows = fx
        .engine
        .daily_transactions(&fx.owner, fx.shop_id, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let original = rows.iter().find(|t| t.id == sale.id).unwrap();
    assert!(original.reversed_at.is_some());
    assert_eq!(original.reversed_by.as_deref(), Some("alice"));
    assert_no_drift(&fx, &fx.owner, fx.shop_id).await;
}

#[tokio::test]
async fn reversal_happens_once() {
    let fx = fixture().await;
    let sale = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer),
        )
        .await
        .unwrap();
    let reversal = fx
        .engine
        .reverse_transaction(&fx.owner, sale.id)
        .await
        .unwrap();

    let err = fx
        .engine
        .reverse_transaction(&fx.owner, sale.id)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::AlreadyReversed);

    let err = fx
        .engine
        .reverse_transaction(&fx.owner, reversal.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSACTION");
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING);
}

#[tokio::test]
async fn reversal_reaches_deactivated_accounts() {
    let fx = fixture().await;
    let sale = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer),
        )
        .await
        .unwrap();
    fx.engine
        .deactivate_account(&fx.owner, fx.customer, true)
        .await
        .unwrap();

    fx.engine
        .reverse_transaction(&fx.owner, sale.id)
        .await
        .unwrap();

    assert_eq!(balance(&fx, fx.customer).await, 0);
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING);
}

#[tokio::test]
async fn reversal_that_would_overflow_a_balance_is_rejected() {
    let fx = fixture().await;
    let sale = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 10_000, fx.cash, fx.customer),
        )
        .await
        .unwrap();
    for target in [0, i64::MAX] {
        fx.engine
            .adjust_balance(&fx.owner, AdjustBalanceCmd::new(fx.customer, target, "recount"))
            .await
            .unwrap();
    }

    let err = fx
        .engine
        .reverse_transaction(&fx.owner, sale.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_AMOUNT");

    // Nothing was written and the row still decodes.
    assert_eq!(balance(&fx, fx.customer).await, i64::MAX);
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING + 10_000);
    let accounts = fx
        .engine
        .list_accounts(&fx.owner, fx.shop_id, None)
        .await
        .unwrap();
    assert_eq!(accounts.len(), 4);
    let rows = fx
        .engine
        .daily_transactions(&fx.owner, fx.shop_id, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].reversed_at.is_none());
    assert_no_drift(&fx, &fx.owner, fx.shop_id).await;
}

#[tokio::test]
async fn sale_that_would_overflow_a_balance_is_rejected() {
    let fx = fixture().await;
    fx.engine
        .adjust_balance(&fx.owner, AdjustBalanceCmd::new(fx.cash, i64::MAX - 10, "vault"))
        .await
        .unwrap();

    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 100, fx.cash, fx.customer),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_AMOUNT");
    assert_eq!(balance(&fx, fx.cash).await, i64::MAX - 10);
    assert_eq!(balance(&fx, fx.customer).await, 0);
}

#[tokio::test]
async fn storage_fault_between_balance_writes_rolls_back_everything() {
    let fx = fixture().await;
    // Balance rows are written in ascending id order; fail the second one.
    let second = fx.cash.max(fx.customer);
    fx.db
        .execute_unprepared(&format!(
            "CREATE TRIGGER fail_second_write BEFORE UPDATE OF current_balance ON accounts \
             WHEN NEW.id = '{second}' \
             BEGIN SELECT RAISE(ABORT, 'simulated storage fault'); END;"
        ))
        .await
        .unwrap();

    let err = fx
        .engine
        .record_transaction(
            &fx.owner,
            RecordTransactionCmd::new(fx.shop_id, TransactionKind::Sale, 15_000, fx.cash, fx.customer),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INTERNAL");

    fx.db
        .execute_unprepared("DROP TRIGGER fail_second_write")
        .await
        .unwrap();
    assert_eq!(balance(&fx, fx.cash).await, CASH_OPENING);
    assert_eq!(balance(&fx, fx.customer).await, 0);
    let rows = fx
        .engine
        .daily_transactions(&fx.owner, fx.shop_id, None)
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_no_drift(&fx, &fx.owner, fx.shop_id).await;
}

#[tokio::test]
async fn concurrent_writers_lose_no_updates() {
    let fx = fixture().await;
    let engine = Arc::new(fx.engine);
    let mut set = JoinSet::new();

    for i in 0..20 {
        let engine = Arc::clone(&engine);
        let owner = fx.owner.clone();
        let (shop_id, cash, customer) = (fx.shop_id, fx.cash, fx.customer);
        set.spawn(async move {
            engine
                .record_transaction(
                    &owner,
                    RecordTransactionCmd::new(shop_id, TransactionKind::Sale, 100, cash, customer)
                        .idempotency_key(format!("sale-{i}")),
                )
                .await
                .map(|_| ())
        });
    }
    {
        let engine = Arc::clone(&engine);
        let owner = fx.owner.clone();
        let bank = fx.bank;
        set.spawn(async move {
            engine
                .adjust_balance(&owner, AdjustBalanceCmd::new(bank, 50_000, "opening deposit"))
                .await
                .map(|_| ())
        });
    }

    while let Some(joined) = set.join_next().await {
        joined.unwrap().unwrap();
    }

    let cash = engine.account(&fx.owner, fx.cash).await.unwrap();
    let customer = engine.account(&fx.owner, fx.customer).await.unwrap();
    let bank = engine.account(&fx.owner, fx.bank).await.unwrap();
    assert_eq!(cash.current_balance, CASH_OPENING + 2_000);
    assert_eq!(customer.current_balance, -2_000);
    assert_eq!(bank.current_balance, 50_000);
    assert_eq!(cash.version, 20);

    let audits = engine.audit_balances(&fx.owner, fx.shop_id).await.unwrap();
    assert!(audits.iter().all(|a| a.drift == 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_on_a_database_file_lose_no_updates() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("ledger.db").display());
    let fx = fixture_at(&url).await;
    let engine = Arc::new(fx.engine);
    let mut sales = JoinSet::new();
    let mut adjustments = JoinSet::new();

    for i in 0..20 {
        let engine = Arc::clone(&engine);
        let owner = fx.owner.clone();
        let (shop_id, cash, customer) = (fx.shop_id, fx.cash, fx.customer);
        sales.spawn(async move {
            engine
                .record_transaction(
                    &owner,
                    RecordTransactionCmd::new(shop_id, TransactionKind::Sale, 100, cash, customer)
                        .idempotency_key(format!("sale-{i}")),
                )
                .await
                .map(|_| ())
        });
    }
    for i in 0..10 {
        let engine = Arc::clone(&engine);
        let owner = fx.owner.clone();
        let cash = fx.cash;
        adjustments.spawn(async move {
            engine
                .adjust_balance(
                    &owner,
                    AdjustBalanceCmd::new(cash, 200_000 + i, "recount")
                        .idempotency_key(format!("count-{i}")),
                )
                .await
                .map(|_| ())
        });
    }

    // Contention may exhaust the retries; it must never lose a write.
    let mut recorded = 0;
    while let Some(joined) = sales.join_next().await {
        match joined.unwrap() {
            Ok(()) => recorded += 1,
            Err(err) => assert_eq!(err.code(), "CONCURRENT_MODIFICATION"),
        }
    }
    let mut adjusted = 0;
    while let Some(joined) = adjustments.join_next().await {
        match joined.unwrap() {
            Ok(()) => adjusted += 1,
            Err(err) => assert_eq!(err.code(), "CONCURRENT_MODIFICATION"),
        }
    }
    assert!(recorded > 0);
    assert!(adjusted > 0);

    let rows = engine
        .daily_transactions(&fx.owner, fx.shop_id, None)
        .await
        .unwrap();
    assert_eq!(rows.len() as i64, recorded);
    let history = engine
        .balance_history(&fx.owner, fx.cash, 100)
        .await
        .unwrap();
    assert_eq!(history.len() as i64, adjusted);

    let cash = engine.account(&fx.owner, fx.cash).await.unwrap();
    let customer = engine.account(&fx.owner, fx.customer).await.unwrap();
    assert_eq!(customer.current_balance, -100 * recorded);
    assert_eq!(cash.version, recorded + adjusted);

    let audits = engine.audit_balances(&fx.owner, fx.shop_id).await.unwrap();
    assert!(audits.iter().all(|a| a.drift == 0));
}
