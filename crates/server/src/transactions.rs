//! Transactions API endpoints

use api_types::{
    account::AccountSelector,
    transaction::{
        DayQuery, TransactionKind as ApiKind, TransactionNew, TransactionView,
        TransactionsResponse,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{AccountRef, Caller, RecordTransactionCmd, Transaction, TransactionKind};
use uuid::Uuid;

use crate::{ServerError, accounts::category_from_api, parse_amount, server::ServerState};

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Sale => ApiKind::Sale,
        TransactionKind::Purchase => ApiKind::Purchase,
        TransactionKind::Expense => ApiKind::Expense,
        TransactionKind::Payment => ApiKind::Payment,
        TransactionKind::Transfer => ApiKind::Transfer,
    }
}

fn kind_from_api(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Sale => TransactionKind::Sale,
        ApiKind::Purchase => TransactionKind::Purchase,
        ApiKind::Expense => TransactionKind::Expense,
        ApiKind::Payment => TransactionKind::Payment,
        ApiKind::Transfer => TransactionKind::Transfer,
    }
}

fn account_ref(selector: AccountSelector) -> AccountRef {
    match selector {
        AccountSelector::Id(id) => AccountRef::Id(id),
        AccountSelector::Default(category) => AccountRef::Default(category_from_api(category)),
    }
}

fn transaction_view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        shop_id: tx.shop_id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount_minor,
        amount_paid_minor: tx.amount_paid_minor,
        debit_account_id: tx.debit_account_id,
        credit_account_id: tx.credit_account_id,
        description: tx.description,
        created_at: tx.created_at,
        created_by: tx.created_by,
        reversed_at: tx.reversed_at,
        reversed_by: tx.reversed_by,
        reversal_of: tx.reversal_of,
    }
}

pub async fn record(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let mut cmd = RecordTransactionCmd::new(
        shop_id,
        kind_from_api(payload.kind),
        parse_amount(&payload.amount)?,
        account_ref(payload.debit),
        account_ref(payload.credit),
    );
    if let Some(amount_paid) = payload.amount_paid.as_deref() {
        cmd = cmd.amount_paid(parse_amount(amount_paid)?);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let tx = state.engine.record_transaction(&caller, cmd).await?;
    Ok((StatusCode::CREATED, Json(transaction_view(tx))))
}

pub async fn reverse(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let reversal = state
        .engine
        .reverse_transaction(&caller, transaction_id)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction_view(reversal))))
}

pub async fn daily(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<TransactionsResponse>, ServerError> {
    let transactions = state
        .engine
        .daily_transactions(&caller, shop_id, query.date)
        .await?;
    Ok(Json(TransactionsResponse {
        transactions: transactions.into_iter().map(transaction_view).collect(),
    }))
}
