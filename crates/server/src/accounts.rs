//! Accounts API endpoints: the Account Store and Balance Adjustment.

use api_types::{
    account::{
        AccountCategory as ApiCategory, AccountDeactivate, AccountList, AccountNew, AccountView,
        AccountsResponse,
    },
    balance::{BalanceAdjust, BalanceHistoryEntryView, BalanceHistoryResponse, HistoryQuery},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Account, AccountCategory, AdjustBalanceCmd, BalanceHistoryEntry, Caller, NewAccountCmd};
use uuid::Uuid;

use crate::{ServerError, parse_amount, server::ServerState};

const DEFAULT_HISTORY_LIMIT: u64 = 50;

pub(crate) fn map_category(category: AccountCategory) -> ApiCategory {
    match category {
        AccountCategory::Cash => ApiCategory::Cash,
        AccountCategory::Bank => ApiCategory::Bank,
        AccountCategory::Customer => ApiCategory::Customer,
        AccountCategory::ExpenseCategory => ApiCategory::ExpenseCategory,
    }
}

pub(crate) fn category_from_api(category: ApiCategory) -> AccountCategory {
    match category {
        ApiCategory::Cash => AccountCategory::Cash,
        ApiCategory::Bank => AccountCategory::Bank,
        ApiCategory::Customer => AccountCategory::Customer,
        ApiCategory::ExpenseCategory => AccountCategory::ExpenseCategory,
    }
}

fn account_view(account: Account) -> AccountView {
    AccountView {
        id: account.id,
        shop_id: account.shop_id,
        category: map_category(account.category),
        name: account.name,
        name_local: account.name_local,
        opening_balance_minor: account.opening_balance,
        current_balance_minor: account.current_balance,
        is_default: account.is_default,
        active: account.active,
        version: account.version,
        created_at: account.created_at,
    }
}

fn history_view(entry: BalanceHistoryEntry) -> BalanceHistoryEntryView {
    BalanceHistoryEntryView {
        id: entry.id,
        account_id: entry.account_id,
        previous_balance_minor: entry.previous_balance,
        new_balance_minor: entry.new_balance,
        change_amount_minor: entry.change_amount,
        change_reason: entry.change_reason,
        created_at: entry.created_at,
        created_by: entry.created_by,
    }
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let mut cmd = NewAccountCmd::new(shop_id, category_from_api(payload.category), payload.name);
    if let Some(name_local) = payload.name_local {
        cmd = cmd.name_local(name_local);
    }
    if let Some(opening_balance) = payload.opening_balance.as_deref() {
        cmd = cmd.opening_balance(parse_amount(opening_balance)?);
    }
    if payload.is_default {
        cmd = cmd.default_account();
    }

    let account = state.engine.create_account(&caller, cmd).await?;
    Ok((StatusCode::CREATED, Json(account_view(account))))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<AccountList>,
) -> Result<Json<AccountsResponse>, ServerError> {
    let accounts = state
        .engine
        .list_accounts(&caller, shop_id, query.category.map(category_from_api))
        .await?;
    Ok(Json(AccountsResponse {
        accounts: accounts.into_iter().map(account_view).collect(),
    }))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(&caller, account_id).await?;
    Ok(Json(account_view(account)))
}

pub async fn set_default(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.set_default(&caller, account_id).await?;
    Ok(Json(account_view(account)))
}

/// The body is optional; without one the balance must already be zero.
pub async fn deactivate(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
    payload: Option<Json<AccountDeactivate>>,
) -> Result<Json<AccountView>, ServerError> {
    let Json(payload) = payload.unwrap_or_default();
    let account = state
        .engine
        .deactivate_account(&caller, account_id, payload.override_balance)
        .await?;
    Ok(Json(account_view(account)))
}

pub async fn adjust(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<BalanceAdjust>,
) -> Result<(StatusCode, Json<BalanceHistoryEntryView>), ServerError> {
    let new_balance = parse_amount(&payload.new_balance)?;
    let mut cmd = AdjustBalanceCmd::new(account_id, new_balance, payload.change_reason);
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let entry = state.engine.adjust_balance(&caller, cmd).await?;
    Ok((StatusCode::CREATED, Json(history_view(entry))))
}

pub async fn history(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<BalanceHistoryResponse>, ServerError> {
    let page = state
        .engine
        .balance_history_page(
            &caller,
            account_id,
            query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
            query.cursor.as_deref(),
        )
        .await?;
    Ok(Json(BalanceHistoryResponse {
        entries: page.entries.into_iter().map(history_view).collect(),
        next_cursor: page.next_cursor,
    }))
}
