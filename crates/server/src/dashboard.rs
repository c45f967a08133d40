//! Aggregation endpoints: dashboard and balance audit.

use api_types::{
    balance::{AuditResponse, BalanceAuditView},
    dashboard::{DailyStatsView, DashboardView},
    transaction::DayQuery,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::{Caller, Dashboard};
use uuid::Uuid;

use crate::{ServerError, accounts::map_category, server::ServerState};

fn dashboard_view(dashboard: Dashboard) -> DashboardView {
    let stats = dashboard.today_stats;
    DashboardView {
        shop_id: dashboard.shop_id,
        date: dashboard.date,
        cash_balance_minor: dashboard.cash_balance,
        bank_balance_minor: dashboard.bank_balance,
        today_stats: DailyStatsView {
            sales_minor: stats.sales,
            purchases_minor: stats.purchases,
            expenses_minor: stats.expenses,
            net_cash_flow_minor: stats.net_cash_flow,
            transaction_count: stats.transaction_count,
        },
        pending_sync_count: dashboard.pending_sync_count,
    }
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DashboardView>, ServerError> {
    let dashboard = state.engine.dashboard(&caller, shop_id, query.date).await?;
    Ok(Json(dashboard_view(dashboard)))
}

pub async fn audit(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<AuditResponse>, ServerError> {
    let audits = state.engine.audit_balances(&caller, shop_id).await?;
    Ok(Json(AuditResponse {
        accounts: audits
            .into_iter()
            .map(|audit| BalanceAuditView {
                account_id: audit.account_id,
                category: map_category(audit.category),
                name: audit.name,
                opening_balance_minor: audit.opening_balance,
                expected_balance_minor: audit.expected_balance,
                stored_balance_minor: audit.stored_balance,
                drift_minor: audit.drift,
            })
            .collect(),
    }))
}
