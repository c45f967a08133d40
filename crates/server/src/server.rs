use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::{net::SocketAddr, sync::Arc};

use crate::{accounts, dashboard, shops, transactions, user};
use engine::{Caller, Engine};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Resolve the Basic-auth user to a [`Caller`] and attach it to the request.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("failed to load user: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let caller = Caller::try_from(user).map_err(|err| {
        tracing::warn!("unusable user row: {err}");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/shops", get(shops::list).post(shops::create))
        .route("/shops/{shop_id}", get(shops::get))
        .route("/shops/{shop_id}/deactivate", post(shops::deactivate))
        .route(
            "/shops/{shop_id}/accounts",
            get(accounts::list).post(accounts::create),
        )
        .route(
            "/shops/{shop_id}/transactions",
            get(transactions::daily).post(transactions::record),
        )
        .route("/shops/{shop_id}/dashboard", get(dashboard::get))
        .route("/shops/{shop_id}/audit", get(dashboard::audit))
        .route("/transactions/{id}/reverse", post(transactions::reverse))
        .route("/accounts/{id}", get(accounts::get))
        .route("/accounts/{id}/default", post(accounts::set_default))
        .route("/accounts/{id}/deactivate", post(accounts::deactivate))
        .route("/accounts/{id}/adjust", post(accounts::adjust))
        .route("/accounts/{id}/history", get(accounts::history))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
