//! Shops API endpoints

use api_types::shop::{ShopNew, ShopView, ShopsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Caller, NewShopCmd, Shop};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn shop_view(shop: Shop) -> ShopView {
    ShopView {
        id: shop.id,
        name: shop.name,
        name_local: shop.name_local,
        code: shop.code,
        owner_id: shop.owner_id,
        timezone: shop.timezone,
        active: shop.active,
        created_at: shop.created_at,
    }
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<ShopNew>,
) -> Result<(StatusCode, Json<ShopView>), ServerError> {
    let mut cmd = NewShopCmd::new(payload.name, payload.code);
    if let Some(name_local) = payload.name_local {
        cmd = cmd.name_local(name_local);
    }
    if let Some(timezone) = payload.timezone {
        cmd = cmd.timezone(timezone);
    }

    let shop = state.engine.create_shop(&caller, cmd).await?;
    Ok((StatusCode::CREATED, Json(shop_view(shop))))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<ShopsResponse>, ServerError> {
    let shops = state.engine.list_shops(&caller).await?;
    Ok(Json(ShopsResponse {
        shops: shops.into_iter().map(shop_view).collect(),
    }))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<ShopView>, ServerError> {
    let shop = state.engine.shop(&caller, shop_id).await?;
    Ok(Json(shop_view(shop)))
}

pub async fn deactivate(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<ShopView>, ServerError> {
    let shop = state.engine.deactivate_shop(&caller, shop_id).await?;
    Ok(Json(shop_view(shop)))
}
