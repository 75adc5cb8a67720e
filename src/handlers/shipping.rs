use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use super::common::{JsonBody, QueryParams};
use crate::models::{Delivery, PartReadinessView, ShippingOrder, UpdateShippingStatusRequest};
use crate::services::shipping::ShippingFilter;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryQuery {
    pub shipping_order_id: Option<String>,
}

pub async fn list_shipping_orders(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<ShippingFilter>,
) -> ApiResult<Vec<ShippingOrder>> {
    let orders = state.services.shipping.shipping_orders(&filter).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn update_shipping_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateShippingStatusRequest>,
) -> ApiResult<ShippingOrder> {
    let order = state
        .services
        .shipping
        .update_status(&id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_deliveries(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DeliveryQuery>,
) -> ApiResult<Vec<Delivery>> {
    let deliveries = state
        .services
        .shipping
        .deliveries(query.shipping_order_id.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(deliveries)))
}

pub async fn list_part_readiness(
    State(state): State<AppState>,
) -> ApiResult<Vec<PartReadinessView>> {
    let rows = state.services.shipping.part_readiness().await?;
    Ok(Json(ApiResponse::success(rows)))
}
