//! Customer-facing order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    CreateOrder, Money, Order, OrderError, OrderLine, OrderNumber, OrderRepository,
    PaymentMethod,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

/// Orders always belong to the restaurant this instance serves.
#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub restaurant_id: String,
    pub items: Vec<OrderLineResponse>,
    pub total_cents: i64,
    pub payment_method: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderLineResponse {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            order_number: order.order_number().to_string(),
            restaurant_id: order.restaurant_id().to_string(),
            items: order.lines().iter().map(OrderLineResponse::from).collect(),
            total_cents: order.total_amount().cents(),
            payment_method: order.payment_method().to_string(),
            payment_status: order.payment_status().to_string(),
            fulfillment_status: order.fulfillment_status().to_string(),
            created_at: order.created_at(),
            paid_at: order.paid_at(),
            preparing_at: order.preparing_at(),
            ready_at: order.ready_at(),
            completed_at: order.completed_at(),
            version: order.version(),
        }
    }
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            menu_item_id: line.menu_item_id().to_string(),
            name: line.name().to_string(),
            quantity: line.quantity(),
            unit_price_cents: line.unit_price().cents(),
            subtotal_cents: line.subtotal().map(|m| m.cents()).unwrap_or_default(),
        }
    }
}

// -- Handlers --

/// POST /orders: place an order from a cart snapshot.
#[tracing::instrument(skip(state, req))]
pub async fn create<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let lines = req
        .items
        .into_iter()
        .map(|item| {
            OrderLine::new(
                item.menu_item_id,
                item.name,
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect::<Result<Vec<_>, OrderError>>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state
        .orders
        .create_order(CreateOrder::new(
            state.restaurant_id.clone(),
            lines,
            req.payment_method,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&outcome.order))))
}

/// GET /order/:number: look an order up by its customer-facing number.
#[tracing::instrument(skip(state))]
pub async fn get_by_number<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .get_order_by_number(&state.restaurant_id, &OrderNumber::new(number.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {number} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}
