//! Kitchen board endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{OrderOutcome, OrderRepository};
use serde::{Deserialize, Serialize};

use super::orders::OrderResponse;
use super::parse_order_id;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionResponse {
    /// Name of the event the transition produced.
    pub event: String,
    /// False when the live update could not be published.
    pub notified: bool,
    pub order: OrderResponse,
}

impl From<OrderOutcome> for TransitionResponse {
    fn from(outcome: OrderOutcome) -> Self {
        Self {
            event: outcome.event.event_type().to_string(),
            notified: outcome.notified,
            order: OrderResponse::from(&outcome.order),
        }
    }
}

/// GET /kitchen/orders: orders on the board, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.kitchen_orders(&state.restaurant_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// POST /kitchen/order/:id/mark-paid: staff confirmed the payment.
#[tracing::instrument(skip(state))]
pub async fn mark_paid<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state.orders.mark_paid(parse_order_id(&id)?).await?;
    Ok(Json(outcome.into()))
}

/// POST /kitchen/order/:id/mark-preparing: kitchen started cooking.
#[tracing::instrument(skip(state))]
pub async fn mark_preparing<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state.orders.mark_preparing(parse_order_id(&id)?).await?;
    Ok(Json(outcome.into()))
}

/// POST /kitchen/order/:id/mark-ready: order is ready for pickup.
#[tracing::instrument(skip(state))]
pub async fn mark_ready<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state.orders.mark_ready(parse_order_id(&id)?).await?;
    Ok(Json(outcome.into()))
}

/// POST /kitchen/order/:id/mark-completed: order was handed over.
#[tracing::instrument(skip(state))]
pub async fn mark_completed<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state.orders.mark_completed(parse_order_id(&id)?).await?;
    Ok(Json(outcome.into()))
}
