//! HTTP route handlers.

pub mod kitchen;
pub mod orders;
pub mod stream;
pub mod system;

use domain::OrderId;

use crate::error::ApiError;

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(OrderId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
