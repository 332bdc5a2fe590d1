//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, PaymentError, RepositoryError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::InvalidTransition { .. }
            | OrderError::PaymentRequired { .. }
            | OrderError::AlreadyPaid
            | OrderError::PaymentClosed { .. } => StatusCode::CONFLICT,
            OrderError::EmptyOrder
            | OrderError::NonPositiveTotal { .. }
            | OrderError::TotalOverflow
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. } => StatusCode::BAD_REQUEST,
        },
        DomainError::OrderNotFound(_) | DomainError::Repository(RepositoryError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        DomainError::Repository(RepositoryError::ConcurrencyConflict { .. }) => {
            StatusCode::CONFLICT
        }
        DomainError::Payment(PaymentError::Unsupported(_)) => StatusCode::BAD_REQUEST,
        DomainError::Payment(PaymentError::Declined { .. }) => StatusCode::PAYMENT_REQUIRED,
        DomainError::Repository(_) | DomainError::Payment(_) => {
            tracing::error!(error = %err, "domain operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
