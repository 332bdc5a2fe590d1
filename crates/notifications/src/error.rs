use domain::DomainError;
use thiserror::Error;

/// Errors raised while rendering an order for a live view.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(String),
}

/// Errors raised while handling an order event.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Loading the order failed.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

impl From<domain::RepositoryError> for HandlerError {
    fn from(e: domain::RepositoryError) -> Self {
        HandlerError::Domain(DomainError::Repository(e))
    }
}

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;
