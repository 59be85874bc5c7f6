use thiserror::Error;

use agrimarket_core::domain::customer::CustomerId;
use agrimarket_core::domain::listing::ListingId;
use agrimarket_core::errors::{ApplicationError, DomainError};
use agrimarket_core::model::ModelError;
use agrimarket_db::repositories::RepositoryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),
    #[error("listing {0} not found")]
    ListingNotFound(ListingId),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CustomerNotFound(_) | Self::ListingNotFound(_))
    }
}

impl From<EngineError> for ApplicationError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::CustomerNotFound(_) | EngineError::ListingNotFound(_) => {
                Self::NotFound(value.to_string())
            }
            EngineError::Domain(error) => Self::Domain(error),
            EngineError::Repository(error) => Self::Persistence(error.to_string()),
            EngineError::Model(error) => Self::from(error),
        }
    }
}
