use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use agrimarket_core::domain::action::{ActionKind, CustomerAction, NewCustomerAction};
use agrimarket_core::domain::customer::{Customer, CustomerId, CustomerProfile};
use agrimarket_core::domain::listing::{ListingId, MarketListing};
use agrimarket_core::domain::recommendation::Recommendation;

pub mod action;
pub mod customer;
pub mod listing;
pub mod memory;
pub mod recommendation;

pub use action::SqlActionRepository;
pub use customer::SqlCustomerRepository;
pub use listing::SqlListingRepository;
pub use memory::{
    InMemoryActionRepository, InMemoryCustomerRepository, InMemoryListingRepository,
    InMemoryRecommendationRepository,
};
pub use recommendation::SqlRecommendationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Every customer id in ascending order.
    async fn list_ids(&self) -> Result<Vec<CustomerId>, RepositoryError>;

    /// Writes the profile scalars and stamp. Returns `false` if the customer does not exist.
    async fn save_profile(
        &self,
        id: CustomerId,
        profile: CustomerProfile,
        profiled_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

/// Append-only customer action log.
#[async_trait]
pub trait ActionRepository: Send + Sync {
    async fn append(&self, action: NewCustomerAction) -> Result<CustomerAction, RepositoryError>;

    /// Actions in write order, optionally restricted to one kind.
    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        kind: Option<ActionKind>,
    ) -> Result<Vec<CustomerAction>, RepositoryError>;
}

#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    /// Deletes every stored row for the customer and inserts `recommendations` atomically.
    async fn replace_for_customer(
        &self,
        customer_id: CustomerId,
        recommendations: &[Recommendation],
    ) -> Result<(), RepositoryError>;

    /// Stored rows by descending probability.
    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, RepositoryError>;
}

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn find_by_id(&self, id: ListingId) -> Result<Option<MarketListing>, RepositoryError>;

    /// Listings with stock above zero whose product name exactly matches one of `product_names`.
    async fn in_stock_for_products(
        &self,
        product_names: &[String],
    ) -> Result<Vec<MarketListing>, RepositoryError>;
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{connect_with_settings, migrations, DbPool};

    pub async fn setup_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    pub async fn insert_customer(pool: &DbPool, customer_id: i64, name: Option<&str>) {
        let user_id = match name {
            Some(name) => {
                let id = sqlx::query(
                    "INSERT INTO users (name, email, role) VALUES (?, ?, 'customer')",
                )
                .bind(name)
                .bind(format!("customer{customer_id}@example.test"))
                .execute(pool)
                .await
                .expect("insert user")
                .last_insert_rowid();
                Some(id)
            }
            None => None,
        };

        sqlx::query("INSERT INTO customer (customer_id, user_id) VALUES (?, ?)")
            .bind(customer_id)
            .bind(user_id)
            .execute(pool)
            .await
            .expect("insert customer");
    }

    pub async fn insert_farmer(pool: &DbPool, name: &str) -> i64 {
        let user_id = sqlx::query("INSERT INTO users (name, email, role) VALUES (?, ?, 'farmer')")
            .bind(name)
            .bind(format!("{}@farm.test", name.to_lowercase().replace(' ', ".")))
            .execute(pool)
            .await
            .expect("insert farmer user")
            .last_insert_rowid();

        sqlx::query("INSERT INTO farmer (user_id) VALUES (?)")
            .bind(user_id)
            .execute(pool)
            .await
            .expect("insert farmer")
            .last_insert_rowid()
    }

    pub async fn insert_listing(
        pool: &DbPool,
        farmer_id: i64,
        product_name: &str,
        price: f64,
        stock: i64,
    ) -> i64 {
        sqlx::query(
            "INSERT INTO market (farmer_id, product_name, weight, stock, discount, price, date_added)
             VALUES (?, ?, 1.0, ?, 5.0, ?, '2026-03-01T00:00:00Z')",
        )
        .bind(farmer_id)
        .bind(product_name)
        .bind(stock)
        .bind(price)
        .execute(pool)
        .await
        .expect("insert listing")
        .last_insert_rowid()
    }
}
