use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use agrimarket_core::domain::customer::{Customer, CustomerId, CustomerProfile};

use super::{parse_optional_timestamp, CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                c.customer_id,
                u.name AS user_name,
                c.discount_sensitivity,
                c.price_elasticity,
                c.stock_urgency,
                c.last_profiled
             FROM customer c
             LEFT JOIN users u ON u.user_id = c.user_id
             WHERE c.customer_id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(customer_from_row).transpose()
    }

    async fn list_ids(&self) -> Result<Vec<CustomerId>, RepositoryError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT customer_id FROM customer ORDER BY customer_id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(CustomerId).collect())
    }

    async fn save_profile(
        &self,
        id: CustomerId,
        profile: CustomerProfile,
        profiled_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE customer
             SET discount_sensitivity = ?,
                 price_elasticity = ?,
                 stock_urgency = ?,
                 last_profiled = ?
             WHERE customer_id = ?",
        )
        .bind(profile.discount_sensitivity)
        .bind(profile.price_elasticity)
        .bind(profile.stock_urgency)
        .bind(profiled_at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn customer_from_row(row: SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(row.try_get("customer_id")?),
        user_name: row.try_get("user_name")?,
        profile: CustomerProfile {
            discount_sensitivity: row.try_get("discount_sensitivity")?,
            price_elasticity: row.try_get("price_elasticity")?,
            stock_urgency: row.try_get("stock_urgency")?,
        },
        last_profiled: parse_optional_timestamp("last_profiled", row.try_get("last_profiled")?)?,
    })
}
