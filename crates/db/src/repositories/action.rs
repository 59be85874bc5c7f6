use sqlx::{sqlite::SqliteRow, Row};

use agrimarket_core::domain::action::{
    ActionId, ActionKind, ActionSnapshot, CustomerAction, NewCustomerAction,
};
use agrimarket_core::domain::customer::CustomerId;

use super::{parse_timestamp, parse_u32, ActionRepository, RepositoryError};
use crate::DbPool;

// SQLite does not enforce column types, so only numeric snapshot cells are read.
const SELECT_ACTIONS: &str = "SELECT
        id,
        customer_id,
        crop,
        action,
        quantity,
        CASE WHEN typeof(price_at_action) IN ('real', 'integer')
             THEN CAST(price_at_action AS REAL) END AS price_at_action,
        CASE WHEN typeof(discount_at_action) IN ('real', 'integer')
             THEN CAST(discount_at_action AS REAL) END AS discount_at_action,
        CASE WHEN typeof(stock_at_action) IN ('real', 'integer')
             THEN CAST(stock_at_action AS REAL) END AS stock_at_action,
        timestamp
     FROM customer_action
     WHERE customer_id = ?";

pub struct SqlActionRepository {
    pool: DbPool,
}

impl SqlActionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ActionRepository for SqlActionRepository {
    async fn append(&self, action: NewCustomerAction) -> Result<CustomerAction, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO customer_action (
                customer_id,
                crop,
                action,
                quantity,
                price_at_action,
                discount_at_action,
                stock_at_action,
                timestamp
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(action.customer_id.0)
        .bind(&action.crop)
        .bind(action.kind.as_str())
        .bind(i64::from(action.quantity))
        .bind(action.snapshot.price)
        .bind(action.snapshot.discount)
        .bind(action.snapshot.stock)
        .bind(action.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(action.into_action(ActionId(result.last_insert_rowid())))
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        kind: Option<ActionKind>,
    ) -> Result<Vec<CustomerAction>, RepositoryError> {
        let rows = if let Some(kind) = kind {
            sqlx::query(&format!("{SELECT_ACTIONS} AND action = ? ORDER BY timestamp ASC, id ASC"))
                .bind(customer_id.0)
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(&format!("{SELECT_ACTIONS} ORDER BY timestamp ASC, id ASC"))
                .bind(customer_id.0)
                .fetch_all(&self.pool)
                .await?
        };

        rows.into_iter().map(action_from_row).collect()
    }
}

fn action_from_row(row: SqliteRow) -> Result<CustomerAction, RepositoryError> {
    let kind_raw = row.try_get::<String, _>("action")?;
    let kind = kind_raw
        .parse::<ActionKind>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(CustomerAction {
        id: ActionId(row.try_get("id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        crop: row.try_get("crop")?,
        kind,
        quantity: parse_u32("quantity", row.try_get("quantity")?)?,
        snapshot: ActionSnapshot::new(
            row.try_get("price_at_action")?,
            row.try_get("discount_at_action")?,
            row.try_get("stock_at_action")?,
        ),
        recorded_at: parse_timestamp("timestamp", row.try_get("timestamp")?)?,
    })
}
