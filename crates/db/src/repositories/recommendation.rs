use sqlx::{sqlite::SqliteRow, Row};

use agrimarket_core::domain::customer::CustomerId;
use agrimarket_core::domain::recommendation::Recommendation;

use super::{RecommendationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecommendationRepository {
    pool: DbPool,
}

impl SqlRecommendationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationRepository for SqlRecommendationRepository {
    async fn replace_for_customer(
        &self,
        customer_id: CustomerId,
        recommendations: &[Recommendation],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM customer_recommendation WHERE customer_id = ?")
            .bind(customer_id.0)
            .execute(&mut *tx)
            .await?;

        for recommendation in recommendations {
            sqlx::query(
                "INSERT INTO customer_recommendation (customer_id, crop, purchase_prob)
                 VALUES (?, ?, ?)",
            )
            .bind(customer_id.0)
            .bind(&recommendation.crop)
            .bind(recommendation.purchase_prob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = sqlx::query(
            "SELECT crop, purchase_prob
             FROM customer_recommendation
             WHERE customer_id = ?
             ORDER BY purchase_prob DESC, id ASC
             LIMIT ?",
        )
        .bind(customer_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(recommendation_from_row).collect()
    }
}

fn recommendation_from_row(row: SqliteRow) -> Result<Recommendation, RepositoryError> {
    Ok(Recommendation { crop: row.try_get("crop")?, purchase_prob: row.try_get("purchase_prob")? })
}
