use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use agrimarket_core::domain::listing::{ListingId, MarketListing};

use super::{ListingRepository, RepositoryError};
use crate::DbPool;

const SELECT_LISTINGS: &str = "SELECT
        m.id,
        m.product_name,
        u.name AS farmer_name,
        m.price,
        m.weight,
        m.stock,
        m.discount
     FROM market m
     JOIN farmer f ON f.farmer_id = m.farmer_id
     JOIN users u ON u.user_id = f.user_id";

pub struct SqlListingRepository {
    pool: DbPool,
}

impl SqlListingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ListingRepository for SqlListingRepository {
    async fn find_by_id(&self, id: ListingId) -> Result<Option<MarketListing>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_LISTINGS} WHERE m.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(listing_from_row).transpose()
    }

    async fn in_stock_for_products(
        &self,
        product_names: &[String],
    ) -> Result<Vec<MarketListing>, RepositoryError> {
        if product_names.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_LISTINGS);
        builder.push(" WHERE m.stock > 0 AND m.product_name IN (");
        let mut names = builder.separated(", ");
        for name in product_names {
            names.push_bind(name.as_str());
        }
        names.push_unseparated(") ORDER BY m.id ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(listing_from_row).collect()
    }
}

fn listing_from_row(row: SqliteRow) -> Result<MarketListing, RepositoryError> {
    Ok(MarketListing {
        id: ListingId(row.try_get("id")?),
        product_name: row.try_get("product_name")?,
        farmer_name: row.try_get("farmer_name")?,
        price: row.try_get("price")?,
        weight: row.try_get("weight")?,
        stock: row.try_get("stock")?,
        discount: row.try_get("discount")?,
    })
}
