use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Demo customers and the scoring path each one is expected to exercise.
const SEED_CUSTOMERS: &[SeedCustomerContract] = &[
    SeedCustomerContract {
        customer_id: 9201,
        scenario: "forest",
        display_name: "Meera Rao",
        expected_actions: 10,
        expected_purchases: 4,
        distinct_crops: 5,
        description: "Three purchased crops and two browsed crops",
    },
    SeedCustomerContract {
        customer_id: 9202,
        scenario: "single_class_fallback",
        display_name: "Arun Shah",
        expected_actions: 8,
        expected_purchases: 1,
        distinct_crops: 5,
        description: "Five crops with a single purchased one",
    },
    SeedCustomerContract {
        customer_id: 9203,
        scenario: "cold_start",
        display_name: "Priya Nair",
        expected_actions: 0,
        expected_purchases: 0,
        distinct_crops: 0,
        description: "No recorded actions",
    },
    SeedCustomerContract {
        customer_id: 9204,
        scenario: "anonymous_single_crop",
        display_name: "Customer 9204",
        expected_actions: 1,
        expected_purchases: 0,
        distinct_crops: 1,
        description: "No linked user and a single browsed crop",
    },
];

const SEED_USER_IDS: &[i64] = &[9001, 9002, 9003, 9004, 9005];
const SEED_FARMER_IDS: &[i64] = &[9101, 9102];
const SEED_LISTING_IDS: &[i64] = &[9301, 9302, 9303, 9304, 9305, 9306, 9307, 9308];

/// Deterministic marketplace fixture covering cold start, heuristic fallback, and forest
/// scoring.
pub struct DemoDataset;

impl DemoDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_marketplace.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let customers_seeded = SEED_CUSTOMERS
            .iter()
            .map(|customer| CustomerSeedInfo {
                customer_id: customer.customer_id,
                scenario: customer.scenario,
                description: customer.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { customers_seeded, listings_seeded: SEED_LISTING_IDS.len() })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let listing_total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM market WHERE id IN {}",
            sql_array_from_ids(SEED_LISTING_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("listings", listing_total == SEED_LISTING_IDS.len() as i64));

        let farmer_total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM farmer WHERE farmer_id IN {}",
            sql_array_from_ids(SEED_FARMER_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("farmers", farmer_total == SEED_FARMER_IDS.len() as i64));

        for customer in SEED_CUSTOMERS {
            let name: Option<Option<String>> = sqlx::query_scalar(
                "SELECT u.name FROM customer c LEFT JOIN users u ON u.user_id = c.user_id
                 WHERE c.customer_id = ?1",
            )
            .bind(customer.customer_id)
            .fetch_optional(pool)
            .await?;
            let resolved = match name {
                Some(Some(name)) => Some(name),
                Some(None) => Some(format!("Customer {}", customer.customer_id)),
                None => None,
            };
            let name_matches = resolved.as_deref() == Some(customer.display_name);
            checks.push((customer.name_label(), name_matches));

            let (actions, purchases, crops): (i64, i64, i64) = sqlx::query_as(
                "SELECT
                    COUNT(1),
                    COALESCE(SUM(CASE WHEN action = 'PURCHASE' THEN 1 ELSE 0 END), 0),
                    COUNT(DISTINCT crop)
                 FROM customer_action
                 WHERE customer_id = ?1",
            )
            .bind(customer.customer_id)
            .fetch_one(pool)
            .await?;
            checks.push((
                customer.history_label(),
                actions == customer.expected_actions
                    && purchases == customer.expected_purchases
                    && crops == customer.distinct_crops,
            ));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Clean up seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let customer_ids =
            SEED_CUSTOMERS.iter().map(|customer| customer.customer_id).collect::<Vec<_>>();
        let quoted_customers = sql_array_from_ids(&customer_ids);

        let mut tx = pool.begin().await?;

        sqlx::query(&format!(
            "DELETE FROM customer_recommendation WHERE customer_id IN {quoted_customers}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM customer_action WHERE customer_id IN {quoted_customers}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM customer WHERE customer_id IN {quoted_customers}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM market WHERE id IN {}",
            sql_array_from_ids(SEED_LISTING_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM farmer WHERE farmer_id IN {}",
            sql_array_from_ids(SEED_FARMER_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM users WHERE user_id IN {}",
            sql_array_from_ids(SEED_USER_IDS)
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub fn customer_ids() -> Vec<i64> {
        SEED_CUSTOMERS.iter().map(|customer| customer.customer_id).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedCustomerContract {
    customer_id: i64,
    scenario: &'static str,
    display_name: &'static str,
    expected_actions: i64,
    expected_purchases: i64,
    distinct_crops: i64,
    description: &'static str,
}

impl SeedCustomerContract {
    fn name_label(&self) -> &'static str {
        match self.scenario {
            "forest" => "customer-forest-name",
            "single_class_fallback" => "customer-fallback-name",
            "cold_start" => "customer-cold-start-name",
            _ => "customer-anonymous-name",
        }
    }

    fn history_label(&self) -> &'static str {
        match self.scenario {
            "forest" => "customer-forest-history",
            "single_class_fallback" => "customer-fallback-history",
            "cold_start" => "customer-cold-start-history",
            _ => "customer-anonymous-history",
        }
    }
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub customers_seeded: Vec<CustomerSeedInfo>,
    pub listings_seeded: usize,
}

#[derive(Debug)]
pub struct CustomerSeedInfo {
    pub customer_id: i64,
    pub scenario: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
