use agrimarket_core::domain::action::ActionKind;
use agrimarket_core::domain::customer::CustomerId;
use agrimarket_core::domain::recommendation::Recommendation;
use agrimarket_db::repositories::{
    ActionRepository, CustomerRepository, ListingRepository, RecommendationRepository,
    SqlActionRepository, SqlCustomerRepository, SqlListingRepository,
    SqlRecommendationRepository,
};
use agrimarket_db::{connect_with_settings, migrations, DbPool, DemoDataset};

type DemoDatasetTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

async fn seeded_pool() -> DemoDatasetTestResult<DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    DemoDataset::load(&pool).await.map_err(|error| format!("seed: {error}"))?;
    Ok(pool)
}

#[tokio::test]
async fn seeded_customers_resolve_display_names() -> DemoDatasetTestResult {
    let pool = seeded_pool().await?;
    let customers = SqlCustomerRepository::new(pool);

    let ids = customers.list_ids().await.map_err(|error| error.to_string())?;
    require_eq!(ids, vec![CustomerId(9201), CustomerId(9202), CustomerId(9203), CustomerId(9204)]);

    let named = customers
        .find_by_id(CustomerId(9201))
        .await
        .map_err(|error| error.to_string())?
        .ok_or("customer 9201 should exist")?;
    require_eq!(named.display_name(), "Meera Rao");

    let anonymous = customers
        .find_by_id(CustomerId(9204))
        .await
        .map_err(|error| error.to_string())?
        .ok_or("customer 9204 should exist")?;
    require_eq!(anonymous.display_name(), "Customer 9204");
    require!(anonymous.last_profiled.is_none(), "seeded customers start unprofiled");

    Ok(())
}

#[tokio::test]
async fn in_stock_query_skips_sold_out_listings() -> DemoDatasetTestResult {
    let pool = seeded_pool().await?;
    let listings = SqlListingRepository::new(pool);

    let crops = vec!["Maize".to_string(), "Onion".to_string(), "Wheat".to_string()];
    let found = listings.in_stock_for_products(&crops).await.map_err(|error| error.to_string())?;
    let ids: Vec<i64> = found.iter().map(|listing| listing.id.0).collect();

    require_eq!(ids, vec![9301, 9304], "expected in-stock Wheat and Maize only, got {ids:?}");
    require!(found.iter().all(|listing| listing.stock > 0));
    require_eq!(found[0].farmer_name, "Ravi Kumar");
    require_eq!(found[1].farmer_name, "Lakshmi Devi");

    Ok(())
}

#[tokio::test]
async fn snapshot_gaps_read_as_missing() -> DemoDatasetTestResult {
    let pool = seeded_pool().await?;
    let actions = SqlActionRepository::new(pool);

    let history = actions
        .list_for_customer(CustomerId(9202), None)
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(history.len(), 8);

    let gap = history
        .iter()
        .find(|action| action.id.0 == 9418)
        .ok_or("action 9418 should be present")?;
    require!(!gap.snapshot.is_complete());
    require!(gap.snapshot.price.is_none() && gap.snapshot.stock.is_none());

    let purchases = actions
        .list_for_customer(CustomerId(9201), Some(ActionKind::Purchase))
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(purchases.len(), 4);
    require!(purchases.windows(2).all(|pair| pair[0].recorded_at <= pair[1].recorded_at));

    Ok(())
}

#[tokio::test]
async fn stored_recommendations_survive_reseeding() -> DemoDatasetTestResult {
    let pool = seeded_pool().await?;
    let recommendations = SqlRecommendationRepository::new(pool.clone());

    recommendations
        .replace_for_customer(
            CustomerId(9203),
            &[Recommendation::new("Wheat", 0.1), Recommendation::new("Rice", 0.05)],
        )
        .await
        .map_err(|error| error.to_string())?;
    DemoDataset::load(&pool).await.map_err(|error| error.to_string())?;

    let stored = recommendations
        .list_for_customer(CustomerId(9203), None)
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(stored.len(), 2);
    require_eq!(stored[0].crop, "Wheat");

    let verification = DemoDataset::verify(&pool).await.map_err(|error| error.to_string())?;
    require!(verification.all_present, "verification failed: {:?}", verification.checks);

    Ok(())
}
