use agrimarket_core::domain::customer::CustomerId;
use serde_json::json;

use crate::commands::{
    build_runtime, engine_failure, engine_for, load_config, open_pool, CommandResult,
};

pub fn run(customer_id: i64) -> CommandResult {
    let config = match load_config("profile") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("profile") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let engine = engine_for(pool.clone(), &config);
        let outcome = engine.update_customer_profile(CustomerId(customer_id)).await;
        pool.close().await;
        outcome.map_err(engine_failure)
    });

    match result {
        Ok(profile) => CommandResult::success_with_data(
            "profile",
            format!("updated profile for customer {customer_id}"),
            Some(json!({
                "customer_id": customer_id,
                "discount_sensitivity": profile.discount_sensitivity,
                "price_elasticity": profile.price_elasticity,
                "stock_urgency": profile.stock_urgency,
            })),
        ),
        Err(failure) => CommandResult::from_failure("profile", failure),
    }
}
