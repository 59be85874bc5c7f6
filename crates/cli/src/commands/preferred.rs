use agrimarket_core::domain::customer::CustomerId;

use crate::commands::{
    build_runtime, engine_failure, engine_for, load_config, open_pool, to_data, CommandFailure,
    CommandResult,
};

pub fn run(customer_id: i64, limit: Option<usize>) -> CommandResult {
    let config = match load_config("preferred") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("preferred") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let engine = engine_for(pool.clone(), &config);
        let items = engine.get_preferred_market_items(CustomerId(customer_id), limit).await;
        pool.close().await;
        let items = items.map_err(engine_failure)?;
        Ok::<_, CommandFailure>((items.len(), to_data(&items)?))
    });

    match result {
        Ok((count, data)) => CommandResult::success_with_data(
            "preferred",
            format!("{count} preferred items for customer {customer_id}"),
            Some(data),
        ),
        Err(failure) => CommandResult::from_failure("preferred", failure),
    }
}
