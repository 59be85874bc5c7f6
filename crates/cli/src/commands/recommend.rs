use agrimarket_core::domain::customer::CustomerId;
use agrimarket_engine::BatchSummary;

use crate::commands::{
    build_runtime, engine_failure, engine_for, load_config, open_pool, to_data, CommandFailure,
    CommandResult,
};

/// Batch recommendation run for one customer, or every customer when `customer_id` is `None`.
pub fn run(customer_id: Option<i64>) -> CommandResult {
    let config = match load_config("recommend") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("recommend") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let engine = engine_for(pool.clone(), &config);
        let summary = engine.run_batch(customer_id.map(CustomerId)).await;
        pool.close().await;
        let summary = summary.map_err(engine_failure)?;
        let data = to_data(&summary)?;
        Ok::<_, CommandFailure>((summary_message(&summary), data))
    });

    match result {
        Ok((message, data)) => CommandResult::success_with_data("recommend", message, Some(data)),
        Err(failure) => CommandResult::from_failure("recommend", failure),
    }
}

fn summary_message(summary: &BatchSummary) -> String {
    format!(
        "processed {} customers: {} succeeded, {} failed",
        summary.processed(),
        summary.succeeded(),
        summary.failed()
    )
}
