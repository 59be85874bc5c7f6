use crate::commands::{build_runtime, load_config, open_pool, CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        pool.close().await;
        Ok::<(), CommandFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
