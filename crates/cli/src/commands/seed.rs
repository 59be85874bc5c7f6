use agrimarket_db::{CustomerSeedInfo, DemoDataset};

use crate::commands::{build_runtime, load_config, open_pool, CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        let seed_result = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedOutput, CommandFailure> = if verification.all_present {
            Ok(SeedOutput {
                customers: seed_result.customers_seeded,
                listings: seed_result.listings_seeded,
            })
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(output) => {
            let customer_lines: Vec<String> = output
                .customers
                .iter()
                .map(|customer| {
                    format!(
                        "  - {}: customer {} ({})",
                        customer.scenario, customer.customer_id, customer.description
                    )
                })
                .collect();
            let message = format!(
                "demo marketplace loaded with {} listings and {} customers:\n{}",
                output.listings,
                output.customers.len(),
                customer_lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

struct SeedOutput {
    customers: Vec<CustomerSeedInfo>,
    listings: usize,
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
