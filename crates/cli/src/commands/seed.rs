use vitrine_core::config::{AppConfig, LoadOptions};
use vitrine_db::{connect_from_config, migrations, seed_demo_dataset};

use crate::commands::{block_on, CommandResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let result = block_on("seed", async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let summary = seed_demo_dataset(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        pool.close().await;
        Ok(summary)
    });

    match result {
        Ok(summary) => {
            let message = format!(
                "seeded {} products, {} interactions, {} configs, {} blocks",
                summary.products, summary.interactions, summary.configs, summary.blocks
            );
            let data = serde_json::to_value(&summary).unwrap_or(serde_json::Value::Null);
            CommandResult::success_with_data("seed", message, data)
        }
        Err(failure) => failure,
    }
}
