use chrono::{NaiveDate, Utc};

use vitrine_core::config::{AppConfig, LoadOptions};
use vitrine_core::domain::analytics::DailyAnalytics;
use vitrine_core::domain::block::BlockId;
use vitrine_db::connect_from_config;
use vitrine_db::repositories::SqlAnalyticsSink;
use vitrine_engine::AnalyticsSink;

use crate::commands::{block_on, CommandResult};

pub fn run(block: &str, date: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "stats",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let date = match date {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(error) => {
                return CommandResult::failure(
                    "stats",
                    "invalid_date",
                    format!("could not parse `{raw}` as YYYY-MM-DD: {error}"),
                    2,
                );
            }
        },
        None => Utc::now().date_naive(),
    };

    let block_id = BlockId(block.to_owned());
    let result = block_on("stats", async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let sink = SqlAnalyticsSink::new(pool.clone());
        let report = sink
            .daily_report(&block_id, date)
            .await
            .map_err(|error| ("analytics_query", error.to_string(), 5u8))?;
        pool.close().await;
        Ok(report)
    });

    match result {
        Ok(report) => {
            let message = summarize(block, date, &report);
            let data = serde_json::to_value(&report).unwrap_or(serde_json::Value::Null);
            CommandResult::success_with_data("stats", message, data)
        }
        Err(failure) => failure,
    }
}

fn summarize(block: &str, date: NaiveDate, report: &[DailyAnalytics]) -> String {
    let impressions: u64 = report.iter().map(|row| row.impressions).sum();
    let clicks: u64 = report.iter().map(|row| row.clicks).sum();
    let purchases: u64 = report.iter().map(|row| row.purchases).sum();
    format!(
        "block `{block}` on {date}: {impressions} impressions, {clicks} clicks, {purchases} purchases across {} rows",
        report.len()
    )
}
